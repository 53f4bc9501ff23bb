//! Login session for the sales board.
//!
//! The administrator is a fixed credential, never a roster row: the
//! roster cannot list, edit, or delete it. Roster logins match the name
//! case-insensitively and the password exactly, as stored (plaintext —
//! the source never hashes, and hardening is out of scope here).

use thiserror::Error;

use crate::roster::Roster;
use crate::types::{Principal, SessionStatus};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
/// Display name shown for the administrator session.
pub const ADMIN_DISPLAY_NAME: &str = "Administrador";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,

    // One message for unknown user and wrong password alike.
    #[error("incorrect username or password")]
    InvalidCredentials,
}

/// The one live session of the running client.
#[derive(Default)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn login(
        &mut self,
        roster: &Roster,
        username: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if username == ADMIN_USERNAME && password == ADMIN_PASSWORD {
            let principal = Principal {
                name: ADMIN_DISPLAY_NAME.to_string(),
                is_admin: true,
            };
            self.principal = Some(principal.clone());
            log::info!("Administrator logged in");
            return Ok(principal);
        }

        match roster.find(username) {
            Some(employee) if employee.password == password => {
                let principal = Principal {
                    name: employee.name.clone(),
                    is_admin: false,
                };
                self.principal = Some(principal.clone());
                log::info!("Employee '{}' logged in", principal.name);
                Ok(principal)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub fn logout(&mut self) {
        if let Some(principal) = self.principal.take() {
            log::info!("'{}' logged out", principal.name);
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        match &self.principal {
            Some(principal) => SessionStatus {
                logged_in: true,
                user: Some(principal.name.clone()),
                is_admin: principal.is_admin,
            },
            None => SessionStatus {
                logged_in: false,
                user: None,
                is_admin: false,
            },
        }
    }
}
