//! Frontdesk — the engine behind a pair of small front-office apps: a
//! weekly sales board with an admin-managed roster, and a waiting-room
//! signage player.
//!
//! The crate owns state, rules, and pure view projections. UI shells,
//! persistence backends, and RSS fetching are external collaborators:
//! hosts render [`view`] structs, call [`commands`], and may plug their
//! own [`store`] implementations into [`state::AppState::with_parts`].

pub mod archive;
pub mod auth;
pub mod commands;
pub mod db;
pub mod error;
pub mod player;
pub mod playlist;
pub mod roster;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod types;
pub mod util;
pub mod view;

use std::sync::Arc;

use state::AppState;

/// Initialize env_logger from `RUST_LOG` (default: info). Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}

/// Spawn the background scheduler (daily snapshot + weekly close-out).
/// Must be called from within a tokio runtime owned by the host.
pub fn spawn_scheduler(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        scheduler::Scheduler::new(state).run().await;
    })
}
