//! Rotation timer for the signage player.
//!
//! One tokio task advances the playlist while the play flag is set. The
//! interval is never fixed: after every advance the task re-reads the
//! newly-current item's duration. Pausing aborts the task outright, and
//! any manual change of the current item (skip, switch, removal) wakes
//! it so the pending sleep is re-armed against the new item instead of
//! firing against a stale one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Handle to the advance timer. Lives in `AppState` behind a mutex; the
/// command layer starts it on play and stops it on pause.
pub struct Rotation {
    handle: Option<JoinHandle<()>>,
    notify: Arc<Notify>,
}

impl Rotation {
    pub fn new() -> Self {
        Rotation {
            handle: None,
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Wake the timer loop: the current item changed under it.
    pub fn item_changed(&self) {
        self.notify.notify_one();
    }

    /// Start (or restart) the timer task.
    pub fn start(&mut self, state: Arc<AppState>) {
        self.stop();
        let notify = self.notify.clone();
        self.handle = Some(tokio::spawn(run_rotation(state, notify)));
    }

    /// Cancel the pending advance outright.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::new()
    }
}

async fn run_rotation(state: Arc<AppState>, notify: Arc<Notify>) {
    loop {
        let duration_ms = {
            let board = match state.playlists.lock() {
                Ok(board) => board,
                Err(_) => return,
            };
            if !board.is_playing() {
                return;
            }
            board.current_item().map(|item| item.duration_ms)
        };

        match duration_ms {
            Some(ms) => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {
                        let mut board = match state.playlists.lock() {
                            Ok(board) => board,
                            Err(_) => return,
                        };
                        if !board.is_playing() {
                            return;
                        }
                        board.advance();
                        log::debug!(
                            "Rotation advanced to index {}",
                            board.player_state().index
                        );
                    }
                    _ = notify.notified() => {
                        // Re-read the new current item's duration.
                    }
                }
            }
            None => {
                // Nothing to rotate yet; wait for items to appear.
                notify.notified().await;
            }
        }
    }
}
