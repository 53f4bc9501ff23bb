//! Command layer: the surface a UI host invokes.
//!
//! Thin wrappers that lock the state, apply the gating the original
//! front-ends applied (admin-or-owner for row edits, admin-only for
//! roster management and close-outs), call into the stores, and
//! stringify typed errors for display.
//!
//! The stores themselves never check the principal; this layer is the
//! only gate, exactly as observed in the source. Hosts wanting hard
//! authorization add it on their side.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;

use crate::archive::{self, DailyReport, SummaryReport, WeekCloseout};
use crate::db::{DailySaleRow, WeekHistoryRow};
use crate::state::{create_or_update_config, AppState};
use crate::types::{
    Config, ItemKind, JobId, Principal, ScheduleEntry, SessionStatus, Weekday,
};
use crate::view::{self, DisplayFrame, PlaylistsView, SpreadsheetView};

fn current_principal(state: &AppState) -> Result<Option<Principal>, String> {
    Ok(state
        .session
        .lock()
        .map_err(|_| "Lock poisoned")?
        .principal()
        .cloned())
}

fn require_login(state: &AppState) -> Result<Principal, String> {
    current_principal(state)?.ok_or_else(|| "Not logged in".to_string())
}

fn require_admin(state: &AppState) -> Result<Principal, String> {
    let principal = require_login(state)?;
    if !principal.is_admin {
        return Err("Access denied: administrators only".to_string());
    }
    Ok(principal)
}

// =============================================================================
// Session
// =============================================================================

pub fn login(state: &AppState, username: &str, password: &str) -> Result<SessionStatus, String> {
    let mut session = state.session.lock().map_err(|_| "Lock poisoned")?;
    let roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    session
        .login(&roster, username, password)
        .map_err(|e| e.to_string())?;
    Ok(session.status())
}

pub fn logout(state: &AppState) -> Result<SessionStatus, String> {
    let mut session = state.session.lock().map_err(|_| "Lock poisoned")?;
    session.logout();
    Ok(session.status())
}

pub fn check_session(state: &AppState) -> Result<SessionStatus, String> {
    Ok(state
        .session
        .lock()
        .map_err(|_| "Lock poisoned")?
        .status())
}

// =============================================================================
// Sales board
// =============================================================================

/// The sheet is readable before login (the board hangs in the shop);
/// the principal only drives the per-row `editable` flags.
pub fn get_spreadsheet(state: &AppState) -> Result<SpreadsheetView, String> {
    let principal = current_principal(state)?;
    let roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    Ok(view::spreadsheet_view(&roster, principal.as_ref()))
}

pub fn set_cell(
    state: &AppState,
    employee: &str,
    day: Weekday,
    value: f64,
) -> Result<SpreadsheetView, String> {
    let principal = require_login(state)?;
    if !principal.can_edit_row(employee) {
        return Err("Access denied: you can only edit your own row".to_string());
    }

    let mut roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    roster
        .set_cell(employee, day, value)
        .map_err(|e| e.to_string())?;
    Ok(view::spreadsheet_view(&roster, Some(&principal)))
}

pub fn list_employees(state: &AppState) -> Result<Vec<String>, String> {
    let roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    Ok(roster.employees().iter().map(|e| e.name.clone()).collect())
}

pub fn add_employee(state: &AppState, name: &str, password: &str) -> Result<(), String> {
    require_admin(state)?;
    let mut roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    roster.add_employee(name, password).map_err(|e| e.to_string())
}

pub fn remove_employee(state: &AppState, name: &str) -> Result<(), String> {
    require_admin(state)?;
    let mut roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    roster.remove_employee(name).map_err(|e| e.to_string())
}

pub fn change_employee_password(
    state: &AppState,
    name: &str,
    new_password: &str,
) -> Result<(), String> {
    require_admin(state)?;
    let mut roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    roster
        .change_password(name, new_password)
        .map_err(|e| e.to_string())
}

// =============================================================================
// Signage player
// =============================================================================

pub fn get_display(state: &AppState) -> Result<DisplayFrame, String> {
    let board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
    Ok(view::display_frame(&board))
}

pub fn get_playlists(state: &AppState) -> Result<PlaylistsView, String> {
    let board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
    Ok(view::playlists_view(&board))
}

/// Wake the rotation timer after an operation that may have changed the
/// current item under it.
fn poke_rotation(state: &AppState) {
    if let Ok(rotation) = state.rotation.lock() {
        rotation.item_changed();
    }
}

/// Append an item to the current playlist.
pub fn add_item(
    state: &AppState,
    kind: ItemKind,
    url: &str,
    duration_ms: u64,
    title: Option<String>,
) -> Result<u64, String> {
    let id = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        let current = board.document().current.clone();
        board
            .add_item(&current, kind, url, duration_ms, title)
            .map_err(|e| e.to_string())?
    };
    poke_rotation(state);
    Ok(id)
}

pub fn remove_item(state: &AppState, id: u64) -> Result<PlaylistsView, String> {
    let view = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        let current = board.document().current.clone();
        board.remove_item(&current, id).map_err(|e| e.to_string())?;
        view::playlists_view(&board)
    };
    poke_rotation(state);
    Ok(view)
}

pub fn clear_playlist(state: &AppState) -> Result<PlaylistsView, String> {
    let view = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        board.clear().map_err(|e| e.to_string())?;
        view::playlists_view(&board)
    };
    poke_rotation(state);
    Ok(view)
}

pub fn create_playlist(state: &AppState, name: &str) -> Result<PlaylistsView, String> {
    let view = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        board.create_playlist(name).map_err(|e| e.to_string())?;
        view::playlists_view(&board)
    };
    poke_rotation(state);
    Ok(view)
}

pub fn delete_playlist(state: &AppState, name: &str) -> Result<PlaylistsView, String> {
    let view = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        board.delete_playlist(name).map_err(|e| e.to_string())?;
        view::playlists_view(&board)
    };
    poke_rotation(state);
    Ok(view)
}

pub fn switch_playlist(state: &AppState, name: &str) -> Result<PlaylistsView, String> {
    let view = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        board.switch_playlist(name).map_err(|e| e.to_string())?;
        view::playlists_view(&board)
    };
    poke_rotation(state);
    Ok(view)
}

/// Manual advance — the on-screen skip button.
pub fn skip(state: &AppState) -> Result<DisplayFrame, String> {
    let frame = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        board.advance();
        view::display_frame(&board)
    };
    poke_rotation(state);
    Ok(frame)
}

/// Flip play/pause. Playing spawns the rotation task; pausing cancels
/// it — the pending advance must never fire after a pause.
pub fn toggle_play(state: &Arc<AppState>) -> Result<bool, String> {
    let playing = {
        let mut board = state.playlists.lock().map_err(|_| "Lock poisoned")?;
        board.toggle_play()
    };

    let mut rotation = state.rotation.lock().map_err(|_| "Lock poisoned")?;
    if playing {
        rotation.start(state.clone());
    } else {
        rotation.stop();
    }
    Ok(playing)
}

// =============================================================================
// Archive & summary
// =============================================================================

/// Timezone of a schedule entry, for deriving "today" the way the job
/// itself would.
fn schedule_today(state: &AppState, job: JobId) -> chrono::NaiveDate {
    let schedules = state
        .config
        .read()
        .ok()
        .and_then(|guard| guard.as_ref().map(|c| c.schedules.clone()))
        .unwrap_or_default();
    let entry = match job {
        JobId::DailySnapshot => schedules.daily_snapshot,
        JobId::WeekReset => schedules.week_reset,
    };
    match entry.timezone.parse::<Tz>() {
        Ok(tz) => Utc::now().with_timezone(&tz).date_naive(),
        Err(_) => Utc::now().date_naive(),
    }
}

pub fn close_week_now(state: &AppState) -> Result<WeekCloseout, String> {
    require_admin(state)?;
    let today = schedule_today(state, JobId::WeekReset);

    let mut roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    let db_guard = state.db.lock().map_err(|_| "Lock poisoned")?;
    let db = db_guard.as_ref().ok_or("Database not initialized")?;
    archive::close_week(&mut roster, db, today).map_err(|e| e.to_string())
}

pub fn record_daily_snapshot(state: &AppState) -> Result<Option<DailyReport>, String> {
    require_admin(state)?;
    let today = schedule_today(state, JobId::DailySnapshot);

    let roster = state.roster.lock().map_err(|_| "Lock poisoned")?;
    let db_guard = state.db.lock().map_err(|_| "Lock poisoned")?;
    let db = db_guard.as_ref().ok_or("Database not initialized")?;
    archive::daily_snapshot(&roster, db, today).map_err(|e| e.to_string())
}

pub fn get_daily_history(state: &AppState, limit: usize) -> Result<Vec<DailySaleRow>, String> {
    let db_guard = state.db.lock().map_err(|_| "Lock poisoned")?;
    let db = db_guard.as_ref().ok_or("Database not initialized")?;
    db.daily_history(limit).map_err(|e| e.to_string())
}

pub fn get_week_history(state: &AppState, limit: usize) -> Result<Vec<WeekHistoryRow>, String> {
    let db_guard = state.db.lock().map_err(|_| "Lock poisoned")?;
    let db = db_guard.as_ref().ok_or("Database not initialized")?;
    db.week_history(limit).map_err(|e| e.to_string())
}

pub fn get_summary(state: &AppState) -> Result<SummaryReport, String> {
    let db_guard = state.db.lock().map_err(|_| "Lock poisoned")?;
    let db = db_guard.as_ref().ok_or("Database not initialized")?;
    archive::summary(db, Utc::now().date_naive()).map_err(|e| e.to_string())
}

// =============================================================================
// Configuration
// =============================================================================

pub fn get_config(state: &AppState) -> Result<Config, String> {
    Ok(state
        .config
        .read()
        .map_err(|_| "Lock poisoned")?
        .clone()
        .unwrap_or_default())
}

pub fn set_schedule(
    state: &AppState,
    job: JobId,
    entry: ScheduleEntry,
) -> Result<Config, String> {
    require_admin(state)?;
    crate::scheduler::parse_cron(&entry.cron).map_err(|e| e.to_string())?;
    create_or_update_config(state, |config| match job {
        JobId::DailySnapshot => config.schedules.daily_snapshot = entry,
        JobId::WeekReset => config.schedules.week_reset = entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::MemoryStore;
    use crate::state::test_support::memory_state;

    #[test]
    fn test_login_and_session_lifecycle() {
        let state = memory_state(&MemoryStore::new());

        let status = login(&state, "admin", "admin123").unwrap();
        assert!(status.logged_in);
        assert!(status.is_admin);

        let status = logout(&state).unwrap();
        assert!(!status.logged_in);

        let status = login(&state, "anderson", "123").unwrap();
        assert_eq!(status.user.as_deref(), Some("Anderson"));
        assert!(!status.is_admin);

        assert!(login(&state, "anderson", "wrong").is_err());
    }

    #[test]
    fn test_sheet_is_readable_before_login() {
        let state = memory_state(&MemoryStore::new());
        let view = get_spreadsheet(&state).unwrap();
        assert_eq!(view.rows.len(), 7);
        assert!(view.rows.iter().all(|row| !row.editable));
    }

    #[test]
    fn test_set_cell_gating() {
        let state = memory_state(&MemoryStore::new());

        // Not logged in.
        assert!(set_cell(&state, "Anderson", Weekday::Monday, 10.0).is_err());

        // An employee edits their own row but nobody else's.
        login(&state, "Anderson", "123").unwrap();
        let view = set_cell(&state, "Anderson", Weekday::Monday, 10.0).unwrap();
        assert_eq!(view.column_totals.monday, 10.0);
        let err = set_cell(&state, "Vitoria", Weekday::Monday, 5.0).unwrap_err();
        assert!(err.contains("Access denied"));

        // The admin edits any row.
        login(&state, "admin", "admin123").unwrap();
        set_cell(&state, "Vitoria", Weekday::Monday, 5.0).unwrap();
        let view = get_spreadsheet(&state).unwrap();
        assert_eq!(view.grand_total, 15.0);
    }

    #[test]
    fn test_roster_management_is_admin_only() {
        let state = memory_state(&MemoryStore::new());

        login(&state, "Anderson", "123").unwrap();
        assert!(add_employee(&state, "Anna", "pw").is_err());
        assert!(remove_employee(&state, "Vitoria").is_err());
        assert!(change_employee_password(&state, "Vitoria", "x").is_err());

        login(&state, "admin", "admin123").unwrap();
        add_employee(&state, "Anna", "pw").unwrap();
        remove_employee(&state, "Vitoria").unwrap();
        change_employee_password(&state, "Anna", "nova").unwrap();

        let names = list_employees(&state).unwrap();
        assert!(names.contains(&"Anna".to_string()));
        assert!(!names.contains(&"Vitoria".to_string()));
    }

    #[test]
    fn test_playlist_commands_roundtrip() {
        let state = memory_state(&MemoryStore::new());

        let id = add_item(&state, ItemKind::Image, "https://x/a.png", 2000, None).unwrap();
        add_item(&state, ItemKind::Website, "https://x/b", 3000, None).unwrap();

        let frame = get_display(&state).unwrap();
        assert_eq!(frame.position.as_ref().unwrap().total, 2);

        let frame = skip(&state).unwrap();
        assert_eq!(frame.position.as_ref().unwrap().current, 2);

        let view = remove_item(&state, id).unwrap();
        assert_eq!(view.items.len(), 1);

        let view = create_playlist(&state, "lobby").unwrap();
        assert_eq!(view.current, "lobby");
        assert!(delete_playlist(&state, "default").is_err());
        let view = switch_playlist(&state, "default").unwrap();
        assert_eq!(view.current, "default");
    }

    #[tokio::test]
    async fn test_toggle_play_starts_and_cancels_the_timer() {
        let state = memory_state(&MemoryStore::new());
        add_item(&state, ItemKind::Image, "https://x/a.png", 60_000, None).unwrap();

        assert!(toggle_play(&state).unwrap());
        assert!(state.rotation.lock().unwrap().is_running());

        assert!(!toggle_play(&state).unwrap());
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!state.rotation.lock().unwrap().is_running());
    }

    #[test]
    fn test_close_week_is_admin_only() {
        let state = memory_state(&MemoryStore::new());

        login(&state, "Anderson", "123").unwrap();
        set_cell(&state, "Anderson", Weekday::Monday, 25.0).unwrap();
        assert!(close_week_now(&state).is_err());

        login(&state, "admin", "admin123").unwrap();
        let closeout = close_week_now(&state).unwrap();
        assert_eq!(closeout.total, 25.0);

        let weeks = get_week_history(&state, 10).unwrap();
        assert_eq!(weeks.len(), 1);
        let view = get_spreadsheet(&state).unwrap();
        assert_eq!(view.grand_total, 0.0);
    }
}
