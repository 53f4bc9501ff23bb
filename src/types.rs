//! Shared domain types for the sales board and the signage player.
//!
//! Documents keep the wire names the existing front-ends already write
//! (`spreadsheetData`, item `type`/`duration`, `currentPlaylist`) so a
//! stored document from any variant loads unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Name of the playlist that always exists and cannot be deleted.
pub const DEFAULT_PLAYLIST: &str = "default";

// =============================================================================
// Sales board
// =============================================================================

/// The five tracked weekdays, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
        }
    }

    /// Portuguese label used in summaries and history rows.
    pub fn label(&self) -> &'static str {
        match self {
            Weekday::Monday => "segunda",
            Weekday::Tuesday => "terca",
            Weekday::Wednesday => "quarta",
            Weekday::Thursday => "quinta",
            Weekday::Friday => "sexta",
        }
    }

    /// Map a calendar weekday onto the sheet; weekends have no column.
    pub fn from_calendar(day: chrono::Weekday) -> Option<Weekday> {
        match day {
            chrono::Weekday::Mon => Some(Weekday::Monday),
            chrono::Weekday::Tue => Some(Weekday::Tuesday),
            chrono::Weekday::Wed => Some(Weekday::Wednesday),
            chrono::Weekday::Thu => Some(Weekday::Thursday),
            chrono::Weekday::Fri => Some(Weekday::Friday),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }
}

/// A roster entry. Passwords are stored as the source stores them:
/// plaintext, compared byte-for-byte at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub password: String,
}

/// One employee's week. All five days are always present; a document
/// written before a column existed reads back as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default)]
    pub monday: f64,
    #[serde(default)]
    pub tuesday: f64,
    #[serde(default)]
    pub wednesday: f64,
    #[serde(default)]
    pub thursday: f64,
    #[serde(default)]
    pub friday: f64,
}

impl DayRecord {
    pub fn get(&self, day: Weekday) -> f64 {
        match day {
            Weekday::Monday => self.monday,
            Weekday::Tuesday => self.tuesday,
            Weekday::Wednesday => self.wednesday,
            Weekday::Thursday => self.thursday,
            Weekday::Friday => self.friday,
        }
    }

    pub fn set(&mut self, day: Weekday, value: f64) {
        match day {
            Weekday::Monday => self.monday = value,
            Weekday::Tuesday => self.tuesday = value,
            Weekday::Wednesday => self.wednesday = value,
            Weekday::Thursday => self.thursday = value,
            Weekday::Friday => self.friday = value,
        }
    }

    /// Sum of the five day values.
    pub fn total(&self) -> f64 {
        self.monday + self.tuesday + self.wednesday + self.thursday + self.friday
    }
}

/// The whole sales board as one opaque persistence unit. There are no
/// partial-field updates: every save rewrites the full document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterDocument {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default, rename = "spreadsheetData")]
    pub sheet: HashMap<String, DayRecord>,
}

/// One seller's contribution to a closed-out week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerTotal {
    pub seller: String,
    pub total: f64,
}

// =============================================================================
// Signage player
// =============================================================================

/// What a playlist item displays. `RssTicker` items never enter the
/// rotation; the first one found renders as a persistent overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    Image,
    Website,
    Slide,
    Spreadsheet,
    RssTicker,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Image => "image",
            ItemKind::Website => "website",
            ItemKind::Slide => "slide",
            ItemKind::Spreadsheet => "spreadsheet",
            ItemKind::RssTicker => "rss-ticker",
        }
    }
}

/// One entry of a playlist. Ids are epoch-millis derived and strictly
/// monotonic within a session, so insertion order is recoverable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub url: String,
    /// Display duration in milliseconds. Always positive.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Every playlist plus the name of the active one, persisted as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistDocument {
    #[serde(default)]
    pub playlists: HashMap<String, Vec<PlaylistItem>>,
    #[serde(default = "default_playlist_name", rename = "currentPlaylist")]
    pub current: String,
}

fn default_playlist_name() -> String {
    DEFAULT_PLAYLIST.to_string()
}

impl Default for PlaylistDocument {
    fn default() -> Self {
        let mut playlists = HashMap::new();
        playlists.insert(DEFAULT_PLAYLIST.to_string(), Vec::new());
        PlaylistDocument {
            playlists,
            current: default_playlist_name(),
        }
    }
}

/// Runtime player position. Only the playlist name survives restarts;
/// index and play state reset with the session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub playlist: String,
    /// Index into the non-ticker subsequence of the current playlist.
    /// Always in bounds, or 0 when that subsequence is empty.
    pub index: usize,
    pub playing: bool,
}

// =============================================================================
// Session
// =============================================================================

/// The logged-in identity used for controller-level gating.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub name: String,
    pub is_admin: bool,
}

impl Principal {
    /// Row edits are allowed for the admin and for the row's owner.
    pub fn can_edit_row(&self, employee: &str) -> bool {
        self.is_admin || self.name.to_lowercase() == employee.to_lowercase()
    }
}

/// Session probe result, shaped for the UI host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub is_admin: bool,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration stored in ~/.frontdesk/config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the JSON documents and the history DB.
    /// Empty means ~/.frontdesk.
    #[serde(default)]
    pub data_dir: String,
    #[serde(default)]
    pub schedules: Schedules,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: String::new(),
            schedules: Schedules::default(),
        }
    }
}

/// The two background jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedules {
    #[serde(default = "default_daily_snapshot_schedule")]
    pub daily_snapshot: ScheduleEntry,
    #[serde(default = "default_week_reset_schedule")]
    pub week_reset: ScheduleEntry,
}

impl Default for Schedules {
    fn default() -> Self {
        Schedules {
            daily_snapshot: default_daily_snapshot_schedule(),
            week_reset: default_week_reset_schedule(),
        }
    }
}

fn default_daily_snapshot_schedule() -> ScheduleEntry {
    ScheduleEntry {
        enabled: true,
        // Weekday evenings, after the shop closes
        cron: "20 18 * * Mon-Fri".to_string(),
        timezone: default_timezone(),
    }
}

fn default_week_reset_schedule() -> ScheduleEntry {
    ScheduleEntry {
        enabled: true,
        // First minute of Monday: close the previous week
        cron: "1 0 * * Mon".to_string(),
        timezone: default_timezone(),
    }
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

/// A single cron entry with its timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(default)]
    pub enabled: bool,
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Identifies a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobId {
    DailySnapshot,
    WeekReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_record_missing_days_read_as_zero() {
        let record: DayRecord = serde_json::from_str(r#"{"monday": 10.5}"#).unwrap();
        assert_eq!(record.monday, 10.5);
        assert_eq!(record.friday, 0.0);
        assert_eq!(record.total(), 10.5);
    }

    #[test]
    fn test_day_record_get_set_roundtrip() {
        let mut record = DayRecord::default();
        for (i, day) in Weekday::ALL.iter().enumerate() {
            record.set(*day, i as f64);
        }
        assert_eq!(record.get(Weekday::Wednesday), 2.0);
        assert_eq!(record.total(), 0.0 + 1.0 + 2.0 + 3.0 + 4.0);
    }

    #[test]
    fn test_item_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ItemKind::RssTicker).unwrap(),
            "\"rss-ticker\""
        );
        let kind: ItemKind = serde_json::from_str("\"slide\"").unwrap();
        assert_eq!(kind, ItemKind::Slide);
    }

    #[test]
    fn test_playlist_item_wire_shape() {
        // The shape the existing front-ends write: type + duration keys.
        let item: PlaylistItem = serde_json::from_str(
            r#"{"id": 1700000000000, "type": "image", "url": "https://x/a.png", "duration": 5000}"#,
        )
        .unwrap();
        assert_eq!(item.kind, ItemKind::Image);
        assert_eq!(item.duration_ms, 5000);
        assert!(item.title.is_none());
    }

    #[test]
    fn test_roster_document_wire_name() {
        let doc: RosterDocument = serde_json::from_str(
            r#"{"employees": [{"name": "Anna", "password": "123"}],
                "spreadsheetData": {"Anna": {"monday": 1.0}}}"#,
        )
        .unwrap();
        assert_eq!(doc.employees.len(), 1);
        assert_eq!(doc.sheet["Anna"].monday, 1.0);
    }

    #[test]
    fn test_weekend_has_no_column() {
        assert!(Weekday::from_calendar(chrono::Weekday::Sat).is_none());
        assert_eq!(
            Weekday::from_calendar(chrono::Weekday::Tue),
            Some(Weekday::Tuesday)
        );
    }

    #[test]
    fn test_default_schedules_have_timezone() {
        let schedules = Schedules::default();
        assert_eq!(schedules.daily_snapshot.timezone, "America/Sao_Paulo");
        assert!(schedules.week_reset.enabled);
    }
}
