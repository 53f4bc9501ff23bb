//! Pure view projections.
//!
//! State in, render description out — no side effects, no store access.
//! The UI host (whatever it is) consumes these structs verbatim.

use serde::Serialize;

use crate::playlist::PlaylistBoard;
use crate::roster::Roster;
use crate::types::{DayRecord, ItemKind, PlaylistItem, Principal, Weekday};

// =============================================================================
// Sales board
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub employee: String,
    pub values: DayRecord,
    pub weekly_total: f64,
    /// Whether the acting principal may edit this row (admin or owner).
    pub editable: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetView {
    pub rows: Vec<SheetRow>,
    pub column_totals: DayRecord,
    pub grand_total: f64,
}

/// Project the sheet for a given viewer. With no principal every row is
/// read-only.
pub fn spreadsheet_view(roster: &Roster, principal: Option<&Principal>) -> SpreadsheetView {
    let rows = roster
        .employees()
        .iter()
        .map(|employee| SheetRow {
            employee: employee.name.clone(),
            values: roster.day_record(&employee.name),
            weekly_total: roster.weekly_total(&employee.name),
            editable: principal
                .map(|p| p.can_edit_row(&employee.name))
                .unwrap_or(false),
        })
        .collect();

    let mut column_totals = DayRecord::default();
    for day in Weekday::ALL {
        column_totals.set(day, roster.column_total(day));
    }

    SpreadsheetView {
        rows,
        column_totals,
        grand_total: roster.grand_total(),
    }
}

// =============================================================================
// Signage player
// =============================================================================

/// The five fixed presentation modes a renderer must dispatch on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Presentation {
    /// Raw image.
    Image { url: String, title: Option<String> },
    /// Embedded page.
    EmbeddedPage { url: String, title: Option<String> },
    /// Embedded document viewer (PDF slides).
    DocumentViewer { url: String },
    /// Embedded spreadsheet.
    EmbeddedSheet { url: String },
    /// Nothing to show, or an unsupported item.
    Empty,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerOverlay {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePosition {
    /// 1-based position inside the rotation, for the "2 of 5" caption.
    pub current: usize,
    pub total: usize,
}

/// Everything the signage renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFrame {
    pub presentation: Presentation,
    pub ticker: Option<TickerOverlay>,
    pub position: Option<FramePosition>,
    pub playing: bool,
}

pub fn display_frame(board: &PlaylistBoard) -> DisplayFrame {
    let presentation = board
        .current_item()
        .map(presentation_for)
        .unwrap_or(Presentation::Empty);

    let ticker = board.current_ticker().map(|item| TickerOverlay {
        url: item.url.clone(),
        title: item.title.clone(),
    });

    let total = board.non_ticker_len();
    let position = (total > 0).then(|| FramePosition {
        current: board.player_state().index + 1,
        total,
    });

    DisplayFrame {
        presentation,
        ticker,
        position,
        playing: board.is_playing(),
    }
}

fn presentation_for(item: &PlaylistItem) -> Presentation {
    match item.kind {
        ItemKind::Image => Presentation::Image {
            url: item.url.clone(),
            title: item.title.clone(),
        },
        ItemKind::Website => Presentation::EmbeddedPage {
            url: item.url.clone(),
            title: item.title.clone(),
        },
        ItemKind::Slide => Presentation::DocumentViewer {
            url: item.url.clone(),
        },
        ItemKind::Spreadsheet => Presentation::EmbeddedSheet {
            url: item.url.clone(),
        },
        // Tickers never enter the rotation; reaching here means the
        // item cannot be presented as main content.
        ItemKind::RssTicker => Presentation::Empty,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub name: String,
    pub items: usize,
}

/// Playlist management panel: every playlist, plus the current one's
/// items in full.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsView {
    pub current: String,
    pub playlists: Vec<PlaylistSummary>,
    pub items: Vec<PlaylistItem>,
}

pub fn playlists_view(board: &PlaylistBoard) -> PlaylistsView {
    PlaylistsView {
        current: board.document().current.clone(),
        playlists: board
            .playlist_summaries()
            .into_iter()
            .map(|(name, items)| PlaylistSummary { name, items })
            .collect(),
        items: board.items().to_vec(),
    }
}

// =============================================================================
// Currency
// =============================================================================

/// Brazilian number format: thousands separated by '.', cents by ','.
pub fn format_brl(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    format!("{}{},{:02}", if negative { "-" } else { "" }, grouped, frac)
}

/// `format_brl` with the currency sign, as shown in the sheet cells.
pub fn format_currency(value: f64) -> String {
    format!("R$ {}", format_brl(value))
}
