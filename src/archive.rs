//! Week close-out, daily snapshots, and the sales summary.
//!
//! The close-out is all-or-nothing across its two stores: the history
//! row is written first, and if resetting the sheet fails the row is
//! deleted again — a half-closed week never survives.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::db::{DbError, HistoryDb};
use crate::error::StoreError;
use crate::roster::Roster;
use crate::types::{SellerTotal, Weekday};
use crate::util::{week_bounds, week_label};

/// Result of closing out a week.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCloseout {
    pub week_label: String,
    pub total: f64,
    pub breakdown: Vec<SellerTotal>,
}

/// Result of a daily snapshot run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: String,
    pub day: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotal {
    pub day: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTotal {
    pub month: String,
    pub total: f64,
}

/// Aggregates for the summary page: today, the running week, the running
/// month, with per-day and per-week breakdowns and the all-time monthly
/// rollup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub today_total: f64,
    pub week_total: f64,
    pub month_total: f64,
    pub week_days: Vec<DayTotal>,
    pub month_week_totals: Vec<f64>,
    pub monthly: Vec<MonthTotal>,
}

fn db_err(err: DbError) -> StoreError {
    StoreError::Persistence(err.to_string())
}

/// Close the running week: record per-seller totals under a week label,
/// then zero and persist the sheet.
pub fn close_week(
    roster: &mut Roster,
    db: &HistoryDb,
    today: NaiveDate,
) -> Result<WeekCloseout, StoreError> {
    let breakdown = roster.seller_totals();
    let total: f64 = breakdown.iter().map(|s| s.total).sum();
    let (monday, friday) = week_bounds(today);
    let label = week_label(monday, friday);

    let row_id = db
        .insert_week(&label, monday, friday, total, &breakdown)
        .map_err(db_err)?;

    if let Err(err) = roster.reset_week() {
        // Compensate: the sheet kept its values, so the history row must
        // go too or the week would be counted twice.
        if let Err(del_err) = db.delete_week(&row_id) {
            log::error!(
                "Week close-out left an orphan history row {}: {}",
                row_id,
                del_err
            );
        }
        return Err(err);
    }

    log::info!("Closed week {} — total {:.2}", label, total);
    Ok(WeekCloseout {
        week_label: label,
        total,
        breakdown,
    })
}

/// Record every seller's value for today's column. Weekends have no
/// column and return `None` without touching the database.
pub fn daily_snapshot(
    roster: &Roster,
    db: &HistoryDb,
    today: NaiveDate,
) -> Result<Option<DailyReport>, StoreError> {
    let Some(day) = Weekday::from_calendar(today.weekday()) else {
        log::info!("Weekend ({}) — skipping daily snapshot", today);
        return Ok(None);
    };

    let rows: Vec<(String, f64)> = roster
        .employees()
        .iter()
        .map(|e| (e.name.clone(), roster.day_record(&e.name).get(day)))
        .collect();
    let total: f64 = rows.iter().map(|(_, v)| v).sum();

    db.insert_daily_batch(today, day, &rows).map_err(db_err)?;

    log::info!(
        "Daily snapshot for {} ({}) — total {:.2}",
        day.label(),
        today,
        total
    );
    Ok(Some(DailyReport {
        date: today.to_string(),
        day: day.label().to_string(),
        total,
    }))
}

/// Build the summary aggregates for a given "today".
pub fn summary(db: &HistoryDb, today: NaiveDate) -> Result<SummaryReport, StoreError> {
    let (monday, friday) = week_bounds(today);
    let month_start = today.with_day(1).expect("day 1 always exists");
    let month_end = last_day_of_month(today);

    let today_total = db.total_for_date(today).map_err(db_err)?;
    let week_total = db.total_between(monday, friday).map_err(db_err)?;
    let month_total = db.total_between(month_start, month_end).map_err(db_err)?;

    let breakdown = db.weekday_breakdown(monday, friday).map_err(db_err)?;
    let week_days = Weekday::ALL
        .iter()
        .zip(breakdown.iter())
        .map(|(day, total)| DayTotal {
            day: day.label().to_string(),
            total: *total,
        })
        .collect();

    // Bucket the month's rows into calendar weeks, Monday-aligned: week 0
    // holds day 1 up to the first weekend.
    let first_weekday = month_start.weekday().num_days_from_monday();
    let num_weeks = ((month_end.day() + first_weekday) / 7 + 1) as usize;
    let mut month_week_totals = vec![0.0; num_weeks];
    for (date, total) in db
        .daily_totals_between(month_start, month_end)
        .map_err(db_err)?
    {
        let index = ((date.day() + first_weekday).saturating_sub(1) / 7) as usize;
        if index < num_weeks {
            month_week_totals[index] += total;
        }
    }

    let monthly = db
        .monthly_rollup()
        .map_err(db_err)?
        .into_iter()
        .map(|(month, total)| MonthTotal { month, total })
        .collect();

    Ok(SummaryReport {
        today_total,
        week_total,
        month_total,
        week_days,
        month_week_totals,
        monthly,
    })
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("first of month always exists");
    first_of_next - Duration::days(1)
}
