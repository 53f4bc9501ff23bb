//! SQLite-backed sales history.
//!
//! The sheet JSON stays the source of truth for the running week; this
//! database keeps what the weekly reset would otherwise destroy: one row
//! per seller per day, and one consolidated row per closed-out week.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use thiserror::Error;

use crate::types::{SellerTotal, Weekday};

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Corrupt breakdown column: {0}")]
    CorruptBreakdown(#[from] serde_json::Error),
}

/// A row from the `daily_sales` table. Only the column matching `day`'s
/// weekday carries a value; the others stay zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySaleRow {
    pub id: String,
    pub seller: String,
    pub day: String,
    pub monday: f64,
    pub tuesday: f64,
    pub wednesday: f64,
    pub thursday: f64,
    pub friday: f64,
    pub total: f64,
    pub created_at: String,
}

/// A row from the `week_history` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekHistoryRow {
    pub id: String,
    pub week_label: String,
    pub started_at: String,
    pub ended_at: String,
    pub total: f64,
    pub breakdown: Vec<SellerTotal>,
    pub created_at: String,
}

/// SQLite connection wrapper for the sales history.
///
/// Intentionally not `Clone` or `Sync`: it lives behind a
/// `std::sync::Mutex` in `AppState` and is accessed synchronously.
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
        }
        let conn = Connection::open(path)?;
        let db = HistoryDb { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = HistoryDb { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS daily_sales (
                id TEXT PRIMARY KEY,
                seller TEXT NOT NULL,
                day TEXT NOT NULL,
                monday REAL NOT NULL DEFAULT 0,
                tuesday REAL NOT NULL DEFAULT 0,
                wednesday REAL NOT NULL DEFAULT 0,
                thursday REAL NOT NULL DEFAULT 0,
                friday REAL NOT NULL DEFAULT 0,
                total REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_daily_sales_day ON daily_sales(day);

            CREATE TABLE IF NOT EXISTS week_history (
                id TEXT PRIMARY KEY,
                week_label TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                total REAL NOT NULL,
                breakdown TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Record one seller's value for one day. The value lands in the
    /// column matching the weekday, mirroring the sheet layout.
    pub fn insert_daily(
        &self,
        seller: &str,
        date: NaiveDate,
        day: Weekday,
        value: f64,
    ) -> Result<(), DbError> {
        let mut columns = [0.0f64; 5];
        columns[Weekday::ALL.iter().position(|d| *d == day).unwrap_or(0)] = value;

        self.conn.execute(
            "INSERT INTO daily_sales
                (id, seller, day, monday, tuesday, wednesday, thursday, friday, total, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                uuid::Uuid::new_v4().to_string(),
                seller,
                date.to_string(),
                columns[0],
                columns[1],
                columns[2],
                columns[3],
                columns[4],
                value,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Record a closed-out week; returns the row id so a failed sheet
    /// reset can compensate by deleting it.
    pub fn insert_week(
        &self,
        week_label: &str,
        started_at: NaiveDate,
        ended_at: NaiveDate,
        total: f64,
        breakdown: &[SellerTotal],
    ) -> Result<String, DbError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO week_history
                (id, week_label, started_at, ended_at, total, breakdown, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                week_label,
                started_at.to_string(),
                ended_at.to_string(),
                total,
                serde_json::to_string(breakdown)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    /// Record one value per seller for one day inside a single
    /// transaction: either the whole snapshot lands or none of it.
    pub fn insert_daily_batch(
        &self,
        date: NaiveDate,
        day: Weekday,
        rows: &[(String, f64)],
    ) -> Result<(), DbError> {
        let day_index = Weekday::ALL.iter().position(|d| *d == day).unwrap_or(0);
        let tx = self.conn.unchecked_transaction()?;
        for (seller, value) in rows {
            let mut columns = [0.0f64; 5];
            columns[day_index] = *value;
            tx.execute(
                "INSERT INTO daily_sales
                    (id, seller, day, monday, tuesday, wednesday, thursday, friday, total, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    seller,
                    date.to_string(),
                    columns[0],
                    columns[1],
                    columns[2],
                    columns[3],
                    columns[4],
                    value,
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_week(&self, id: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM week_history WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Newest-first daily rows.
    pub fn daily_history(&self, limit: usize) -> Result<Vec<DailySaleRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seller, day, monday, tuesday, wednesday, thursday, friday, total, created_at
             FROM daily_sales ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(DailySaleRow {
                id: row.get(0)?,
                seller: row.get(1)?,
                day: row.get(2)?,
                monday: row.get(3)?,
                tuesday: row.get(4)?,
                wednesday: row.get(5)?,
                thursday: row.get(6)?,
                friday: row.get(7)?,
                total: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Newest-first closed-out weeks.
    pub fn week_history(&self, limit: usize) -> Result<Vec<WeekHistoryRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, week_label, started_at, ended_at, total, breakdown, created_at
             FROM week_history ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows.filter_map(|r| r.ok()) {
            let (id, week_label, started_at, ended_at, total, breakdown, created_at) = row;
            result.push(WeekHistoryRow {
                id,
                week_label,
                started_at,
                ended_at,
                total,
                breakdown: serde_json::from_str(&breakdown)?,
                created_at,
            });
        }
        Ok(result)
    }

    /// Sum of everything recorded for one date.
    pub fn total_for_date(&self, date: NaiveDate) -> Result<f64, DbError> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(total), 0) FROM daily_sales WHERE day = ?1",
            params![date.to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Sum of everything recorded in an inclusive date range.
    pub fn total_between(&self, start: NaiveDate, end: NaiveDate) -> Result<f64, DbError> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(total), 0) FROM daily_sales WHERE day >= ?1 AND day <= ?2",
            params![start.to_string(), end.to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Per-weekday-column sums over an inclusive date range — the "which
    /// day of this week sold what" breakdown.
    pub fn weekday_breakdown(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<[f64; 5], DbError> {
        let row = self.conn.query_row(
            "SELECT COALESCE(SUM(monday), 0), COALESCE(SUM(tuesday), 0),
                    COALESCE(SUM(wednesday), 0), COALESCE(SUM(thursday), 0),
                    COALESCE(SUM(friday), 0)
             FROM daily_sales WHERE day >= ?1 AND day <= ?2",
            params![start.to_string(), end.to_string()],
            |row| {
                Ok([
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ])
            },
        )?;
        Ok(row)
    }

    /// Date and total of every row in an inclusive range, for week-of-month
    /// bucketing.
    pub fn daily_totals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT day, total FROM daily_sales WHERE day >= ?1 AND day <= ?2",
        )?;
        let rows = stmt.query_map(params![start.to_string(), end.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        Ok(rows
            .filter_map(|r| r.ok())
            .filter_map(|(day, total)| day.parse::<NaiveDate>().ok().map(|d| (d, total)))
            .collect())
    }

    /// Per-month totals over the whole history, oldest month first.
    pub fn monthly_rollup(&self) -> Result<Vec<(String, f64)>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT substr(day, 1, 7) AS month, SUM(total)
             FROM daily_sales GROUP BY month ORDER BY month",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_insert_daily_fills_only_the_matching_column() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.insert_daily("Anna", date(2026, 8, 5), Weekday::Wednesday, 12.5)
            .unwrap();

        let rows = db.daily_history(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].wednesday, 12.5);
        assert_eq!(rows[0].monday, 0.0);
        assert_eq!(rows[0].total, 12.5);
    }

    #[test]
    fn test_totals_by_date_and_range() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.insert_daily("Anna", date(2026, 8, 3), Weekday::Monday, 10.0)
            .unwrap();
        db.insert_daily("Beto", date(2026, 8, 3), Weekday::Monday, 5.0)
            .unwrap();
        db.insert_daily("Anna", date(2026, 8, 4), Weekday::Tuesday, 2.0)
            .unwrap();

        assert_eq!(db.total_for_date(date(2026, 8, 3)).unwrap(), 15.0);
        assert_eq!(
            db.total_between(date(2026, 8, 3), date(2026, 8, 7)).unwrap(),
            17.0
        );
        assert_eq!(db.total_for_date(date(2026, 8, 10)).unwrap(), 0.0);
    }

    #[test]
    fn test_weekday_breakdown() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.insert_daily("Anna", date(2026, 8, 3), Weekday::Monday, 10.0)
            .unwrap();
        db.insert_daily("Anna", date(2026, 8, 7), Weekday::Friday, 4.0)
            .unwrap();

        let breakdown = db
            .weekday_breakdown(date(2026, 8, 3), date(2026, 8, 7))
            .unwrap();
        assert_eq!(breakdown[0], 10.0);
        assert_eq!(breakdown[4], 4.0);
        assert_eq!(breakdown[2], 0.0);
    }

    #[test]
    fn test_week_history_roundtrip_and_compensation_delete() {
        let db = HistoryDb::open_in_memory().unwrap();
        let breakdown = vec![
            SellerTotal {
                seller: "Anna".to_string(),
                total: 10.0,
            },
            SellerTotal {
                seller: "Beto".to_string(),
                total: 5.0,
            },
        ];
        let id = db
            .insert_week(
                "2026-08-03 a 2026-08-07",
                date(2026, 8, 3),
                date(2026, 8, 7),
                15.0,
                &breakdown,
            )
            .unwrap();

        let weeks = db.week_history(10).unwrap();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].total, 15.0);
        assert_eq!(weeks[0].breakdown.len(), 2);
        assert_eq!(weeks[0].breakdown[0].seller, "Anna");

        db.delete_week(&id).unwrap();
        assert!(db.week_history(10).unwrap().is_empty());
    }

    #[test]
    fn test_monthly_rollup_groups_by_month() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.insert_daily("Anna", date(2026, 7, 31), Weekday::Friday, 1.0)
            .unwrap();
        db.insert_daily("Anna", date(2026, 8, 3), Weekday::Monday, 2.0)
            .unwrap();
        db.insert_daily("Beto", date(2026, 8, 4), Weekday::Tuesday, 3.0)
            .unwrap();

        let rollup = db.monthly_rollup().unwrap();
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0], ("2026-07".to_string(), 1.0));
        assert_eq!(rollup[1], ("2026-08".to_string(), 5.0));
    }
}
