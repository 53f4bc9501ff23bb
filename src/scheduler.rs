//! Scheduler for the daily snapshot and the weekly close-out
//!
//! Manages the two cron jobs with support for:
//! - Cron expression parsing
//! - Timezone-aware scheduling
//! - Sleep/wake detection via time-jump polling
//! - Missed job handling (runs if within a grace period)

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use thiserror::Error;

use crate::state::AppState;
use crate::types::{JobId, ScheduleEntry, Schedules};

/// Grace period for missed jobs (2 hours)
const MISSED_JOB_GRACE_PERIOD_SECS: i64 = 7200;

/// Extended grace period for the weekly close-out (24 hours) — catches
/// machines that slept through Monday night
const MISSED_WEEKLY_JOB_GRACE_PERIOD_SECS: i64 = 86400;

/// Time jump threshold to detect sleep/wake (5 minutes)
const TIME_JUMP_THRESHOLD_SECS: i64 = 300;

/// Poll interval for the scheduler loop (1 minute)
const POLL_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expr}': {message}")]
    InvalidCron { expr: String, message: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Why a job ran.
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    Scheduled,
    Missed,
    Manual,
}

/// Scheduler for the two background jobs.
pub struct Scheduler {
    state: Arc<AppState>,
}

impl Scheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        Scheduler { state }
    }

    /// Run indefinitely, checking for due jobs every minute and catching
    /// up after sleep/wake gaps.
    pub async fn run(&self) {
        let mut last_check = Utc::now();

        loop {
            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let now = Utc::now();

            let time_jump = (now - last_check).num_seconds();
            if time_jump > TIME_JUMP_THRESHOLD_SECS {
                log::info!(
                    "Detected system wake (time jumped {} seconds), checking for missed jobs",
                    time_jump
                );
                self.check_missed_jobs(now);
            }

            self.check_and_run_due_jobs(now);

            last_check = now;
        }
    }

    /// Current schedule table: configured values, or the defaults when no
    /// config file exists (the jobs predate the config file).
    fn schedules(&self) -> Schedules {
        self.state
            .config
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|c| c.schedules.clone()))
            .unwrap_or_default()
    }

    fn check_and_run_due_jobs(&self, now: DateTime<Utc>) {
        let schedules = self.schedules();

        for (entry, job) in [
            (&schedules.daily_snapshot, JobId::DailySnapshot),
            (&schedules.week_reset, JobId::WeekReset),
        ] {
            if !entry.enabled {
                continue;
            }
            match self.should_run_now(entry, job, now) {
                Ok(true) => self.run_job(job, entry, Trigger::Scheduled, now),
                Ok(false) => {}
                Err(e) => log::warn!("Skipping {:?}: {}", job, e),
            }
        }
    }

    /// Check if a job should run at the given time.
    fn should_run_now(
        &self,
        entry: &ScheduleEntry,
        job: JobId,
        now: DateTime<Utc>,
    ) -> Result<bool, ScheduleError> {
        let schedule = parse_cron(&entry.cron)?;
        let tz = parse_timezone(&entry.timezone)?;

        let now_local = now.with_timezone(&tz);
        let last_run = self.state.get_last_scheduled_run(job);

        // Find the most recent scheduled time around now.
        let mut scheduled_times = schedule.after(&(now_local - chrono::Duration::minutes(2)));

        if let Some(next_time) = scheduled_times.next() {
            let next_utc = next_time.with_timezone(&Utc);
            let diff = (now - next_utc).num_seconds().abs();

            // Within 2 minutes of the scheduled time.
            if diff < 120 {
                if let Some(last) = last_run {
                    if (last - next_utc).num_seconds().abs() < 60 {
                        return Ok(false); // Already ran
                    }
                }
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Check for jobs that were missed during sleep.
    fn check_missed_jobs(&self, now: DateTime<Utc>) {
        let schedules = self.schedules();

        for (entry, job) in [
            (&schedules.daily_snapshot, JobId::DailySnapshot),
            (&schedules.week_reset, JobId::WeekReset),
        ] {
            if !entry.enabled {
                continue;
            }
            match self.find_missed_job(entry, job, now) {
                Ok(Some(_)) => {
                    log::info!("Found missed {:?} job, running now", job);
                    self.run_job(job, entry, Trigger::Missed, now);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Skipping missed-job check for {:?}: {}", job, e),
            }
        }
    }

    /// Find a missed run within the grace period. The weekly close-out
    /// gets an extended 24-hour window.
    fn find_missed_job(
        &self,
        entry: &ScheduleEntry,
        job: JobId,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        let schedule = parse_cron(&entry.cron)?;
        let tz = parse_timezone(&entry.timezone)?;

        let now_local = now.with_timezone(&tz);
        let grace_secs = match job {
            JobId::WeekReset => MISSED_WEEKLY_JOB_GRACE_PERIOD_SECS,
            _ => MISSED_JOB_GRACE_PERIOD_SECS,
        };
        let grace_start = now_local - chrono::Duration::seconds(grace_secs);

        let last_run = self.state.get_last_scheduled_run(job);

        for scheduled in schedule.after(&grace_start) {
            let scheduled_utc = scheduled.with_timezone(&Utc);

            if scheduled_utc > now {
                break;
            }

            if let Some(last) = last_run {
                if last >= scheduled_utc {
                    continue; // Already ran
                }
            }

            return Ok(Some(scheduled_utc));
        }

        Ok(None)
    }

    /// Execute a job against the live state.
    fn run_job(&self, job: JobId, entry: &ScheduleEntry, trigger: Trigger, now: DateTime<Utc>) {
        self.state.set_last_scheduled_run(job, now);

        // "Today" in the job's own timezone, not the machine's.
        let today = match parse_timezone(&entry.timezone) {
            Ok(tz) => now.with_timezone(&tz).date_naive(),
            Err(_) => now.date_naive(),
        };

        // Lock order: roster before db, everywhere.
        let mut roster = match self.state.roster.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let db_guard = match self.state.db.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let Some(db) = db_guard.as_ref() else {
            log::warn!("Skipping {:?} ({:?}): history database unavailable", job, trigger);
            return;
        };

        match job {
            JobId::DailySnapshot => {
                match crate::archive::daily_snapshot(&roster, db, today) {
                    Ok(Some(report)) => log::info!(
                        "Daily snapshot ({:?}) recorded — {} total {:.2}",
                        trigger,
                        report.day,
                        report.total
                    ),
                    Ok(None) => {}
                    Err(e) => log::error!("Daily snapshot failed: {}", e),
                }
            }
            JobId::WeekReset => match crate::archive::close_week(&mut roster, db, today) {
                Ok(closeout) => log::info!(
                    "Week close-out ({:?}) recorded — {} total {:.2}",
                    trigger,
                    closeout.week_label,
                    closeout.total
                ),
                Err(e) => log::error!("Week close-out failed: {}", e),
            },
        }
    }
}

/// Parse a 5-field cron expression. The cron crate expects 6 fields
/// (with seconds), so "0" is prepended.
pub fn parse_cron(expr: &str) -> Result<Schedule, ScheduleError> {
    let full_expr = format!("0 {}", expr);

    full_expr
        .parse::<Schedule>()
        .map_err(|e| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            message: e.to_string(),
        })
}

fn parse_timezone(tz: &str) -> Result<Tz, ScheduleError> {
    tz.parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(tz.to_string()))
}

/// The next time a schedule entry will fire.
pub fn next_run_time(entry: &ScheduleEntry) -> Result<DateTime<Utc>, ScheduleError> {
    let schedule = parse_cron(&entry.cron)?;
    let tz = parse_timezone(&entry.timezone)?;

    let next = schedule
        .upcoming(tz)
        .next()
        .ok_or_else(|| ScheduleError::InvalidCron {
            expr: entry.cron.clone(),
            message: "no upcoming scheduled time".to_string(),
        })?;

    Ok(next.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cron_weekday_evenings() {
        assert!(parse_cron("20 18 * * 1-5").is_ok());
    }

    #[test]
    fn test_parse_cron_monday_reset() {
        assert!(parse_cron("1 0 * * 1").is_ok());
    }

    #[test]
    fn test_parse_cron_invalid() {
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn test_default_schedules_parse() {
        let schedules = Schedules::default();
        assert!(parse_cron(&schedules.daily_snapshot.cron).is_ok());
        assert!(parse_cron(&schedules.week_reset.cron).is_ok());
        assert!(next_run_time(&schedules.week_reset).is_ok());
    }

    #[test]
    fn test_next_run_time_rejects_bad_timezone() {
        let entry = ScheduleEntry {
            enabled: true,
            cron: "0 8 * * 1-5".to_string(),
            timezone: "Mars/Olympus".to_string(),
        };
        assert!(matches!(
            next_run_time(&entry),
            Err(ScheduleError::InvalidTimezone(_))
        ));
    }
}
