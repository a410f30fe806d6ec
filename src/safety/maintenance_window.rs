//! Maintenance-window gating: cron + timezone windows during which live
//! mutation is permitted. Outside all configured windows, live mutation
//! is blocked (dry-run still emits).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;

use crate::types::MaintenanceWindow;

#[derive(Debug, Error)]
pub enum MaintenanceWindowError {
    #[error("invalid cron expression '{0}': {1}")]
    InvalidCron(String, String),
    #[error("unresolvable timezone '{0}'")]
    InvalidTimezone(String),
}

fn parse_tz(tz: &str) -> Result<chrono_tz::Tz, MaintenanceWindowError> {
    chrono_tz::Tz::from_str(tz).map_err(|_| MaintenanceWindowError::InvalidTimezone(tz.to_string()))
}

fn parse_schedule(cron_expr: &str) -> Result<Schedule, MaintenanceWindowError> {
    Schedule::from_str(cron_expr).map_err(|e| MaintenanceWindowError::InvalidCron(cron_expr.to_string(), e.to_string()))
}

/// Whether `now` falls inside this window's most recent occurrence.
pub fn is_active(window: &MaintenanceWindow, now: DateTime<Utc>) -> Result<bool, MaintenanceWindowError> {
    let tz = parse_tz(&window.timezone)?;
    let schedule = parse_schedule(&window.cron)?;
    let duration = chrono::Duration::minutes(i64::from(window.duration_minutes));
    let now_tz = now.with_timezone(&tz);
    let search_from = now_tz - duration - chrono::Duration::seconds(1);

    let Some(occurrence) = schedule.after(&search_from).next() else {
        return Ok(false);
    };
    Ok(occurrence <= now_tz && now_tz <= occurrence + duration)
}

/// True iff `now` falls inside at least one configured window. Windows
/// with an invalid cron/timezone are treated as inactive rather than
/// failing the whole check (admission validation is responsible for
/// rejecting malformed windows before they reach here).
pub fn any_active(windows: &[MaintenanceWindow], now: DateTime<Utc>) -> bool {
    windows.iter().any(|w| is_active(w, now).unwrap_or(false))
}

/// Index of the active window, if any, matching `any_active`'s semantics.
pub fn active_index(windows: &[MaintenanceWindow], now: DateTime<Utc>) -> Option<usize> {
    windows.iter().position(|w| is_active(w, now).unwrap_or(false))
}

/// Earliest upcoming start, across all windows, strictly after `now`.
pub fn next_window_start(windows: &[MaintenanceWindow], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    windows
        .iter()
        .filter_map(|w| {
            let tz = parse_tz(&w.timezone).ok()?;
            let schedule = parse_schedule(&w.cron).ok()?;
            let now_tz = now.with_timezone(&tz);
            schedule.after(&now_tz).next().map(|dt| dt.with_timezone(&Utc))
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> MaintenanceWindow {
        MaintenanceWindow {
            cron: "0 2 * * *".to_string(),
            duration_minutes: 60,
            timezone: "UTC".to_string(),
        }
    }

    #[test]
    fn active_during_window() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 2, 30, 0).unwrap();
        assert!(is_active(&window(), now).unwrap());
    }

    #[test]
    fn inactive_outside_window() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        assert!(!is_active(&window(), now).unwrap());
    }

    #[test]
    fn invalid_cron_errors() {
        let bad = MaintenanceWindow { cron: "not a cron".to_string(), ..window() };
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(is_active(&bad, now).is_err());
    }

    #[test]
    fn next_window_start_is_in_the_future() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let next = next_window_start(&[window()], now).unwrap();
        assert!(next > now);
    }
}
