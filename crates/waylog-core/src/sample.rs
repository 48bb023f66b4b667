//! Location samples and history formatting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::PositionFix;

/// A single recorded location. Immutable once created.
///
/// History is an ordered sequence of samples, newest first, with no
/// eviction -- it grows for as long as the fetch loop runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Fix timestamp in epoch milliseconds; doubles as the sample id.
    pub id: i64,
    pub lat: f64,
    pub long: f64,
    /// Fix time formatted for display, `DD/MM/YYYY - HH:MM:SS`.
    pub datetime: String,
    /// List row title; same formatted timestamp.
    pub title: String,
}

impl LocationSample {
    /// Build a sample from a raw provider fix.
    pub fn from_fix(fix: &PositionFix) -> Self {
        let formatted = format_fix_time(fix.time);
        Self {
            id: fix.time,
            lat: fix.lat,
            long: fix.long,
            datetime: formatted.clone(),
            title: formatted,
        }
    }

    /// Whether this sample sits at the same coordinates as the given fix.
    pub fn same_position(&self, fix: &PositionFix) -> bool {
        self.lat == fix.lat && self.long == fix.long
    }
}

/// Format an epoch-ms fix time as `DD/MM/YYYY - HH:MM:SS` (UTC).
///
/// A fix time outside the representable chrono range falls back to the
/// epoch rather than failing the tick.
pub fn format_fix_time(epoch_ms: i64) -> String {
    let dt: DateTime<Utc> = DateTime::from_timestamp_millis(epoch_ms)
        .unwrap_or_else(|| DateTime::from_timestamp_millis(0).unwrap_or_default());
    dt.format("%d/%m/%Y - %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_carries_fix_fields() {
        let fix = PositionFix {
            lat: 10.0,
            long: 20.0,
            time: 1_700_000_000_000,
        };
        let sample = LocationSample::from_fix(&fix);
        assert_eq!(sample.id, 1_700_000_000_000);
        assert_eq!(sample.lat, 10.0);
        assert_eq!(sample.long, 20.0);
        assert_eq!(sample.datetime, sample.title);
    }

    #[test]
    fn format_is_day_month_year_time() {
        // 2023-11-14 22:13:20 UTC
        assert_eq!(format_fix_time(1_700_000_000_000), "14/11/2023 - 22:13:20");
    }

    #[test]
    fn same_position_is_exact_equality() {
        let fix = PositionFix {
            lat: 10.0,
            long: 20.0,
            time: 0,
        };
        let sample = LocationSample::from_fix(&fix);
        assert!(sample.same_position(&fix));
        let nudged = PositionFix {
            lat: 10.000001,
            ..fix
        };
        assert!(!sample.same_position(&nudged));
    }

    #[test]
    fn out_of_range_time_falls_back_to_epoch() {
        assert_eq!(format_fix_time(i64::MAX), "01/01/1970 - 00:00:00");
    }
}
