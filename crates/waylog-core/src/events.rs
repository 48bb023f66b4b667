use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::LocationSample;
use crate::scheduler::Movement;

/// Every state change in the scheduler produces an Event.
/// The CLI prints them; the runtime reacts to them (timer handles,
/// persistence, notification display).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The location fetch loop was enabled.
    FetchStarted {
        interval_ms: u64,
        at: DateTime<Utc>,
    },
    /// The location fetch loop was disabled.
    FetchStopped {
        at: DateTime<Utc>,
    },
    /// A position fix was recorded and prepended to history.
    SampleRecorded {
        sample: LocationSample,
        history_len: usize,
        at: DateTime<Utc>,
    },
    /// Two consecutive fixes were identical; the stationary state was entered.
    BecameStationary {
        lat: f64,
        long: f64,
        at: DateTime<Utc>,
    },
    /// A differing fix arrived while stationary; movement resumed.
    MovementResumed {
        at: DateTime<Utc>,
    },
    /// The notification countdown was (re)started.
    CountdownStarted {
        interval_secs: u32,
        at: DateTime<Utc>,
    },
    /// The notification countdown was stopped.
    CountdownStopped {
        at: DateTime<Utc>,
    },
    /// The countdown hit zero; a notification should be displayed.
    NotificationDue {
        title: String,
        body: String,
        at: DateTime<Utc>,
    },
    /// Permission flags were re-derived from the OS.
    PermissionsReconciled {
        location_granted: bool,
        notification_granted: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        fetching: bool,
        movement: Movement,
        fetch_interval_ms: u64,
        notify_interval_secs: u32,
        seconds_left: u32,
        history_len: usize,
        location_permission_denied: bool,
        notification_permission_denied: bool,
        at: DateTime<Utc>,
    },
}
