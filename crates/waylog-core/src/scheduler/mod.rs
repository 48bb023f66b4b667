//! Location polling and stationary-notification scheduling.
//!
//! The scheduler is a tick-based state machine. It does not own timers or
//! talk to the platform -- the runtime feeds it position fixes and
//! countdown ticks, and reacts to the events it returns.
//!
//! ## State Transitions
//!
//! ```text
//! Moving -> Stationary   (two consecutive identical fixes, notifications permitted)
//!   entry: start countdown
//! Stationary -> Moving   (a differing fix arrives)
//!   exit: stop countdown, reset seconds_left
//! ```

mod countdown;
mod movement;

pub use countdown::Countdown;
pub use movement::Movement;

use chrono::Utc;

use crate::events::Event;
use crate::platform::{AuthorizationStatus, PositionFix};
use crate::sample::LocationSample;
use crate::storage::Settings;

/// Default location fetch period in milliseconds.
pub const DEFAULT_FETCH_INTERVAL_MS: u64 = 5_000;
/// Default seconds between stationary re-notifications. Session-scoped;
/// deliberately not persisted.
pub const DEFAULT_NOTIFY_INTERVAL_SECS: u32 = 600;

pub const NOTIFICATION_TITLE: &str = "You haven't moved for 10 minutes";
pub const NOTIFICATION_BODY: &str = "Tap here to stop collecting location";

/// Core scheduling state machine.
///
/// One instance per process, created at app start from persisted storage
/// and passed explicitly to consumers.
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Master switch for the fetch loop. Not persisted.
    fetching: bool,
    fetch_interval_ms: u64,
    /// Persisted feature toggles.
    fetch_enabled: bool,
    notify_enabled: bool,
    /// Derived from OS permission queries. Not persisted.
    location_permission_denied: bool,
    notification_permission_denied: bool,
    /// Newest first.
    history: Vec<LocationSample>,
    movement: Movement,
    countdown: Countdown,
}

impl Scheduler {
    /// Build from persisted settings and history (load-on-init).
    pub fn new(settings: &Settings, history: Vec<LocationSample>) -> Self {
        Self {
            fetching: false,
            fetch_interval_ms: settings.fetch_interval_ms,
            fetch_enabled: settings.fetch_enabled,
            notify_enabled: settings.notify_enabled,
            location_permission_denied: false,
            notification_permission_denied: false,
            history,
            movement: Movement::Moving,
            countdown: Countdown::new(DEFAULT_NOTIFY_INTERVAL_SECS),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    pub fn fetch_interval_ms(&self) -> u64 {
        self.fetch_interval_ms
    }

    pub fn notify_interval_secs(&self) -> u32 {
        self.countdown.interval_secs()
    }

    pub fn seconds_left(&self) -> u32 {
        self.countdown.seconds_left()
    }

    pub fn is_countdown_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn movement(&self) -> Movement {
        self.movement
    }

    pub fn history(&self) -> &[LocationSample] {
        &self.history
    }

    pub fn is_fetch_enabled(&self) -> bool {
        self.fetch_enabled
    }

    pub fn is_notify_enabled(&self) -> bool {
        self.notify_enabled
    }

    pub fn is_location_permission_denied(&self) -> bool {
        self.location_permission_denied
    }

    pub fn is_notification_permission_denied(&self) -> bool {
        self.notification_permission_denied
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            fetching: self.fetching,
            movement: self.movement,
            fetch_interval_ms: self.fetch_interval_ms,
            notify_interval_secs: self.countdown.interval_secs(),
            seconds_left: self.countdown.seconds_left(),
            history_len: self.history.len(),
            location_permission_denied: self.location_permission_denied,
            notification_permission_denied: self.notification_permission_denied,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enable the fetch loop. The runtime replaces its fetch timer on this
    /// event; restarting never stacks timers.
    pub fn start_fetching(&mut self) -> Event {
        self.fetching = true;
        self.fetch_enabled = true;
        Event::FetchStarted {
            interval_ms: self.fetch_interval_ms,
            at: Utc::now(),
        }
    }

    /// Disable the fetch loop. No other state changes.
    pub fn stop_fetching(&mut self) -> Event {
        self.fetching = false;
        self.fetch_enabled = false;
        Event::FetchStopped { at: Utc::now() }
    }

    /// Enable the notification feature and start the countdown ticking.
    pub fn start_countdown(&mut self) -> Event {
        self.notify_enabled = true;
        self.countdown.start();
        Event::CountdownStarted {
            interval_secs: self.countdown.interval_secs(),
            at: Utc::now(),
        }
    }

    /// Disable the notification feature and stop the countdown.
    pub fn stop_countdown(&mut self) -> Event {
        self.notify_enabled = false;
        self.countdown.stop();
        Event::CountdownStopped { at: Utc::now() }
    }

    /// One fetch-loop tick: compare the fix against the newest sample,
    /// drive the movement state machine, and prepend a new sample
    /// unconditionally.
    pub fn record_fix(&mut self, fix: PositionFix) -> Vec<Event> {
        let mut events = Vec::new();

        let same_as_newest = self
            .history
            .first()
            .map(|newest| newest.same_position(&fix))
            .unwrap_or(false);

        if same_as_newest && !self.notification_permission_denied {
            if !self.movement.is_stationary() {
                self.movement = Movement::Stationary;
                events.push(Event::BecameStationary {
                    lat: fix.lat,
                    long: fix.long,
                    at: Utc::now(),
                });
                events.push(self.start_countdown());
            }
        } else {
            // Differing fix, empty history, or notifications denied: reset
            // the counter and stop the countdown.
            self.countdown.reset();
            if self.countdown.stop() {
                events.push(Event::CountdownStopped { at: Utc::now() });
            }
            if self.movement.is_stationary() {
                self.movement = Movement::Moving;
                events.push(Event::MovementResumed { at: Utc::now() });
            }
        }

        let sample = LocationSample::from_fix(&fix);
        self.history.insert(0, sample.clone());
        events.push(Event::SampleRecorded {
            sample,
            history_len: self.history.len(),
            at: Utc::now(),
        });
        events
    }

    /// One 1-second countdown tick. Returns a `NotificationDue` event when
    /// the counter reaches zero; the counter resets to the full interval in
    /// the same tick.
    pub fn countdown_tick(&mut self) -> Option<Event> {
        if self.countdown.tick() {
            Some(Event::NotificationDue {
                title: NOTIFICATION_TITLE.into(),
                body: NOTIFICATION_BODY.into(),
                at: Utc::now(),
            })
        } else {
            None
        }
    }

    /// Apply a location permission query result. Idempotent; granting
    /// turns the fetch loop on, denial only gates future starts.
    pub fn apply_location_permission(&mut self, granted: bool) {
        self.location_permission_denied = !granted;
        if granted {
            self.fetching = true;
        }
    }

    /// Apply a notification authorization status.
    pub fn apply_notification_status(&mut self, status: AuthorizationStatus) {
        self.notification_permission_denied = !status.is_authorized();
    }

    // ── Setters (unguarded, exposed for the UI layer) ────────────────

    pub fn set_fetching(&mut self, fetching: bool) {
        self.fetching = fetching;
    }

    /// No validation: a zero interval is accepted and will fast-loop.
    pub fn set_fetch_interval_ms(&mut self, interval_ms: u64) {
        self.fetch_interval_ms = interval_ms;
    }

    pub fn set_history(&mut self, history: Vec<LocationSample>) {
        self.history = history;
    }

    /// Also resets `seconds_left` to the new interval. A zero interval is
    /// accepted and fires on the first countdown tick.
    pub fn set_notify_interval_secs(&mut self, interval_secs: u32) {
        self.countdown.set_interval(interval_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> Scheduler {
        Scheduler::new(&Settings::default(), Vec::new())
    }

    fn fix(lat: f64, long: f64, time: i64) -> PositionFix {
        PositionFix { lat, long, time }
    }

    fn has_countdown_started(events: &[Event]) -> bool {
        events
            .iter()
            .any(|e| matches!(e, Event::CountdownStarted { .. }))
    }

    #[test]
    fn first_fix_with_empty_history_only_records() {
        let mut s = scheduler();
        let events = s.record_fix(fix(10.0, 20.0, 1));
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.movement(), Movement::Moving);
        assert!(!s.is_countdown_running());
        assert_eq!(s.seconds_left(), s.notify_interval_secs());
        assert!(matches!(events.last(), Some(Event::SampleRecorded { .. })));
    }

    #[test]
    fn identical_consecutive_fixes_enter_stationary_once() {
        let mut s = scheduler();
        s.record_fix(fix(10.0, 20.0, 1));
        let second = s.record_fix(fix(10.0, 20.0, 2));
        assert_eq!(s.movement(), Movement::Stationary);
        assert!(s.is_countdown_running());
        assert_eq!(s.seconds_left(), s.notify_interval_secs());
        assert!(has_countdown_started(&second));

        // Still stationary: no second CountdownStarted.
        let third = s.record_fix(fix(10.0, 20.0, 3));
        assert!(!has_countdown_started(&third));
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn movement_stops_countdown_and_clears_stationary() {
        let mut s = scheduler();
        s.record_fix(fix(10.0, 20.0, 1));
        s.record_fix(fix(10.0, 20.0, 2));
        assert!(s.is_countdown_running());

        let events = s.record_fix(fix(10.1, 20.0, 3));
        assert!(!s.is_countdown_running());
        assert_eq!(s.seconds_left(), s.notify_interval_secs());
        assert_eq!(s.movement(), Movement::Moving);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::CountdownStopped { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::MovementResumed { .. })));
    }

    #[test]
    fn stop_is_detected_again_after_movement() {
        let mut s = scheduler();
        s.record_fix(fix(10.0, 20.0, 1));
        s.record_fix(fix(10.0, 20.0, 2));
        s.record_fix(fix(10.1, 20.0, 3));
        let events = s.record_fix(fix(10.1, 20.0, 4));
        assert_eq!(s.movement(), Movement::Stationary);
        assert!(has_countdown_started(&events));
    }

    #[test]
    fn denied_notification_permission_blocks_stationary_entry() {
        let mut s = scheduler();
        s.apply_notification_status(AuthorizationStatus(0));
        s.record_fix(fix(10.0, 20.0, 1));
        let events = s.record_fix(fix(10.0, 20.0, 2));
        assert_eq!(s.movement(), Movement::Moving);
        assert!(!s.is_countdown_running());
        assert!(!has_countdown_started(&events));
        // The sample is still recorded.
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn history_is_newest_first() {
        let mut s = scheduler();
        s.record_fix(fix(1.0, 1.0, 100));
        s.record_fix(fix(2.0, 2.0, 200));
        s.record_fix(fix(3.0, 3.0, 300));
        assert_eq!(s.history()[0].id, 300);
        assert_eq!(s.history()[2].id, 100);
    }

    #[test]
    fn countdown_fires_and_resets_in_same_tick() {
        let mut s = scheduler();
        s.set_notify_interval_secs(2);
        s.start_countdown();
        assert!(s.countdown_tick().is_none());
        let due = s.countdown_tick();
        assert!(matches!(due, Some(Event::NotificationDue { .. })));
        assert_eq!(s.seconds_left(), 2);
        // Repeats while still running.
        s.countdown_tick();
        assert!(s.countdown_tick().is_some());
    }

    #[test]
    fn zero_notify_interval_fires_on_first_tick() {
        let mut s = scheduler();
        s.set_notify_interval_secs(0);
        s.start_countdown();
        assert!(s.countdown_tick().is_some());
    }

    #[test]
    fn countdown_tick_is_noop_while_stopped() {
        let mut s = scheduler();
        s.set_notify_interval_secs(1);
        assert!(s.countdown_tick().is_none());
        assert_eq!(s.seconds_left(), 1);
    }

    #[test]
    fn location_grant_enables_fetching() {
        let mut s = scheduler();
        assert!(!s.is_fetching());
        s.apply_location_permission(true);
        assert!(s.is_fetching());
        assert!(!s.is_location_permission_denied());

        // Revocation gates future starts but does not flip the switch off.
        s.apply_location_permission(false);
        assert!(s.is_location_permission_denied());
        assert!(s.is_fetching());
    }

    #[test]
    fn start_stop_toggle_feature_flags() {
        let mut s = scheduler();
        s.start_fetching();
        assert!(s.is_fetching());
        assert!(s.is_fetch_enabled());
        s.stop_fetching();
        assert!(!s.is_fetching());
        assert!(!s.is_fetch_enabled());

        s.start_countdown();
        assert!(s.is_notify_enabled());
        s.stop_countdown();
        assert!(!s.is_notify_enabled());
        assert!(!s.is_countdown_running());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut s = scheduler();
        s.record_fix(fix(10.0, 20.0, 1));
        match s.snapshot() {
            Event::StateSnapshot {
                fetching,
                movement,
                history_len,
                seconds_left,
                notify_interval_secs,
                ..
            } => {
                assert!(!fetching);
                assert_eq!(movement, Movement::Moving);
                assert_eq!(history_len, 1);
                assert_eq!(seconds_left, notify_interval_secs);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
