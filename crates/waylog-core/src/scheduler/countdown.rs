//! Seconds-remaining countdown for stationary notifications.

use serde::{Deserialize, Serialize};

/// Countdown driven by a fixed 1-second tick.
///
/// Holds the `seconds_left` counter and the running flag; the runtime owns
/// the actual timer task. Invariant: `seconds_left` stays within
/// `[0, interval_secs]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Countdown {
    interval_secs: u32,
    seconds_left: u32,
    running: bool,
}

impl Countdown {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_secs,
            seconds_left: interval_secs,
            running: false,
        }
    }

    pub fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start ticking. Does not touch `seconds_left`; the counter is reset
    /// by [`Countdown::set_interval`] and on every movement tick.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop ticking. Returns whether the countdown had been running.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Reset `seconds_left` to the full interval.
    pub fn reset(&mut self) {
        self.seconds_left = self.interval_secs;
    }

    /// Change the interval. Also resets `seconds_left`, matching the
    /// behavior of the interval setter in the UI.
    pub fn set_interval(&mut self, interval_secs: u32) {
        self.interval_secs = interval_secs;
        self.seconds_left = interval_secs;
    }

    /// One 1-second tick. Returns `true` when the counter reaches exactly
    /// zero this tick -- the caller displays a notification -- and resets
    /// the counter to the full interval in the same tick, so the reminder
    /// repeats for as long as the countdown keeps running.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.seconds_left = self.seconds_left.saturating_sub(1);
        if self.seconds_left == 0 {
            self.seconds_left = self.interval_secs;
            true
        } else {
            false
        }
    }
}
