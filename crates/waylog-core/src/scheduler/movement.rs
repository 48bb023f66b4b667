//! Movement state machine.

use serde::{Deserialize, Serialize};

/// Explicit two-state machine replacing the one-bit not-moving latch.
///
/// Entry to `Stationary` starts the notification countdown; exit from
/// `Stationary` stops it and resets the counter. Unlike the latch it
/// replaces, the state is cleared as soon as movement is detected, so a
/// later stop is detected again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Moving,
    Stationary,
}

impl Movement {
    pub fn is_stationary(self) -> bool {
        self == Movement::Stationary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stationary_is_stationary() {
        assert!(Movement::Stationary.is_stationary());
        assert!(!Movement::Moving.is_stationary());
    }
}
