//! Deterministic simulation doubles for the platform traits.
//!
//! These stand in for the real device bindings during CLI demo runs and in
//! tests: a seed-based simulated location provider, a permission service
//! with fixed answers, and a notifier that logs instead of displaying.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::{NotificationError, ProviderError};
use crate::platform::{
    AuthorizationStatus, ChannelConfig, LocationProvider, NotificationRequest,
    NotificationService, Permission, PermissionService, PositionFix,
};

/// Deterministic random number generator (xorshift64*).
#[derive(Debug, Clone, Copy)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        // A zero state would lock xorshift at zero.
        Self {
            state: seed.max(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Random value in [-1.0, 1.0).
    fn next_signed_unit(&mut self) -> f64 {
        (self.next_u64() as f64 / u64::MAX as f64) * 2.0 - 1.0
    }
}

enum SimMode {
    /// Replay a fixed script; once exhausted, repeat the last fix forever.
    Script {
        remaining: VecDeque<PositionFix>,
        last: Option<PositionFix>,
    },
    /// Seeded random walk that stops moving after a fixed number of steps.
    Walk {
        rng: DeterministicRng,
        position: (f64, f64),
        moves_left: u32,
    },
}

struct SimState {
    mode: SimMode,
    timeout_next: bool,
}

/// Scripted or seeded location provider.
///
/// Every successful call stamps the fix with the current wall-clock time so
/// sample ids stay distinct.
pub struct SimulatedLocationProvider {
    state: Mutex<SimState>,
}

impl SimulatedLocationProvider {
    /// Replay the given fixes in order; after the script runs out the
    /// provider keeps returning the last fix (the user "stopped").
    pub fn scripted(fixes: Vec<PositionFix>) -> Self {
        Self {
            state: Mutex::new(SimState {
                mode: SimMode::Script {
                    remaining: fixes.into(),
                    last: None,
                },
                timeout_next: false,
            }),
        }
    }

    /// Seeded random walk starting at `start`, jittering each fix by up to
    /// ~0.001 degrees; after `moves` steps the walker stands still.
    pub fn walk(seed: u64, start: (f64, f64), moves: u32) -> Self {
        Self {
            state: Mutex::new(SimState {
                mode: SimMode::Walk {
                    rng: DeterministicRng::new(seed),
                    position: start,
                    moves_left: moves,
                },
                timeout_next: false,
            }),
        }
    }

    /// Make the next `current_position` call fail with a timeout.
    pub fn timeout_next(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.timeout_next = true;
        }
    }
}

impl LocationProvider for SimulatedLocationProvider {
    fn current_position(
        &self,
        _high_accuracy: bool,
        timeout_ms: u64,
    ) -> Result<PositionFix, ProviderError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProviderError::Unavailable("simulation state poisoned".into()))?;

        if state.timeout_next {
            state.timeout_next = false;
            return Err(ProviderError::Timeout { timeout_ms });
        }

        let now = Utc::now().timestamp_millis();
        let (lat, long) = match &mut state.mode {
            SimMode::Script { remaining, last } => match remaining.pop_front() {
                Some(fix) => {
                    *last = Some(fix);
                    (fix.lat, fix.long)
                }
                None => {
                    let fix = last
                        .ok_or_else(|| ProviderError::Unavailable("empty fix script".into()))?;
                    (fix.lat, fix.long)
                }
            },
            SimMode::Walk {
                rng,
                position,
                moves_left,
            } => {
                if *moves_left > 0 {
                    *moves_left -= 1;
                    position.0 += rng.next_signed_unit() * 0.001;
                    position.1 += rng.next_signed_unit() * 0.001;
                }
                *position
            }
        };

        Ok(PositionFix {
            lat,
            long,
            time: now,
        })
    }
}

/// Permission service with fixed answers.
pub struct StaticPermissions {
    pub location: Permission,
    pub notification: AuthorizationStatus,
}

impl StaticPermissions {
    pub fn allow_all() -> Self {
        Self {
            location: Permission::Granted,
            notification: AuthorizationStatus::AUTHORIZED,
        }
    }

    pub fn deny_all() -> Self {
        Self {
            location: Permission::Denied,
            notification: AuthorizationStatus(0),
        }
    }
}

impl PermissionService for StaticPermissions {
    fn check_location(&self) -> Permission {
        self.location
    }

    fn request_location(&self) -> Permission {
        self.location
    }

    fn request_notification(&self) -> AuthorizationStatus {
        self.notification
    }
}

/// Notification service that logs instead of displaying, and counts fires
/// so tests can assert on delivery.
#[derive(Default)]
pub struct LogNotifier {
    fired: AtomicUsize,
    last: Mutex<Option<NotificationRequest>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications displayed so far.
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }

    /// The most recently displayed notification, if any.
    pub fn last(&self) -> Option<NotificationRequest> {
        self.last.lock().ok().and_then(|g| g.clone())
    }
}

impl NotificationService for LogNotifier {
    fn create_channel(&self, config: &ChannelConfig) -> Result<String, NotificationError> {
        tracing::debug!(channel = %config.id, "created notification channel");
        Ok(config.id.clone())
    }

    fn display(&self, request: &NotificationRequest) -> Result<(), NotificationError> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        tracing::info!(title = %request.title, body = %request.body, "notification");
        if let Ok(mut last) = self.last.lock() {
            *last = Some(request.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_provider_repeats_last_fix() {
        let provider = SimulatedLocationProvider::scripted(vec![
            PositionFix {
                lat: 1.0,
                long: 2.0,
                time: 0,
            },
            PositionFix {
                lat: 3.0,
                long: 4.0,
                time: 0,
            },
        ]);
        let a = provider.current_position(true, 1000).unwrap();
        let b = provider.current_position(true, 1000).unwrap();
        let c = provider.current_position(true, 1000).unwrap();
        let d = provider.current_position(true, 1000).unwrap();
        assert_eq!((a.lat, a.long), (1.0, 2.0));
        assert_eq!((b.lat, b.long), (3.0, 4.0));
        assert_eq!((c.lat, c.long), (3.0, 4.0));
        assert_eq!((d.lat, d.long), (3.0, 4.0));
    }

    #[test]
    fn empty_script_is_unavailable() {
        let provider = SimulatedLocationProvider::scripted(vec![]);
        assert!(matches!(
            provider.current_position(true, 1000),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn timeout_next_fails_exactly_once() {
        let provider = SimulatedLocationProvider::walk(42, (10.0, 20.0), 5);
        provider.timeout_next();
        assert!(matches!(
            provider.current_position(true, 15_000),
            Err(ProviderError::Timeout { timeout_ms: 15_000 })
        ));
        assert!(provider.current_position(true, 15_000).is_ok());
    }

    #[test]
    fn walk_stands_still_after_moves_run_out() {
        let provider = SimulatedLocationProvider::walk(7, (10.0, 20.0), 2);
        let a = provider.current_position(true, 1000).unwrap();
        let b = provider.current_position(true, 1000).unwrap();
        let c = provider.current_position(true, 1000).unwrap();
        let d = provider.current_position(true, 1000).unwrap();
        assert_ne!((a.lat, a.long), (b.lat, b.long));
        assert_eq!((c.lat, c.long), (b.lat, b.long));
        assert_eq!((d.lat, d.long), (c.lat, c.long));
    }

    #[test]
    fn walk_is_deterministic_per_seed() {
        let p1 = SimulatedLocationProvider::walk(99, (0.0, 0.0), 3);
        let p2 = SimulatedLocationProvider::walk(99, (0.0, 0.0), 3);
        for _ in 0..4 {
            let a = p1.current_position(true, 1000).unwrap();
            let b = p2.current_position(true, 1000).unwrap();
            assert_eq!((a.lat, a.long), (b.lat, b.long));
        }
    }

    #[test]
    fn log_notifier_counts_and_keeps_last() {
        let notifier = LogNotifier::new();
        assert_eq!(notifier.fired(), 0);
        notifier
            .display(&NotificationRequest {
                title: "t".into(),
                body: "b".into(),
                channel_id: "default".into(),
            })
            .unwrap();
        assert_eq!(notifier.fired(), 1);
        assert_eq!(notifier.last().unwrap().title, "t");
    }
}
