//! Tokio-backed driver for the scheduler.
//!
//! The core [`Scheduler`] is tick-based and owns no timers; this module
//! owns the two repeating timer tasks (location fetch loop, 1-second
//! notification countdown) as independently cancellable `JoinHandle`s, and
//! wires the platform traits to the events the scheduler returns.
//!
//! All spawning methods must be called from within a Tokio runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{CoreError, DatabaseError};
use crate::events::Event;
use crate::platform::{
    AppPhase, ChannelConfig, LocationProvider, NotificationRequest, NotificationService,
    Permission, PermissionService,
};
use crate::sample::LocationSample;
use crate::scheduler::Scheduler;
use crate::storage::{HistoryDb, Settings};

/// Owns the scheduler plus its two timer tasks and platform collaborators.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SchedulerRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    scheduler: Mutex<Scheduler>,
    settings: Mutex<Settings>,
    provider: Arc<dyn LocationProvider>,
    notifier: Arc<dyn NotificationService>,
    permissions: Arc<dyn PermissionService>,
    history: Option<Mutex<HistoryDb>>,
    /// Cached notification channel id, created lazily on first display.
    channel_id: Mutex<Option<String>>,
    fetch_task: Mutex<Option<JoinHandle<()>>>,
    countdown_task: Mutex<Option<JoinHandle<()>>>,
    lifecycle_task: Mutex<Option<JoinHandle<()>>>,
    events_tx: UnboundedSender<Event>,
    events_rx: Mutex<Option<UnboundedReceiver<Event>>>,
}

impl SchedulerRuntime {
    /// Build a runtime from platform collaborators and persisted state.
    /// History is loaded from the database when one is given (load-on-init).
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        notifier: Arc<dyn NotificationService>,
        permissions: Arc<dyn PermissionService>,
        settings: Settings,
        history: Option<HistoryDb>,
    ) -> Result<Self, CoreError> {
        let stored = match &history {
            Some(db) => db.list()?,
            None => Vec::new(),
        };
        let scheduler = Scheduler::new(&settings, stored);
        let (events_tx, events_rx) = unbounded_channel();
        Ok(Self {
            inner: Arc::new(RuntimeInner {
                scheduler: Mutex::new(scheduler),
                settings: Mutex::new(settings),
                provider,
                notifier,
                permissions,
                history: history.map(Mutex::new),
                channel_id: Mutex::new(None),
                fetch_task: Mutex::new(None),
                countdown_task: Mutex::new(None),
                lifecycle_task: Mutex::new(None),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
            }),
        })
    }

    /// Take the event stream. Yields every event the scheduler produces;
    /// can be taken once.
    pub fn events(&self) -> Option<UnboundedReceiver<Event>> {
        self.inner.events_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// Full state snapshot.
    pub fn snapshot(&self) -> Event {
        self.inner.lock_scheduler().snapshot()
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.lock_scheduler().is_fetching()
    }

    pub fn history(&self) -> Vec<LocationSample> {
        self.inner.lock_scheduler().history().to_vec()
    }

    // ── Permission reconciliation ────────────────────────────────────

    /// Prompt for both permissions (mount-time flow): location prompt,
    /// then best-effort notification prompt.
    pub fn prompt_permissions(&self) {
        let granted = self.inner.permissions.request_location() == Permission::Granted;
        RuntimeInner::apply_permissions(&self.inner, granted);
    }

    /// Re-derive permission flags (foreground flow): query location without
    /// prompting, re-request notification status. Idempotent; never stops a
    /// running loop on revocation, only gates future starts.
    pub fn reconcile_permissions(&self) {
        let granted = self.inner.permissions.check_location() == Permission::Granted;
        RuntimeInner::apply_permissions(&self.inner, granted);
    }

    // ── Fetch loop ───────────────────────────────────────────────────

    /// Enable the fetch loop: cancel any existing fetch timer and install a
    /// new one at the configured interval. Restarting replaces the timer,
    /// it never stacks.
    pub fn start_fetching(&self) {
        let event = {
            let mut scheduler = self.inner.lock_scheduler();
            scheduler.start_fetching()
        };
        self.inner.persist_toggles();
        RuntimeInner::apply_events(&self.inner, vec![event]);
        RuntimeInner::spawn_fetch_task(&self.inner);
    }

    /// Disable the fetch loop and cancel its timer. No other state changes.
    pub fn stop_fetching(&self) {
        let event = self.inner.lock_scheduler().stop_fetching();
        self.inner.persist_toggles();
        RuntimeInner::abort_task(&self.inner.fetch_task);
        RuntimeInner::apply_events(&self.inner, vec![event]);
    }

    // ── Notification countdown ───────────────────────────────────────

    /// Enable the notification feature and start the 1-second countdown
    /// timer, replacing any prior one.
    pub fn start_countdown(&self) {
        let event = self.inner.lock_scheduler().start_countdown();
        // apply_events persists the toggle and spawns the countdown task
        // off the CountdownStarted event, same as when the fetch loop
        // detects a stop.
        RuntimeInner::apply_events(&self.inner, vec![event]);
    }

    /// Disable the notification feature and cancel the countdown timer.
    pub fn stop_countdown(&self) {
        let event = self.inner.lock_scheduler().stop_countdown();
        RuntimeInner::apply_events(&self.inner, vec![event]);
    }

    // ── Setters (save-on-write) ──────────────────────────────────────

    /// Master switch for the fetch loop. `true` installs the fetch timer
    /// (replacing any existing one, never stacking), `false` cancels it.
    pub fn set_fetching(&self, fetching: bool) {
        self.inner.lock_scheduler().set_fetching(fetching);
        if fetching {
            RuntimeInner::spawn_fetch_task(&self.inner);
        } else {
            RuntimeInner::abort_task(&self.inner.fetch_task);
        }
    }

    /// Change the fetch period. If the loop is running, its timer is
    /// cancelled and recreated at the new period.
    pub fn set_fetch_interval_ms(&self, interval_ms: u64) {
        let running = {
            let mut scheduler = self.inner.lock_scheduler();
            scheduler.set_fetch_interval_ms(interval_ms);
            scheduler.is_fetching()
        };
        if let Ok(mut settings) = self.inner.settings.lock() {
            settings.fetch_interval_ms = interval_ms;
            if let Err(e) = settings.save() {
                tracing::warn!(error = %e, "failed to persist settings");
            }
        }
        let has_task = self
            .inner
            .fetch_task
            .lock()
            .map(|t| t.is_some())
            .unwrap_or(false);
        if running && has_task {
            RuntimeInner::spawn_fetch_task(&self.inner);
        }
    }

    /// Session-scoped; also resets `seconds_left` to the new interval.
    pub fn set_notify_interval_secs(&self, interval_secs: u32) {
        self.inner
            .lock_scheduler()
            .set_notify_interval_secs(interval_secs);
    }

    /// Replace the whole history (newest first), persisting the new list.
    pub fn set_history(&self, history: Vec<LocationSample>) {
        if let Some(db) = &self.inner.history {
            if let Ok(db) = db.lock() {
                if let Err(e) = db.replace_all(&history) {
                    tracing::warn!(error = %e, "failed to persist history");
                }
            }
        }
        self.inner.lock_scheduler().set_history(history);
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Subscribe to app lifecycle phases; permissions are re-reconciled on
    /// every transition to `Active`. The subscription task is cancelled on
    /// shutdown.
    pub fn watch_lifecycle(&self, mut rx: watch::Receiver<AppPhase>) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let phase = *rx.borrow();
                if phase != AppPhase::Active {
                    continue;
                }
                let Some(inner) = weak.upgrade() else { break };
                let granted = inner.permissions.check_location() == Permission::Granted;
                RuntimeInner::apply_permissions(&inner, granted);
            }
        });
        RuntimeInner::replace_task(&self.inner.lifecycle_task, handle);
    }

    /// Cancel every timer and subscription task.
    pub fn shutdown(&self) {
        RuntimeInner::abort_task(&self.inner.fetch_task);
        RuntimeInner::abort_task(&self.inner.countdown_task);
        RuntimeInner::abort_task(&self.inner.lifecycle_task);
    }
}

impl RuntimeInner {
    fn lock_scheduler(&self) -> std::sync::MutexGuard<'_, Scheduler> {
        // The lock is only held for non-await, non-panicking sections.
        self.scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: &Event) {
        let _ = self.events_tx.send(event.clone());
    }

    /// Persist the feature toggles (save-on-write).
    fn persist_toggles(&self) {
        let (fetch_enabled, notify_enabled) = {
            let scheduler = self.lock_scheduler();
            (scheduler.is_fetch_enabled(), scheduler.is_notify_enabled())
        };
        if let Ok(mut settings) = self.settings.lock() {
            settings.fetch_enabled = fetch_enabled;
            settings.notify_enabled = notify_enabled;
            if let Err(e) = settings.save() {
                tracing::warn!(error = %e, "failed to persist settings");
            }
        }
    }

    fn apply_permissions(inner: &Arc<Self>, location_granted: bool) {
        let notification_status = inner.permissions.request_notification();
        {
            let mut scheduler = inner.lock_scheduler();
            scheduler.apply_location_permission(location_granted);
            scheduler.apply_notification_status(notification_status);
        }
        inner.emit(&Event::PermissionsReconciled {
            location_granted,
            notification_granted: notification_status.is_authorized(),
            at: chrono::Utc::now(),
        });
        if location_granted {
            // Re-running reconciliation must not interrupt a loop that is
            // already ticking.
            let already_running = inner
                .fetch_task
                .lock()
                .map(|t| t.is_some())
                .unwrap_or(false);
            if !already_running {
                Self::spawn_fetch_task(inner);
            }
        }
    }

    /// React to scheduler events: persist samples, manage the countdown
    /// task, display notifications, and forward everything to subscribers.
    fn apply_events(inner: &Arc<Self>, events: Vec<Event>) {
        for event in events {
            inner.emit(&event);
            match &event {
                Event::SampleRecorded { sample, .. } => {
                    if let Err(e) = inner.persist_sample(sample) {
                        tracing::warn!(error = %e, "failed to persist sample");
                    }
                }
                Event::CountdownStarted { .. } => {
                    // The fetch-tick path can flip the notify toggle, so
                    // the persisted settings are re-synced here rather
                    // than only in the public commands.
                    inner.persist_toggles();
                    Self::spawn_countdown_task(inner);
                }
                Event::CountdownStopped { .. } => {
                    inner.persist_toggles();
                    Self::abort_task(&inner.countdown_task);
                }
                Event::NotificationDue { title, body, .. } => {
                    inner.display_notification(title, body);
                }
                _ => {}
            }
        }
    }

    fn persist_sample(&self, sample: &LocationSample) -> Result<(), DatabaseError> {
        if let Some(db) = &self.history {
            if let Ok(db) = db.lock() {
                db.insert(sample)?;
            }
        }
        Ok(())
    }

    /// Best-effort display: channel creation and display errors are logged
    /// and swallowed; there is no user-visible error surface.
    fn display_notification(&self, title: &str, body: &str) {
        let channel_id = {
            let cached = self.channel_id.lock().ok().and_then(|c| c.clone());
            match cached {
                Some(id) => id,
                None => match self.notifier.create_channel(&ChannelConfig::default()) {
                    Ok(id) => {
                        if let Ok(mut cache) = self.channel_id.lock() {
                            *cache = Some(id.clone());
                        }
                        id
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "notification channel unavailable");
                        return;
                    }
                },
            }
        };
        let request = NotificationRequest {
            title: title.to_string(),
            body: body.to_string(),
            channel_id,
        };
        if let Err(e) = self.notifier.display(&request) {
            tracing::warn!(error = %e, "failed to display notification");
        }
    }

    /// Install the repeating fetch timer, replacing any existing one.
    fn spawn_fetch_task(inner: &Arc<Self>) {
        let (interval_ms, high_accuracy, timeout_ms) = {
            let scheduler = inner.lock_scheduler();
            let settings = match inner.settings.lock() {
                Ok(s) => s.clone(),
                Err(_) => Settings::default(),
            };
            (
                scheduler.fetch_interval_ms(),
                settings.high_accuracy,
                settings.fetch_timeout_ms,
            )
        };
        // tokio intervals reject a zero period; a 1ms floor keeps the
        // documented fast-loop behavior for a zero interval.
        let period = Duration::from_millis(interval_ms.max(1));
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                Self::fetch_tick(&inner, high_accuracy, timeout_ms);
            }
        });
        Self::replace_task(&inner.fetch_task, handle);
        tracing::info!(interval_ms, "fetch loop started");
    }

    /// One fetch-loop tick. A provider failure aborts only this tick; the
    /// timer keeps ticking and no state changes.
    fn fetch_tick(inner: &Arc<Self>, high_accuracy: bool, timeout_ms: u64) {
        let fix = match inner.provider.current_position(high_accuracy, timeout_ms) {
            Ok(fix) => fix,
            Err(e) => {
                tracing::warn!(error = %e, "location fetch failed, skipping tick");
                return;
            }
        };
        let events = inner.lock_scheduler().record_fix(fix);
        Self::apply_events(inner, events);
    }

    /// Install the 1-second countdown timer, replacing any existing one.
    fn spawn_countdown_task(inner: &Arc<Self>) {
        let period = Duration::from_secs(1);
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let due = inner.lock_scheduler().countdown_tick();
                if let Some(event) = due {
                    Self::apply_events(&inner, vec![event]);
                }
            }
        });
        Self::replace_task(&inner.countdown_task, handle);
        tracing::debug!("countdown started");
    }

    fn replace_task(slot: &Mutex<Option<JoinHandle<()>>>, handle: JoinHandle<()>) {
        if let Ok(mut slot) = slot.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }

    /// "Cancel" means aborting and clearing the stored handle.
    fn abort_task(slot: &Mutex<Option<JoinHandle<()>>>) {
        if let Ok(mut slot) = slot.lock() {
            if let Some(old) = slot.take() {
                old.abort();
            }
        }
    }
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        for slot in [&self.fetch_task, &self.countdown_task, &self.lifecycle_task] {
            if let Ok(mut slot) = slot.lock() {
                if let Some(handle) = slot.take() {
                    handle.abort();
                }
            }
        }
    }
}
