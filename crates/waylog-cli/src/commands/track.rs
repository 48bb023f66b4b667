use std::sync::Arc;

use clap::Subcommand;
use tokio::sync::watch;
use waylog_core::platform::{
    AppPhase, LogNotifier, NotificationService, SimulatedLocationProvider, StaticPermissions,
};
use waylog_core::storage::{HistoryDb, Settings};
use waylog_core::{Event, Scheduler, SchedulerRuntime};

#[derive(Subcommand)]
pub enum TrackAction {
    /// Drive the scheduler against the simulated location provider
    Run {
        /// Stop after this many recorded fixes
        #[arg(long, default_value = "10")]
        fixes: u32,
        /// Fetch period override in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Seconds between stationary notifications
        #[arg(long, default_value = "10")]
        notify_secs: u32,
        /// Simulated walker stands still after this many moves
        #[arg(long, default_value = "5")]
        stop_after: u32,
        /// Simulation seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// Print current scheduler state as JSON
    Status,
    /// Enable the fetch loop feature toggle
    Enable,
    /// Disable the fetch loop feature toggle
    Disable,
}

pub fn run(action: TrackAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TrackAction::Run {
            fixes,
            interval_ms,
            notify_secs,
            stop_after,
            seed,
        } => run_simulation(fixes, interval_ms, notify_secs, stop_after, seed),
        TrackAction::Status => status(),
        TrackAction::Enable => set_fetch_enabled(true),
        TrackAction::Disable => set_fetch_enabled(false),
    }
}

fn run_simulation(
    fixes: u32,
    interval_ms: Option<u64>,
    notify_secs: u32,
    stop_after: u32,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::load_or_default();
    if let Some(ms) = interval_ms {
        settings.fetch_interval_ms = ms;
    }
    let history = HistoryDb::open()?;
    let provider = SimulatedLocationProvider::walk(seed, (48.8584, 2.2945), stop_after);
    let notifier = Arc::new(LogNotifier::new());

    let runtime = SchedulerRuntime::new(
        Arc::new(provider),
        Arc::clone(&notifier) as Arc<dyn NotificationService>,
        Arc::new(StaticPermissions::allow_all()),
        settings,
        Some(history),
    )?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(async {
        let mut events = runtime.events().expect("event stream already taken");
        runtime.set_notify_interval_secs(notify_secs);
        runtime.prompt_permissions();

        let (_phase_tx, phase_rx) = watch::channel(AppPhase::Active);
        runtime.watch_lifecycle(phase_rx);

        let mut recorded = 0;
        while recorded < fixes {
            let Some(event) = events.recv().await else {
                break;
            };
            if let Event::SampleRecorded { .. } = event {
                recorded += 1;
            }
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        runtime.shutdown();
    });
    println!("notifications fired: {}", notifier.fired());
    Ok(())
}

fn status() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load_or_default();
    let history = HistoryDb::open()?;
    let scheduler = Scheduler::new(&settings, history.list()?);
    println!("{}", serde_json::to_string_pretty(&scheduler.snapshot())?);
    Ok(())
}

fn set_fetch_enabled(enabled: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::load_or_default();
    settings.set("fetch_enabled", if enabled { "true" } else { "false" })?;
    println!(
        "fetch loop {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
