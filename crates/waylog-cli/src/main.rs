use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "waylog-cli", version, about = "Waylog CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Location tracking control
    Track {
        #[command(subcommand)]
        action: commands::track::TrackAction,
    },
    /// Settings management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Location history
    Locations {
        #[command(subcommand)]
        action: commands::locations::LocationsAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Track { action } => commands::track::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Locations { action } => commands::locations::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
