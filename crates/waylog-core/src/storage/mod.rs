mod config;
pub mod history_db;

pub use config::Settings;
pub use history_db::HistoryDb;

use std::path::PathBuf;

/// Returns `~/.config/waylog[-dev]/` based on WAYLOG_ENV.
///
/// Set WAYLOG_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WAYLOG_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("waylog-dev")
    } else {
        base_dir.join("waylog")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
