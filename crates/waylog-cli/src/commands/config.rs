use clap::Subcommand;
use waylog_core::storage::Settings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a single settings value
    Get {
        /// Settings key, e.g. fetch_interval_ms
        key: String,
    },
    /// Set a settings value and persist it
    Set { key: String, value: String },
    /// Print all settings
    List {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let settings = Settings::load_or_default();
            match settings.get(&key) {
                Some(value) => {
                    println!("{value}");
                    Ok(())
                }
                None => Err(format!("unknown settings key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load_or_default();
            settings.set(&key, &value)?;
            println!("{key} = {value}");
            Ok(())
        }
        ConfigAction::List { json } => {
            let settings = Settings::load_or_default();
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                for (key, value) in settings.entries() {
                    println!("{key} = {value}");
                }
            }
            Ok(())
        }
    }
}
