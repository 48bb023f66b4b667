use clap::Subcommand;
use waylog_core::storage::HistoryDb;

#[derive(Subcommand)]
pub enum LocationsAction {
    /// Print recorded locations, newest first
    List {
        #[arg(long)]
        json: bool,
        /// Only the newest N samples
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Delete the whole location history
    Clear,
}

pub fn run(action: LocationsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = HistoryDb::open()?;
    match action {
        LocationsAction::List { json, limit } => {
            let samples = db.list_limit(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&samples)?);
            } else {
                for sample in &samples {
                    println!("{}  {:.6}, {:.6}", sample.datetime, sample.lat, sample.long);
                }
                println!("{} location(s)", samples.len());
            }
            Ok(())
        }
        LocationsAction::Clear => {
            db.clear()?;
            println!("location history cleared");
            Ok(())
        }
    }
}
