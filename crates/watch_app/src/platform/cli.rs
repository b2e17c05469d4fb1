use std::path::PathBuf;

use clap::Parser;

use super::logging::LogDestination;

/// Submit scrape jobs and follow their progress until they finish.
#[derive(Debug, Parser)]
#[command(name = "scrape-watch", version, about)]
pub struct Cli {
    /// RON configuration file; defaults apply when it does not exist.
    #[arg(long, default_value = "scrape-watch.ron")]
    pub config: PathBuf,

    /// Push channel address, e.g. ws://localhost:8001/ws.
    #[arg(long = "ws")]
    pub ws_url: Option<String>,

    /// HTTP API base, e.g. http://localhost:8001.
    #[arg(long = "api")]
    pub api_base: Option<String>,

    #[arg(long)]
    pub max_threads: Option<u32>,

    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    /// URLs to scrape, one job each, in order.
    #[arg(required = true)]
    pub urls: Vec<String>,
}
