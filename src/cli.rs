use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "proctime", version, about = "Immigration processing times from the terminal")]
pub struct Cli {
    /// Config file (defaults to ~/.proctime/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the base URL documents are fetched from
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Read documents from a local directory instead of the network
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub as_of: Option<NaiveDate>,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List countries in the directory
    Countries,
    /// Current processing times for one country (code or name)
    Show { country: String },
    /// Weekly history and trend for one country
    History {
        country: String,
        /// Only this category
        #[arg(long)]
        category: Option<String>,
        /// Most recent weeks to load (defaults to maxWeeks from config)
        #[arg(long)]
        weeks: Option<usize>,
        /// Normalize every value to months
        #[arg(long)]
        months: bool,
    },
    /// Snapshot files that would be loaded
    Weeks,
    /// Latest in-Canada services processing times
    InCanada,
}
