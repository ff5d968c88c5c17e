use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "superbai-wear")]
#[command(about = "Show Superbai bookings synced from the paired phone")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the runtime config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Phone snapshot file used as the data layer
    #[arg(long, global = true, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the app and show the booking list
    Show {
        /// Skip the splash delay
        #[arg(long)]
        no_splash: bool,
    },
    /// Start the app, then simulate a resume and refresh again
    Refresh,
    /// Decode a bookings payload file and print its records
    Decode {
        /// File holding the `bookings_json` value
        file: PathBuf,
    },
}
