// src/cli/mod.rs — CLI definition (clap derive)

pub mod snapshot;
pub mod watch;
pub mod widgets;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fitdash", about = "Polling admin dashboard widgets", version)]
pub struct Cli {
    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the available widgets and their effective schedule
    Widgets,
    /// Poll one widget and print every state change (Ctrl-C to stop)
    Watch {
        /// Widget slug, e.g. system_health or pending-orders
        widget: String,
        /// Override the refresh interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Fetch once, print the result and exit
        #[arg(long)]
        once: bool,
        /// Revenue time range (24h, 7d, 30d, 90d, 1y)
        #[arg(long)]
        time_range: Option<String>,
    },
    /// Fetch every enabled widget once and print a summary
    Snapshot {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config,
}
