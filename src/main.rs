// src/main.rs — fitdash entry point

use clap::Parser;

use fitdash::cli::{Cli, Commands};
use fitdash::infra::config::Config;
use fitdash::infra::logger;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG / FITDASH_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Some(Commands::Widgets) => fitdash::cli::widgets::list_widgets(&config),
        Some(Commands::Config) => fitdash::cli::widgets::show_config(&config),
        Some(Commands::Watch {
            widget,
            interval_ms,
            once,
            time_range,
        }) => {
            let opts = fitdash::cli::watch::WatchArgs {
                interval_ms,
                once,
                time_range,
            };
            fitdash::cli::watch::run_watch(&config, &widget, opts).await
        }
        Some(Commands::Snapshot { json }) => fitdash::cli::snapshot::run_snapshot(&config, json).await,
        // No subcommand: one-shot snapshot of every enabled widget
        None => fitdash::cli::snapshot::run_snapshot(&config, false).await,
    }
}
