// src/cli/snapshot.rs — One-shot fetch of every enabled widget

use crate::infra::config::Config;
use crate::polling::FetchStatus;
use crate::widgets::{Dashboard, WidgetStatus};

/// `fitdash snapshot`: start every enabled widget with the timer off, wait
/// for each first result, print and stop.
pub async fn run_snapshot(config: &Config, json: bool) -> anyhow::Result<()> {
    let dashboard = Dashboard::from_config(config)?;
    if dashboard.is_empty() {
        eprintln!("All widgets are disabled in config.");
        return Ok(());
    }

    dashboard.start_all()?;
    dashboard.set_auto_refresh(false);
    if !config.polling.immediate {
        dashboard.refresh_all();
    }

    tokio::select! {
        _ = dashboard.settled() => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted.");
        }
    }
    dashboard.stop_all();

    let statuses = dashboard.statuses();
    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        print!("{}", render_table(&statuses));
    }
    Ok(())
}

fn render_table(statuses: &[WidgetStatus]) -> String {
    let mut out = String::new();
    for s in statuses {
        let detail = match s.status {
            FetchStatus::Success => s.summary.clone().unwrap_or_default(),
            FetchStatus::Error => s
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "unknown error".into()),
            FetchStatus::Idle | FetchStatus::Loading => "no result".into(),
        };
        let mark = match s.status {
            FetchStatus::Success => "ok",
            FetchStatus::Error => "ERR",
            FetchStatus::Idle | FetchStatus::Loading => "--",
        };
        out.push_str(&format!("  {:<16} {:<4} {}\n", s.widget, mark, detail));
    }
    out
}
