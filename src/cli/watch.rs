// src/cli/watch.rs — Live view of a single widget

use std::sync::Arc;
use std::time::Duration;

use crate::infra::config::Config;
use crate::infra::errors::FitdashError;
use crate::polling::{FetchState, FetchStatus, PollingConfig, PollingSource};
use crate::widgets::catalog::{set_query_param, QueryPairs, WidgetKind, TIME_RANGES};
use crate::widgets::dashboard::build_fetcher;
use crate::widgets::http::AdminApiClient;
use crate::widgets::payloads::{
    DashboardStats, McpHealth, PendingOrders, RevenueAnalytics, SystemHealth,
};
use crate::widgets::WidgetPayload;

/// Flags of `fitdash watch`.
#[derive(Debug, Clone, Default)]
pub struct WatchArgs {
    pub interval_ms: Option<u64>,
    pub once: bool,
    pub time_range: Option<String>,
}

/// `fitdash watch <widget>`: poll one widget and print each state change
/// until Ctrl-C (or after the first result with `--once`).
pub async fn run_watch(config: &Config, widget: &str, args: WatchArgs) -> anyhow::Result<()> {
    let kind = WidgetKind::from_slug(widget).ok_or_else(|| FitdashError::UnknownWidget {
        name: widget.to_string(),
    })?;
    let query = watch_query(config, kind, args.time_range.as_deref())?;

    let client = Arc::new(AdminApiClient::new(&config.api, config.token())?);
    let mut polling = config.polling_for(kind);
    if let Some(ms) = args.interval_ms {
        polling.interval = Duration::from_millis(ms);
    }
    if args.once {
        polling.enabled = false;
        polling.immediate = true;
    }

    let opts = WatchOptions {
        polling,
        client,
        query,
        once: args.once,
    };
    match kind {
        WidgetKind::SystemHealth => watch_widget::<SystemHealth>(config, opts).await,
        WidgetKind::Revenue => watch_widget::<RevenueAnalytics>(config, opts).await,
        WidgetKind::McpHealth => watch_widget::<McpHealth>(config, opts).await,
        WidgetKind::PendingOrders => watch_widget::<PendingOrders>(config, opts).await,
        WidgetKind::DashboardStats => watch_widget::<DashboardStats>(config, opts).await,
    }
}

/// Config query for `kind`, with `--time-range` applied on top.
fn watch_query(
    config: &Config,
    kind: WidgetKind,
    time_range: Option<&str>,
) -> anyhow::Result<QueryPairs> {
    let mut query = config.query_for(kind);
    if let Some(range) = time_range {
        if kind != WidgetKind::Revenue {
            anyhow::bail!("--time-range only applies to the revenue widget");
        }
        if !TIME_RANGES.contains(&range) {
            anyhow::bail!("--time-range must be one of {}", TIME_RANGES.join(", "));
        }
        set_query_param(&mut query, "timeRange", range.to_string());
    }
    Ok(query)
}

struct WatchOptions {
    polling: PollingConfig,
    client: Arc<AdminApiClient>,
    query: QueryPairs,
    once: bool,
}

async fn watch_widget<P: WidgetPayload>(config: &Config, opts: WatchOptions) -> anyhow::Result<()> {
    let kind = P::KIND;
    let fetcher = build_fetcher::<P>(opts.client, &config.retry.to_policy(), opts.query);
    let source = PollingSource::new(kind.slug(), fetcher);
    let mut rx = source.subscribe();

    if opts.polling.enabled {
        eprintln!(
            "Watching {} every {}s  (Ctrl-C to exit)",
            kind.display_name(),
            opts.polling.interval.as_secs_f64()
        );
    }
    source.start(opts.polling)?;

    let mut failed = false;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                println!("{}", render_state(kind, &state));
                failed = state.status == FetchStatus::Error;
                if opts.once && matches!(state.status, FetchStatus::Success | FetchStatus::Error) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    source.stop();
    if opts.once && failed {
        anyhow::bail!("{} fetch failed", kind.display_name());
    }
    Ok(())
}

/// One line per state transition.
pub fn render_state<P: WidgetPayload>(kind: WidgetKind, state: &FetchState<P>) -> String {
    let updated = state
        .last_updated_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".into());

    match state.status {
        FetchStatus::Idle => format!("[{kind}] idle"),
        FetchStatus::Loading => match state.data {
            Some(ref d) => format!("[{kind}] refreshing... (last: {}, {updated})", d.summary()),
            None => format!("[{kind}] loading..."),
        },
        FetchStatus::Success => match state.data {
            Some(ref d) => format!("[{kind}] {} (updated {updated})", d.summary()),
            None => format!("[{kind}] no data"),
        },
        FetchStatus::Error => {
            let message = state
                .error
                .as_ref()
                .map(|e| e.message.as_str())
                .unwrap_or("unknown error");
            match state.data {
                Some(ref d) => format!("[{kind}] error: {message} (showing {updated}: {})", d.summary()),
                None => format!("[{kind}] error: {message}"),
            }
        }
    }
}
