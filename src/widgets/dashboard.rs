// src/widgets/dashboard.rs — One isolated polling source per enabled widget

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;

use super::catalog::{QueryPairs, WidgetKind};
use super::decode::WidgetPayload;
use super::http::{AdminApiClient, HttpFetcher};
use super::payloads::{DashboardStats, McpHealth, PendingOrders, RevenueAnalytics, SystemHealth};
use crate::infra::config::Config;
use crate::infra::errors::FitdashError;
use crate::polling::retry::{RetryFetcher, RetryPolicy};
use crate::polling::{ErrorInfo, FetchStatus, Fetcher, PollingConfig, PollingSource};

/// Point-in-time view of one widget, independent of its payload type.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetStatus {
    pub widget: &'static str,
    pub status: FetchStatus,
    pub summary: Option<String>,
    pub error: Option<ErrorInfo>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub fetches: u64,
}

/// Type-erased handle over a `PollingSource<P>`.
pub trait PolledWidget: Send + Sync {
    fn kind(&self) -> WidgetKind;
    fn start(&self, config: PollingConfig) -> Result<(), FitdashError>;
    fn stop(&self);
    fn refresh_now(&self);
    fn set_auto_refresh(&self, enabled: bool);
    fn status(&self) -> WidgetStatus;
    /// Resolves once no fetch is loading. A widget that has not dispatched
    /// anything yet (not started, or started with `immediate = false`) is
    /// already settled.
    fn settled(&self) -> BoxFuture<'static, ()>;
}

impl<P: WidgetPayload> PolledWidget for PollingSource<P> {
    fn kind(&self) -> WidgetKind {
        P::KIND
    }

    fn start(&self, config: PollingConfig) -> Result<(), FitdashError> {
        PollingSource::start(self, config)
    }

    fn stop(&self) {
        PollingSource::stop(self)
    }

    fn refresh_now(&self) {
        PollingSource::refresh_now(self)
    }

    fn set_auto_refresh(&self, enabled: bool) {
        PollingSource::set_auto_refresh(self, enabled)
    }

    fn status(&self) -> WidgetStatus {
        let state = self.snapshot();
        WidgetStatus {
            widget: P::KIND.slug(),
            status: state.status,
            summary: state.data.as_ref().map(|d| d.summary()),
            error: state.error,
            last_updated_at: state.last_updated_at,
            fetches: self.fetch_count(),
        }
    }

    fn settled(&self) -> BoxFuture<'static, ()> {
        let mut rx = self.subscribe();
        async move {
            let _ = rx
                .wait_for(|s| s.status != FetchStatus::Loading)
                .await;
        }
        .boxed()
    }
}

/// HTTP fetcher for `P`, wrapped in a retry layer when the policy allows retries.
pub fn build_fetcher<P: WidgetPayload>(
    client: Arc<AdminApiClient>,
    retry: &RetryPolicy,
    query: QueryPairs,
) -> Arc<dyn Fetcher<P>> {
    let http: Arc<dyn Fetcher<P>> = Arc::new(HttpFetcher::<P>::new(client, query));
    if retry.is_enabled() {
        Arc::new(RetryFetcher::new(http, retry.clone()).with_label(P::KIND.slug()))
    } else {
        http
    }
}

fn http_widget<P: WidgetPayload>(
    client: &Arc<AdminApiClient>,
    retry: &RetryPolicy,
    query: QueryPairs,
) -> Box<dyn PolledWidget> {
    let fetcher = build_fetcher::<P>(Arc::clone(client), retry, query);
    Box::new(PollingSource::new(P::KIND.slug(), fetcher))
}

/// Build the HTTP-backed widget for `kind`.
pub fn widget_for(
    kind: WidgetKind,
    client: &Arc<AdminApiClient>,
    retry: &RetryPolicy,
    query: QueryPairs,
) -> Box<dyn PolledWidget> {
    match kind {
        WidgetKind::SystemHealth => http_widget::<SystemHealth>(client, retry, query),
        WidgetKind::Revenue => http_widget::<RevenueAnalytics>(client, retry, query),
        WidgetKind::McpHealth => http_widget::<McpHealth>(client, retry, query),
        WidgetKind::PendingOrders => http_widget::<PendingOrders>(client, retry, query),
        WidgetKind::DashboardStats => http_widget::<DashboardStats>(client, retry, query),
    }
}

struct Slot {
    widget: Box<dyn PolledWidget>,
    config: PollingConfig,
}

/// The set of widgets on screen. Each has its own source and schedule.
#[derive(Default)]
pub struct Dashboard {
    slots: Vec<Slot>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// One HTTP-backed widget per enabled `[widgets]` entry (all by default).
    pub fn from_config(config: &Config) -> Result<Self, FitdashError> {
        let client = Arc::new(AdminApiClient::new(&config.api, config.token())?);
        let retry = config.retry.to_policy();

        let mut dashboard = Self::new();
        for kind in WidgetKind::ALL {
            if !config.widget_enabled(kind) {
                tracing::debug!(widget = %kind, "Widget disabled in config");
                continue;
            }
            let widget = widget_for(kind, &client, &retry, config.query_for(kind));
            dashboard.add(widget, config.polling_for(kind));
        }
        Ok(dashboard)
    }

    pub fn add(&mut self, widget: Box<dyn PolledWidget>, config: PollingConfig) {
        self.slots.push(Slot { widget, config });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn kinds(&self) -> Vec<WidgetKind> {
        self.slots.iter().map(|s| s.widget.kind()).collect()
    }

    pub fn get(&self, kind: WidgetKind) -> Option<&dyn PolledWidget> {
        self.slots
            .iter()
            .find(|s| s.widget.kind() == kind)
            .map(|s| s.widget.as_ref())
    }

    pub fn start_all(&self) -> Result<(), FitdashError> {
        for slot in &self.slots {
            slot.widget.start(slot.config)?;
        }
        Ok(())
    }

    pub fn stop_all(&self) {
        for slot in &self.slots {
            slot.widget.stop();
        }
    }

    pub fn refresh_all(&self) {
        for slot in &self.slots {
            slot.widget.refresh_now();
        }
    }

    /// Auto-refresh toggle for every widget, as the panels' live-monitor switch.
    pub fn set_auto_refresh(&self, enabled: bool) {
        for slot in &self.slots {
            slot.widget.set_auto_refresh(enabled);
        }
    }

    pub fn statuses(&self) -> Vec<WidgetStatus> {
        self.slots.iter().map(|s| s.widget.status()).collect()
    }

    /// Wait until no widget is loading. Widgets with nothing dispatched
    /// count as settled.
    pub async fn settled(&self) {
        let waits: Vec<_> = self.slots.iter().map(|s| s.widget.settled()).collect();
        futures::future::join_all(waits).await;
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polling::from_fn;
    use std::time::Duration;

    fn fixed<P: WidgetPayload>(value: P) -> Box<dyn PolledWidget> {
        let fetcher: Arc<dyn Fetcher<P>> = Arc::new(from_fn(move || {
            let v = value.clone();
            async move { Ok::<_, FitdashError>(v) }
        }));
        Box::new(PollingSource::new(P::KIND.slug(), fetcher))
    }

    fn failing<P: WidgetPayload>() -> Box<dyn PolledWidget> {
        let fetcher: Arc<dyn Fetcher<P>> =
            Arc::new(from_fn(|| async { Err::<P, _>(FitdashError::Http { status: 502 }) }));
        Box::new(PollingSource::new(P::KIND.slug(), fetcher))
    }

    #[test]
    fn test_from_config_respects_enabled_flags() {
        let mut config = Config::default();
        config.widgets.insert(
            "revenue".into(),
            crate::infra::config::WidgetEntry {
                enabled: false,
                ..Default::default()
            },
        );
        let dashboard = Dashboard::from_config(&config).unwrap();
        assert_eq!(dashboard.len(), 4);
        assert!(dashboard.get(WidgetKind::Revenue).is_none());
        assert!(dashboard.get(WidgetKind::SystemHealth).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_reports_each_widget() {
        let mut dashboard = Dashboard::new();
        let once = PollingConfig {
            enabled: false,
            ..PollingConfig::every(Duration::from_secs(30))
        };
        dashboard.add(fixed(DashboardStats::default()), once);
        dashboard.add(failing::<SystemHealth>(), once);

        dashboard.start_all().unwrap();
        dashboard.settled().await;

        let statuses = dashboard.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].widget, "dashboard_stats");
        assert_eq!(statuses[0].status, FetchStatus::Success);
        assert!(statuses[0].summary.is_some());
        assert_eq!(statuses[1].status, FetchStatus::Error);
        assert_eq!(
            statuses[1].error.as_ref().map(|e| e.message.as_str()),
            Some("HTTP error! status: 502")
        );
        assert!(statuses[1].summary.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_pending_while_loading() {
        let fetcher: Arc<dyn Fetcher<McpHealth>> = Arc::new(from_fn(|| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, FitdashError>(McpHealth::default())
        }));
        let widget = PollingSource::new("slow", fetcher);
        widget.start(PollingConfig::every(Duration::from_secs(30))).unwrap();

        let mut settled = tokio_test::task::spawn(PolledWidget::settled(&widget));
        tokio_test::assert_pending!(settled.poll());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(settled.is_woken());
        tokio_test::assert_ready!(settled.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_without_dispatch_resolves() {
        let mut dashboard = Dashboard::new();
        let deferred = PollingConfig {
            immediate: false,
            ..PollingConfig::every(Duration::from_secs(60))
        };
        dashboard.add(fixed(McpHealth::default()), deferred);
        dashboard.start_all().unwrap();

        let mut settled = tokio_test::task::spawn(dashboard.settled());
        tokio_test::assert_ready!(settled.poll());
        drop(settled);
        assert_eq!(dashboard.statuses()[0].status, FetchStatus::Idle);
        assert_eq!(dashboard.statuses()[0].fetches, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_all_dispatches_once_per_widget() {
        let mut dashboard = Dashboard::new();
        let cfg = PollingConfig {
            immediate: false,
            ..PollingConfig::every(Duration::from_secs(60))
        };
        dashboard.add(fixed(McpHealth::default()), cfg);
        dashboard.add(fixed(PendingOrders::default()), cfg);
        dashboard.start_all().unwrap();

        dashboard.refresh_all();
        dashboard.settled().await;
        assert!(dashboard.statuses().iter().all(|s| s.fetches == 1));

        dashboard.stop_all();
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert!(dashboard.statuses().iter().all(|s| s.fetches == 1));
    }
}
