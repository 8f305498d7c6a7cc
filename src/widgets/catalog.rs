// src/widgets/catalog.rs — The dashboard widgets, their endpoints and refresh cadence

use std::fmt;
use std::time::Duration;

/// Ordered `key=value` pairs appended to a widget's endpoint.
pub type QueryPairs = Vec<(&'static str, String)>;

/// Ranges offered by the revenue panel's selector.
pub const TIME_RANGES: [&str; 5] = ["24h", "7d", "30d", "90d", "1y"];

/// Replace `key` in place, or append it.
pub fn set_query_param(query: &mut QueryPairs, key: &'static str, value: String) {
    match query.iter_mut().find(|(k, _)| *k == key) {
        Some(pair) => pair.1 = value,
        None => query.push((key, value)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WidgetKind {
    SystemHealth,
    Revenue,
    McpHealth,
    PendingOrders,
    DashboardStats,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 5] = [
        WidgetKind::SystemHealth,
        WidgetKind::Revenue,
        WidgetKind::McpHealth,
        WidgetKind::PendingOrders,
        WidgetKind::DashboardStats,
    ];

    /// Key used in config (`[widgets.<slug>]`) and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            WidgetKind::SystemHealth => "system_health",
            WidgetKind::Revenue => "revenue",
            WidgetKind::McpHealth => "mcp_health",
            WidgetKind::PendingOrders => "pending_orders",
            WidgetKind::DashboardStats => "dashboard_stats",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WidgetKind::SystemHealth => "system health",
            WidgetKind::Revenue => "revenue analytics",
            WidgetKind::McpHealth => "MCP health data",
            WidgetKind::PendingOrders => "pending orders",
            WidgetKind::DashboardStats => "dashboard statistics",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            WidgetKind::SystemHealth => "/api/admin/analytics/system-health",
            WidgetKind::Revenue => "/api/admin/analytics/revenue",
            WidgetKind::McpHealth => "/api/admin/mcp/health",
            WidgetKind::PendingOrders => "/api/admin/orders/pending",
            WidgetKind::DashboardStats => "/api/admin/dashboard-stats",
        }
    }

    /// Query parameters the panel sent before any config override.
    pub fn default_query(&self) -> QueryPairs {
        match self {
            WidgetKind::Revenue => vec![("timeRange", "7d".into())],
            WidgetKind::PendingOrders => vec![
                ("sortBy", "createdAt".into()),
                ("sortOrder", "desc".into()),
                ("limit", "50".into()),
            ],
            _ => Vec::new(),
        }
    }

    /// Query keys that `[widgets.<slug>]` may override for this widget.
    pub fn query_keys(&self) -> &'static [&'static str] {
        match self {
            WidgetKind::Revenue => &["timeRange"],
            WidgetKind::PendingOrders => &["limit", "sortBy", "sortOrder", "status"],
            _ => &[],
        }
    }

    /// Refresh cadence the panel used before any config override.
    pub fn default_interval(&self) -> Duration {
        match self {
            WidgetKind::SystemHealth => Duration::from_secs(15),
            _ => Duration::from_secs(30),
        }
    }

    pub fn from_slug(s: &str) -> Option<WidgetKind> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.slug() == normalized)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
