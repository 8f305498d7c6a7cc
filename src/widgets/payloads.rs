// src/widgets/payloads.rs — Typed payloads for each dashboard widget
//
// Field names follow the admin API (camelCase). Missing numbers default to 0
// and missing lists to empty, so a partially populated backend still renders.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::catalog::WidgetKind;
use super::decode::{lenient_f64, lenient_id, WidgetPayload};

// ── System health ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemHealth {
    pub overall_status: String,
    pub system_metrics: SystemMetrics,
    pub services: Vec<ServiceStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemMetrics {
    /// Percent
    #[serde(deserialize_with = "lenient_f64")]
    pub uptime: f64,
    /// Milliseconds
    #[serde(deserialize_with = "lenient_f64")]
    pub response_time: f64,
    /// Requests per minute
    #[serde(deserialize_with = "lenient_f64")]
    pub throughput: f64,
    /// Percent
    #[serde(deserialize_with = "lenient_f64")]
    pub error_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceStatus {
    pub name: String,
    pub status: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub response_time: f64,
}

impl ServiceStatus {
    pub fn is_up(&self) -> bool {
        matches!(
            self.status.as_str(),
            "healthy" | "online" | "operational" | "up"
        )
    }
}

impl WidgetPayload for SystemHealth {
    const KIND: WidgetKind = WidgetKind::SystemHealth;

    fn normalize(&mut self) {
        self.overall_status = normalize_status(&self.overall_status);
        for service in &mut self.services {
            service.status = normalize_status(&service.status);
        }
    }

    fn summary(&self) -> String {
        let up = self.services.iter().filter(|s| s.is_up()).count();
        format!(
            "{} | uptime {:.2}% | {:.0}ms | {:.2}% errors | {}/{} services up",
            self.overall_status,
            self.system_metrics.uptime,
            self.system_metrics.response_time,
            self.system_metrics.error_rate,
            up,
            self.services.len()
        )
    }
}

fn normalize_status(s: &str) -> String {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        "unknown".into()
    } else {
        s
    }
}

// ── Revenue analytics ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RevenueAnalytics {
    pub overview: RevenueOverview,
    /// Percentage change against the previous period
    pub changes: RevenueChanges,
    pub top_packages: Vec<PackageRevenue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RevenueOverview {
    #[serde(deserialize_with = "lenient_f64")]
    pub total_revenue: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub monthly_recurring: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub average_transaction: f64,
    pub total_customers: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueChanges {
    #[serde(deserialize_with = "lenient_f64")]
    pub revenue: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub customers: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub transactions: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub conversion: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageRevenue {
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub revenue: f64,
    pub sales: u64,
}

impl WidgetPayload for RevenueAnalytics {
    const KIND: WidgetKind = WidgetKind::Revenue;

    fn normalize(&mut self) {
        self.top_packages
            .sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    }

    fn summary(&self) -> String {
        let top = self
            .top_packages
            .first()
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        format!(
            "revenue ${:.2} ({:+.1}%) | MRR ${:.2} | {} customers | top: {}",
            self.overview.total_revenue,
            self.changes.revenue,
            self.overview.monthly_recurring,
            self.overview.total_customers,
            top
        )
    }
}

// ── MCP / AI monitoring ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpHealth {
    pub agents: Vec<AgentHealth>,
    pub models: Vec<ModelHealth>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentHealth {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub response_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelHealth {
    pub name: String,
    pub status: String,
    pub last_updated: Option<String>,
}

impl McpHealth {
    pub fn agents_online(&self) -> usize {
        self.agents
            .iter()
            .filter(|a| matches!(a.status.as_str(), "online" | "healthy" | "active"))
            .count()
    }
}

impl WidgetPayload for McpHealth {
    const KIND: WidgetKind = WidgetKind::McpHealth;

    fn normalize(&mut self) {
        for agent in &mut self.agents {
            agent.status = normalize_status(&agent.status);
        }
        for model in &mut self.models {
            model.status = normalize_status(&model.status);
        }
    }

    fn summary(&self) -> String {
        format!(
            "{}/{} agents online | {} models",
            self.agents_online(),
            self.agents.len(),
            self.models.len()
        )
    }
}

// ── Pending orders ───────────────────────────────────────────────

const HIGH_PRIORITY_AMOUNT: f64 = 200.0;
const MEDIUM_PRIORITY_AMOUNT: f64 = 100.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingOrders {
    pub orders: Vec<PendingOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PendingOrder {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub status: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_amount: f64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub user: Option<OrderUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderUser {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderPriority {
    Low,
    Medium,
    High,
}

impl PendingOrder {
    pub fn customer_name(&self) -> String {
        self.user
            .as_ref()
            .map(|u| format!("{} {}", u.first_name, u.last_name).trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown Customer".into())
    }

    pub fn priority(&self) -> OrderPriority {
        if self.total_amount > HIGH_PRIORITY_AMOUNT {
            OrderPriority::High
        } else if self.total_amount > MEDIUM_PRIORITY_AMOUNT {
            OrderPriority::Medium
        } else {
            OrderPriority::Low
        }
    }
}

impl WidgetPayload for PendingOrders {
    const KIND: WidgetKind = WidgetKind::PendingOrders;

    /// Newest first, one entry per id, and the backend's bare `pending`
    /// status mapped to what the panel shows.
    fn normalize(&mut self) {
        for order in &mut self.orders {
            if order.status == "pending" {
                order.status = "pending_manual_payment".into();
            }
        }
        self.orders
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let mut seen = HashSet::new();
        self.orders.retain(|o| seen.insert(o.id.clone()));
    }

    fn summary(&self) -> String {
        let total: f64 = self.orders.iter().map(|o| o.total_amount).sum();
        let high = self
            .orders
            .iter()
            .filter(|o| o.priority() == OrderPriority::High)
            .count();
        format!(
            "{} pending | ${:.2} outstanding | {} high priority",
            self.orders.len(),
            total,
            high
        )
    }
}

// ── Dashboard stats ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub overview: StatsOverview,
    pub growth: StatsGrowth,
    pub distribution: StatsDistribution,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_users: u64,
    pub recent_signups: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsGrowth {
    #[serde(deserialize_with = "lenient_f64")]
    pub average_daily_signups: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsDistribution {
    #[serde(deserialize_with = "lenient_f64")]
    pub active_percentage: f64,
}

impl WidgetPayload for DashboardStats {
    const KIND: WidgetKind = WidgetKind::DashboardStats;

    fn summary(&self) -> String {
        format!(
            "{} users ({} active, {:.1}%) | {} recent signups, {:.1}/day avg",
            self.overview.total_users,
            self.overview.active_users,
            self.distribution.active_percentage,
            self.overview.recent_signups,
            self.growth.average_daily_signups
        )
    }
}
