// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::infra::paths;
use crate::polling::retry::RetryPolicy;
use crate::polling::PollingConfig;
use crate::widgets::catalog::{set_query_param, QueryPairs, WidgetKind, TIME_RANGES};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub polling: PollingSection,

    #[serde(default)]
    pub retry: RetrySection,

    /// Per-widget overrides keyed by widget slug (`system_health`, `revenue`, ...).
    #[serde(default)]
    pub widgets: BTreeMap<String, WidgetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token. Falls back to FITDASH_TOKEN when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:10000".into(),
            token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    /// Global interval override. Unset means each widget's own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    pub enabled: bool,
    pub immediate: bool,
    /// Abort in-flight requests on stop instead of letting them finish.
    #[serde(default)]
    pub abort_on_stop: bool,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            interval_ms: None,
            enabled: true,
            immediate: true,
            abort_on_stop: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter_fraction: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            backoff_factor: policy.backoff_factor,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            jitter_fraction: policy.jitter_fraction,
        }
    }
}

impl RetrySection {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter_fraction: self.jitter_fraction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,

    // Query overrides. Each applies only to the widget that sends it.
    /// Revenue: one of 24h, 7d, 30d, 90d, 1y
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    /// Pending orders: page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Pending orders: asc or desc
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    /// Pending orders: status filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for WidgetEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: None,
            time_range: None,
            limit: None,
            sort_by: None,
            sort_order: None,
            status: None,
        }
    }
}

impl WidgetEntry {
    /// Overrides that are set, keyed by the query parameter they replace.
    fn query_overrides(&self) -> Vec<(&'static str, String)> {
        [
            ("timeRange", self.time_range.clone()),
            ("limit", self.limit.map(|l| l.to_string())),
            ("sortBy", self.sort_by.clone()),
            ("sortOrder", self.sort_order.clone()),
            ("status", self.status.clone()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.api.base_url)
            .map_err(|e| anyhow::anyhow!("api.base_url '{}': {e}", self.api.base_url))?;

        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than zero");
        }

        for (name, entry) in &self.widgets {
            let Some(kind) = WidgetKind::from_slug(name) else {
                anyhow::bail!("Unknown widget '{name}' in [widgets]");
            };
            for (key, _) in entry.query_overrides() {
                if !kind.query_keys().contains(&key) {
                    anyhow::bail!("[widgets.{name}] sets '{key}', which {kind} does not send");
                }
            }
            if let Some(ref range) = entry.time_range {
                if !TIME_RANGES.contains(&range.as_str()) {
                    anyhow::bail!(
                        "[widgets.{name}] time_range '{range}' must be one of {}",
                        TIME_RANGES.join(", ")
                    );
                }
            }
            if entry.limit == Some(0) {
                anyhow::bail!("[widgets.{name}] limit must be greater than zero");
            }
            if let Some(ref order) = entry.sort_order {
                if order != "asc" && order != "desc" {
                    anyhow::bail!("[widgets.{name}] sort_order must be 'asc' or 'desc'");
                }
            }
        }

        let zero_interval = self.polling.interval_ms == Some(0)
            || self.widgets.values().any(|w| w.interval_ms == Some(0));
        if zero_interval {
            anyhow::bail!("interval_ms must be greater than zero");
        }
        Ok(())
    }

    /// Bearer token from config, or FITDASH_TOKEN.
    pub fn token(&self) -> Option<String> {
        self.api
            .token
            .clone()
            .or_else(|| std::env::var("FITDASH_TOKEN").ok())
            .filter(|t| !t.is_empty())
    }

    pub fn widget_enabled(&self, kind: WidgetKind) -> bool {
        self.widgets
            .get(kind.slug())
            .map(|w| w.enabled)
            .unwrap_or(true)
    }

    /// Effective interval: widget override, then global override, then the
    /// widget's built-in default.
    pub fn interval_for(&self, kind: WidgetKind) -> Duration {
        self.widgets
            .get(kind.slug())
            .and_then(|w| w.interval_ms)
            .or(self.polling.interval_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| kind.default_interval())
    }

    /// Query for a widget: the panel defaults with `[widgets.<slug>]` overrides applied.
    pub fn query_for(&self, kind: WidgetKind) -> QueryPairs {
        let mut query = kind.default_query();
        if let Some(entry) = self.widgets.get(kind.slug()) {
            for (key, value) in entry.query_overrides() {
                set_query_param(&mut query, key, value);
            }
        }
        query
    }

    pub fn polling_for(&self, kind: WidgetKind) -> PollingConfig {
        PollingConfig {
            interval: self.interval_for(kind),
            enabled: self.polling.enabled,
            immediate: self.polling.immediate,
            abort_on_stop: self.polling.abort_on_stop,
        }
    }
}
