// src/widgets/http.rs — REST fetchers for the admin API

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::catalog::{QueryPairs, WidgetKind};
use super::decode::WidgetPayload;
use crate::infra::config::ApiConfig;
use crate::infra::errors::FitdashError;
use crate::polling::Fetcher;

/// Authenticated client for the admin API. Shared by every widget fetcher.
pub struct AdminApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl AdminApiClient {
    pub fn new(api: &ApiConfig, token: Option<String>) -> Result<Self, FitdashError> {
        if api.timeout_secs == 0 {
            return Err(FitdashError::Config(
                "api.timeout_secs must be greater than zero".into(),
            ));
        }
        Url::parse(&api.base_url)
            .map_err(|e| FitdashError::Config(format!("api.base_url '{}': {e}", api.base_url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("fitdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FitdashError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Full URL for a widget, keeping any path prefix on `base_url`.
    pub fn endpoint_url(&self, kind: WidgetKind, query: &QueryPairs) -> Result<Url, FitdashError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, kind.endpoint()))
            .map_err(|e| FitdashError::Config(format!("endpoint for {kind}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// GET the widget endpoint and return the raw JSON body.
    pub async fn get_json(
        &self,
        kind: WidgetKind,
        query: &QueryPairs,
    ) -> Result<Value, FitdashError> {
        let url = self.endpoint_url(kind, query)?;
        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(widget = %kind, status = status.as_u16(), "Admin API returned an error status");
            return Err(FitdashError::Http {
                status: status.as_u16(),
            });
        }

        resp.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                FitdashError::Decode {
                    widget: kind.slug().to_string(),
                    message: e.to_string(),
                }
            } else {
                FitdashError::from(e)
            }
        })
    }
}

/// Fetches and decodes one widget's payload.
pub struct HttpFetcher<P> {
    client: Arc<AdminApiClient>,
    query: QueryPairs,
    _payload: PhantomData<fn() -> P>,
}

impl<P> HttpFetcher<P> {
    pub fn new(client: Arc<AdminApiClient>, query: QueryPairs) -> Self {
        Self {
            client,
            query,
            _payload: PhantomData,
        }
    }
}

#[async_trait]
impl<P: WidgetPayload> Fetcher<P> for HttpFetcher<P> {
    async fn fetch(&self) -> Result<P, FitdashError> {
        let raw = self.client.get_json(P::KIND, &self.query).await?;
        P::decode(raw)
    }
}
