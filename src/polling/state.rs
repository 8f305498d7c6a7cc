// src/polling/state.rs — Observable fetch state for one polling source

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::infra::errors::FitdashError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Coarse classification of a failed fetch, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request never produced a response (connect, timeout, reset)
    Network,
    /// Non-2xx response
    Http,
    /// 2xx response with `success: false`
    Api,
    /// Body did not match the widget's payload shape
    Decode,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status, when the failure carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub at: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            at: Utc::now(),
        }
    }
}

impl From<&FitdashError> for ErrorInfo {
    fn from(e: &FitdashError) -> Self {
        let kind = match e {
            FitdashError::Network(_) => ErrorKind::Network,
            FitdashError::Http { .. } => ErrorKind::Http,
            FitdashError::Api { .. } => ErrorKind::Api,
            FitdashError::Decode { .. } => ErrorKind::Decode,
            _ => ErrorKind::Other,
        };
        let mut info = ErrorInfo::new(kind, e.to_string());
        if let FitdashError::Http { status } = e {
            info.status = Some(*status);
        }
        info
    }
}

/// What a widget renders from. `data` survives loading and failed cycles so
/// the last known values stay on screen next to a spinner or error banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub status: FetchStatus,
    pub error: Option<ErrorInfo>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            status: FetchStatus::Idle,
            error: None,
            last_updated_at: None,
        }
    }
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    /// True when an error banner should sit next to previously fetched data.
    pub fn showing_stale_data(&self) -> bool {
        self.status == FetchStatus::Error && self.data.is_some()
    }

    pub(crate) fn begin_loading(&mut self) {
        self.status = FetchStatus::Loading;
    }

    pub(crate) fn apply_success(&mut self, data: T, now: DateTime<Utc>) {
        self.data = Some(data);
        self.status = FetchStatus::Success;
        self.error = None;
        self.last_updated_at = Some(now);
    }

    pub(crate) fn apply_failure(&mut self, error: ErrorInfo) {
        self.status = FetchStatus::Error;
        self.error = Some(error);
    }

    /// Leave `Loading` after a stop discarded the in-flight result.
    /// Returns whether anything changed.
    pub(crate) fn settle_after_stop(&mut self) -> bool {
        if self.status != FetchStatus::Loading {
            return false;
        }
        self.status = if self.error.is_some() {
            FetchStatus::Error
        } else if self.data.is_some() {
            FetchStatus::Success
        } else {
            FetchStatus::Idle
        };
        true
    }
}
