// src/polling/fetcher.rs — The async operation a polling source drives

use std::future::Future;

use async_trait::async_trait;

use crate::infra::errors::FitdashError;

/// One request for a widget's data. Timeouts belong to the implementation.
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self) -> Result<T, FitdashError>;
}

/// Adapts an async closure into a [`Fetcher`].
pub struct FnFetcher<F> {
    f: F,
}

pub fn from_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher { f }
}

#[async_trait]
impl<T, F, Fut> Fetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, FitdashError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<T, FitdashError> {
        (self.f)().await
    }
}
