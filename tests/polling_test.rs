// tests/polling_test.rs — Integration test: polling source scheduling and race handling

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use pretty_assertions::assert_eq;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant};

use fitdash::infra::errors::FitdashError;
use fitdash::polling::{from_fn, FetchState, FetchStatus, Fetcher, PollingConfig, PollingSource};

type Log<T> = Arc<Mutex<Vec<(FetchStatus, Option<T>)>>>;

/// Fetcher whose n-th call (1-based) resolves to `script(n)` after the given delay in ms.
fn scripted<T, F>(script: F) -> (Arc<dyn Fetcher<T>>, Arc<AtomicU64>)
where
    T: Send + 'static,
    F: Fn(u64) -> (u64, Result<T, FitdashError>) + Send + Sync + 'static,
{
    let calls = Arc::new(AtomicU64::new(0));
    let counter = calls.clone();
    let fetcher: Arc<dyn Fetcher<T>> = Arc::new(from_fn(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        let (delay_ms, result) = script(n);
        async move {
            sleep(Duration::from_millis(delay_ms)).await;
            result
        }
    }));
    (fetcher, calls)
}

/// Record every state the source publishes.
fn record<T>(mut rx: watch::Receiver<FetchState<T>>) -> Log<T>
where
    T: Clone + Send + Sync + 'static,
{
    let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            sink.lock().unwrap().push((state.status, state.data));
        }
    });
    log
}

fn every_ms(ms: u64) -> PollingConfig {
    PollingConfig::every(Duration::from_millis(ms))
}

fn deferred(ms: u64) -> PollingConfig {
    PollingConfig {
        immediate: false,
        ..every_ms(ms)
    }
}

async fn at(origin: Instant, ms: u64) {
    sleep_until(origin + Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_immediate_then_interval_sequence() {
    let (fetcher, _) = scripted(|n| (10, Ok::<_, FitdashError>(n as u32)));
    let source = PollingSource::new("seq", fetcher);
    let log = record(source.subscribe());
    let t0 = Instant::now();

    source.start(every_ms(1000)).unwrap();
    at(t0, 1500).await;

    let observed = log.lock().unwrap().clone();
    assert_eq!(
        observed,
        vec![
            (FetchStatus::Loading, None),
            (FetchStatus::Success, Some(1)),
            (FetchStatus::Loading, Some(1)),
            (FetchStatus::Success, Some(2)),
        ]
    );
    source.stop();
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_fetches_newest_dispatch_wins() {
    let (fetcher, _) = scripted(|n| match n {
        1 => (500, Ok::<_, FitdashError>("A")),
        _ => (100, Ok("B")),
    });
    let source = PollingSource::new("overlap", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(60_000)).unwrap();
    at(t0, 100).await;
    source.refresh_now();
    assert_eq!(source.fetch_count(), 2);

    at(t0, 300).await;
    assert_eq!(source.snapshot().data, Some("B"));

    // seq 1 resolves at t=500 and must not overwrite seq 2
    at(t0, 600).await;
    let state = source.snapshot();
    assert_eq!(state.data, Some("B"));
    assert_eq!(state.status, FetchStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_resolution_keeps_highest_sequence() {
    let (fetcher, _) = scripted(|n| match n {
        1 => (300, Ok::<_, FitdashError>(1u32)),
        2 => (100, Ok(2)),
        _ => (200, Ok(3)),
    });
    let source = PollingSource::new("race", fetcher);
    let log = record(source.subscribe());
    let t0 = Instant::now();

    source.start(every_ms(60_000)).unwrap();
    source.refresh_now();
    source.refresh_now();
    assert_eq!(source.fetch_count(), 3);

    at(t0, 1000).await;
    assert_eq!(source.snapshot().data, Some(3));
    let applied: Vec<u32> = log
        .lock()
        .unwrap()
        .iter()
        .filter(|(status, _)| *status == FetchStatus::Success)
        .filter_map(|(_, data)| *data)
        .collect();
    assert_eq!(applied, vec![2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_newer_error_beats_older_success() {
    let (fetcher, _) = scripted(|n| match n {
        1 => (300, Ok::<_, FitdashError>(1u32)),
        _ => (50, Err(FitdashError::Http { status: 503 })),
    });
    let source = PollingSource::new("race-error", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(60_000)).unwrap();
    source.refresh_now();

    at(t0, 500).await;
    let state = source.snapshot();
    assert_eq!(state.status, FetchStatus::Error);
    assert_eq!(state.data, None);
    assert_eq!(state.error.unwrap().status, Some(503));
}

#[tokio::test(start_paused = true)]
async fn test_stop_prevents_further_fetches() {
    let (fetcher, calls) = scripted(|n| (0, Ok::<_, FitdashError>(n)));
    let source = PollingSource::new("stop", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(1000)).unwrap();
    at(t0, 10).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    source.stop();
    assert!(!source.is_active());
    at(t0, 10 + 2 * 1000 + 1).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_in_flight_result() {
    let (fetcher, _) = scripted(|_| (500, Ok::<_, FitdashError>(9u8)));
    let source = PollingSource::new("discard", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(1000)).unwrap();
    at(t0, 100).await;
    assert!(source.snapshot().is_loading());
    source.stop();
    assert_eq!(source.snapshot().status, FetchStatus::Idle);

    at(t0, 800).await;
    let state = source.snapshot();
    assert_eq!(state.status, FetchStatus::Idle);
    assert_eq!(state.data, None);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_resets_timer() {
    let (fetcher, calls) = scripted(|n| (0, Ok::<_, FitdashError>(n)));
    let source = PollingSource::new("reset", fetcher);
    let t0 = Instant::now();

    source.start(deferred(1000)).unwrap();
    at(t0, 600).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    source.refresh_now();
    assert_eq!(source.fetch_count(), 1);

    // the tick that was due at t=1000 moved to t=1600
    at(t0, 1599).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    at(t0, 1601).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    at(t0, 2601).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_double_start_keeps_single_timer() {
    let (fetcher, calls) = scripted(|n| (0, Ok::<_, FitdashError>(n)));
    let source = PollingSource::new("double", fetcher);
    let t0 = Instant::now();

    source.start(deferred(1000)).unwrap();
    source.start(deferred(1000)).unwrap();

    at(t0, 1001).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    at(t0, 2001).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let (fetcher, calls) = scripted(|n| (0, Ok::<_, FitdashError>(n)));
    let source = PollingSource::new("restart", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(1000)).unwrap();
    at(t0, 10).await;
    source.stop();
    source.start(every_ms(1000)).unwrap();
    assert!(source.is_active());

    at(t0, 20).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.snapshot().data, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_stale_data_until_next_success() {
    let (fetcher, _) = scripted(|n| match n {
        1 => (10, Ok::<_, FitdashError>(5u32)),
        2 => (10, Err(FitdashError::Http { status: 500 })),
        _ => (10, Ok(6)),
    });
    let source = PollingSource::new("stale", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(1000)).unwrap();
    at(t0, 20).await;
    let first = source.snapshot();
    assert_eq!(first.status, FetchStatus::Success);
    assert_eq!(first.data, Some(5));

    at(t0, 1020).await;
    let failed = source.snapshot();
    assert_eq!(failed.status, FetchStatus::Error);
    assert_eq!(failed.data, Some(5));
    assert_eq!(failed.last_updated_at, first.last_updated_at);
    assert_eq!(
        failed.error.as_ref().map(|e| e.message.as_str()),
        Some("HTTP error! status: 500")
    );
    assert!(failed.showing_stale_data());

    at(t0, 2020).await;
    let recovered = source.snapshot();
    assert_eq!(recovered.status, FetchStatus::Success);
    assert_eq!(recovered.data, Some(6));
    assert!(recovered.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_error_during_loading_keeps_previous_error_visible() {
    let (fetcher, _) = scripted(|_| (10, Err::<u8, _>(FitdashError::Network("refused".into()))));
    let source = PollingSource::new("errors", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(1000)).unwrap();
    at(t0, 20).await;
    assert_eq!(source.snapshot().status, FetchStatus::Error);

    at(t0, 1005).await;
    let reloading = source.snapshot();
    assert_eq!(reloading.status, FetchStatus::Loading);
    assert!(reloading.error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_abort_on_stop_drops_fetch_future() {
    struct DropFlag(Arc<AtomicBool>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let dropped = Arc::new(AtomicBool::new(false));
    let flag = dropped.clone();
    let fetcher: Arc<dyn Fetcher<u8>> = Arc::new(from_fn(move || {
        let guard = DropFlag(flag.clone());
        async move {
            let _guard = guard;
            sleep(Duration::from_secs(5)).await;
            Ok::<_, FitdashError>(1u8)
        }
    }));
    let source = PollingSource::new("abort", fetcher);
    let t0 = Instant::now();

    source
        .start(PollingConfig {
            abort_on_stop: true,
            ..every_ms(60_000)
        })
        .unwrap();
    at(t0, 100).await;
    assert!(!dropped.load(Ordering::SeqCst));

    source.stop();
    at(t0, 110).await;
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(source.snapshot().status, FetchStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_off_still_allows_manual_refresh() {
    let (fetcher, calls) = scripted(|n| (0, Ok::<_, FitdashError>(n)));
    let source = PollingSource::new("manual", fetcher);
    let t0 = Instant::now();

    source.start(every_ms(1000)).unwrap();
    at(t0, 10).await;
    source.set_auto_refresh(false);
    assert!(!source.auto_refresh());

    at(t0, 3000).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    source.refresh_now();
    at(t0, 3010).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.snapshot().data, Some(2));

    source.set_auto_refresh(true);
    assert!(source.auto_refresh());
    at(t0, 3999).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    at(t0, 4011).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_before_start_is_ignored() {
    let (fetcher, calls) = scripted(|n| (0, Ok::<_, FitdashError>(n)));
    let source = PollingSource::new("idle", fetcher);

    source.refresh_now();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(source.snapshot(), FetchState::default());
}

#[tokio::test]
async fn test_zero_interval_rejected() {
    let (fetcher, _) = scripted(|n| (0, Ok::<_, FitdashError>(n)));
    let source = PollingSource::new("zero", fetcher);
    assert!(source.start(PollingConfig::every(Duration::ZERO)).is_err());
    assert!(!source.is_active());
}

mock! {
    pub StatsApi {}

    #[async_trait]
    impl Fetcher<u32> for StatsApi {
        async fn fetch(&self) -> Result<u32, FitdashError>;
    }
}

#[tokio::test(start_paused = true)]
async fn test_mock_fetcher_called_once_without_timer() {
    let mut api = MockStatsApi::new();
    api.expect_fetch().times(1).returning(|| Ok(42));

    let source = PollingSource::new("mock", Arc::new(api) as Arc<dyn Fetcher<u32>>);
    let mut rx = source.subscribe();
    source
        .start(PollingConfig {
            enabled: false,
            ..PollingConfig::default()
        })
        .unwrap();

    let state = rx
        .wait_for(|s| s.status == FetchStatus::Success)
        .await
        .unwrap()
        .clone();
    assert_eq!(state.data, Some(42));
    assert!(state.last_updated_at.is_some());

    sleep(Duration::from_secs(120)).await;
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_mock_fetcher_error_is_stored_not_returned() {
    let mut api = MockStatsApi::new();
    api.expect_fetch().returning(|| {
        Err(FitdashError::Api {
            message: "Admin access required".into(),
        })
    });

    let source = PollingSource::new("mock-error", Arc::new(api) as Arc<dyn Fetcher<u32>>);
    let mut rx = source.subscribe();
    assert!(source.start(every_ms(1000)).is_ok());

    let state = rx
        .wait_for(|s| s.status == FetchStatus::Error)
        .await
        .unwrap()
        .clone();
    assert_eq!(state.error.unwrap().message, "Admin access required");
    assert!(source.is_active());
    source.stop();
}
