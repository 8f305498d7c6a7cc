// src/polling/source.rs — Polling data source: schedule, dispatch, race filtering
//
// Every dispatch is tagged with a sequence number. A result lands in state
// only if its number is higher than every result applied before it, so a slow
// early request can never overwrite a newer one. All state writes happen
// under `Shared::inner`, which is never held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::fetcher::Fetcher;
use super::state::{ErrorInfo, FetchState};
use super::PollingConfig;
use crate::infra::errors::FitdashError;

/// What caused a fetch cycle, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Initial,
    Timer,
    Manual,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::Timer => "timer",
            Trigger::Manual => "manual",
        }
    }
}

struct Inner {
    active: bool,
    /// Bumped by `stop`; results dispatched under an older epoch are dropped.
    epoch: u64,
    config: PollingConfig,
    dispatched_seq: u64,
    applied_seq: u64,
    fetch_count: u64,
    next_tick: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    /// Identifies the current timer task; a superseded one exits on its next wake.
    timer_gen: u64,
    in_flight: HashMap<u64, AbortHandle>,
}

struct Shared<T> {
    label: String,
    id: Uuid,
    fetcher: Arc<dyn Fetcher<T>>,
    state_tx: watch::Sender<FetchState<T>>,
    inner: Mutex<Inner>,
    tick_reset: Notify,
}

/// A fetch that has been numbered and announced but not yet spawned.
struct PendingFetch {
    seq: u64,
    epoch: u64,
    trigger: Trigger,
    registration: AbortRegistration,
}

/// Keeps one widget's [`FetchState`] fresh by calling its fetcher on a
/// schedule. Each widget owns its own source; nothing is shared between them.
///
/// Must be used inside a tokio runtime. Dropping the source stops it.
pub struct PollingSource<T> {
    shared: Arc<Shared<T>>,
}

impl<T> PollingSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(label: impl Into<String>, fetcher: Arc<dyn Fetcher<T>>) -> Self {
        let (state_tx, _) = watch::channel(FetchState::default());
        Self {
            shared: Arc::new(Shared {
                label: label.into(),
                id: Uuid::new_v4(),
                fetcher,
                state_tx,
                inner: Mutex::new(Inner {
                    active: false,
                    epoch: 0,
                    config: PollingConfig::default(),
                    dispatched_seq: 0,
                    applied_seq: 0,
                    fetch_count: 0,
                    next_tick: None,
                    timer: None,
                    timer_gen: 0,
                    in_flight: HashMap::new(),
                }),
                tick_reset: Notify::new(),
            }),
        }
    }

    /// Begin polling. Fetches once right away when `config.immediate` is set.
    /// Calling `start` on a running source does nothing.
    pub fn start(&self, config: PollingConfig) -> Result<(), FitdashError> {
        config.validate()?;

        let pending = {
            let mut inner = self.shared.lock();
            if inner.active {
                tracing::debug!(widget = %self.shared.label, "start ignored: already polling");
                return Ok(());
            }
            inner.active = true;
            inner.config = config;

            if config.enabled {
                self.shared.arm_timer(&mut inner);
            }

            tracing::info!(
                widget = %self.shared.label,
                source_id = %self.shared.id,
                interval_ms = config.interval.as_millis() as u64,
                auto_refresh = config.enabled,
                "Polling started"
            );

            if config.immediate {
                Some(self.shared.begin_fetch(&mut inner, Trigger::Initial))
            } else {
                None
            }
        };

        if let Some(p) = pending {
            self.shared.spawn_fetch(p);
        }
        Ok(())
    }

    /// Stop polling. Pending timers are cancelled and results of fetches
    /// still in flight are discarded. With `abort_on_stop` those fetches
    /// are also aborted.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Fetch now and push the next automatic fetch a full interval out.
    /// Ignored when the source is not started.
    pub fn refresh_now(&self) {
        let pending = {
            let mut inner = self.shared.lock();
            if !inner.active {
                tracing::debug!(widget = %self.shared.label, "refresh ignored: source stopped");
                return;
            }
            if inner.timer.is_some() {
                inner.next_tick = Some(Instant::now() + inner.config.interval);
            }
            self.shared.begin_fetch(&mut inner, Trigger::Manual)
        };
        self.shared.tick_reset.notify_one();
        self.shared.spawn_fetch(pending);
    }

    /// Turn the timer on or off without stopping the source. Manual
    /// refreshes keep working while it is off. A later `start` takes the
    /// setting from its own config.
    pub fn set_auto_refresh(&self, enabled: bool) {
        let mut inner = self.shared.lock();
        if inner.config.enabled == enabled {
            return;
        }
        inner.config.enabled = enabled;
        if !inner.active {
            return;
        }

        if enabled {
            self.shared.arm_timer(&mut inner);
        } else {
            disarm_timer(&mut inner);
        }
        tracing::info!(widget = %self.shared.label, auto_refresh = enabled, "Auto-refresh toggled");
    }

    pub fn is_active(&self) -> bool {
        self.shared.lock().active
    }

    pub fn auto_refresh(&self) -> bool {
        let inner = self.shared.lock();
        inner.active && inner.timer.is_some()
    }

    /// Number of fetches dispatched since creation.
    pub fn fetch_count(&self) -> u64 {
        self.shared.lock().fetch_count
    }

    /// Read-only view that wakes on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.shared.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> FetchState<T> {
        self.shared.state_tx.borrow().clone()
    }
}

impl<T> Drop for PollingSource<T> {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State stays consistent under poisoning: every write is a plain field store.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stop(&self) {
        let mut inner = self.lock();
        if !inner.active {
            return;
        }
        inner.active = false;
        inner.epoch += 1;
        disarm_timer(&mut inner);

        // Every entry now belongs to the old epoch. Dropping a handle leaves
        // its fetch running; only abort_on_stop cancels it.
        let in_flight = inner.in_flight.len();
        let abort = inner.config.abort_on_stop;
        for (_, handle) in inner.in_flight.drain() {
            if abort {
                handle.abort();
            }
        }

        self.state_tx.send_if_modified(|s| s.settle_after_stop());
        tracing::info!(
            widget = %self.label,
            source_id = %self.id,
            in_flight,
            aborted = inner.config.abort_on_stop,
            "Polling stopped"
        );
    }

    /// Number the next fetch and flip state to `Loading`. The caller spawns
    /// it after releasing the lock.
    fn begin_fetch(&self, inner: &mut Inner, trigger: Trigger) -> PendingFetch {
        inner.dispatched_seq += 1;
        inner.fetch_count += 1;
        let seq = inner.dispatched_seq;

        let (handle, registration) = AbortHandle::new_pair();
        inner.in_flight.insert(seq, handle);
        self.state_tx.send_modify(|s| s.begin_loading());

        tracing::debug!(widget = %self.label, seq, trigger = trigger.as_str(), "Dispatching fetch");
        PendingFetch {
            seq,
            epoch: inner.epoch,
            trigger,
            registration,
        }
    }

    /// Apply a resolved fetch, unless stop or a newer result superseded it.
    fn settle(&self, pending_seq: u64, epoch: u64, outcome: Result<Result<T, FitdashError>, Aborted>) {
        let mut inner = self.lock();
        inner.in_flight.remove(&pending_seq);

        let result = match outcome {
            Ok(result) => result,
            Err(Aborted) => {
                tracing::debug!(widget = %self.label, seq = pending_seq, "Fetch aborted");
                return;
            }
        };

        if !inner.active || inner.epoch != epoch {
            tracing::debug!(widget = %self.label, seq = pending_seq, "Discarding result: source stopped");
            return;
        }
        if pending_seq <= inner.applied_seq {
            tracing::debug!(
                widget = %self.label,
                seq = pending_seq,
                applied = inner.applied_seq,
                "Discarding superseded result"
            );
            return;
        }
        inner.applied_seq = pending_seq;

        match result {
            Ok(data) => {
                self.state_tx.send_modify(|s| s.apply_success(data, Utc::now()));
            }
            Err(e) => {
                tracing::warn!(widget = %self.label, seq = pending_seq, "Fetch failed: {}", e);
                let info = ErrorInfo::from(&e);
                self.state_tx.send_modify(|s| s.apply_failure(info));
            }
        }
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn arm_timer(self: &Arc<Self>, inner: &mut Inner) {
        disarm_timer(inner);
        inner.next_tick = Some(Instant::now() + inner.config.interval);
        inner.timer = Some(tokio::spawn(run_timer(Arc::clone(self), inner.timer_gen)));
    }

    fn spawn_fetch(self: &Arc<Self>, pending: PendingFetch) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let PendingFetch {
                seq,
                epoch,
                trigger,
                registration,
            } = pending;
            let outcome = Abortable::new(shared.fetcher.fetch(), registration).await;
            tracing::trace!(widget = %shared.label, seq, trigger = trigger.as_str(), "Fetch resolved");
            shared.settle(seq, epoch, outcome);
        });
    }
}

fn disarm_timer(inner: &mut Inner) {
    inner.timer_gen += 1;
    inner.next_tick = None;
    if let Some(timer) = inner.timer.take() {
        timer.abort();
    }
}

/// Sleeps until `next_tick`, re-reading it whenever `refresh_now` moves it.
async fn run_timer<T>(shared: Arc<Shared<T>>, generation: u64)
where
    T: Clone + Send + Sync + 'static,
{
    loop {
        let deadline = {
            let inner = shared.lock();
            if !inner.active || inner.timer_gen != generation {
                return;
            }
            match inner.next_tick {
                Some(deadline) => deadline,
                None => return,
            }
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                let pending = {
                    let mut inner = shared.lock();
                    if !inner.active || inner.timer_gen != generation {
                        return;
                    }
                    let now = Instant::now();
                    match inner.next_tick {
                        Some(tick) if tick <= now => {}
                        // moved by a manual refresh while we slept
                        Some(_) => continue,
                        None => return,
                    }
                    inner.next_tick = Some(now + inner.config.interval);
                    shared.begin_fetch(&mut inner, Trigger::Timer)
                };
                shared.spawn_fetch(pending);
            }
            _ = shared.tick_reset.notified() => {}
        }
    }
}
