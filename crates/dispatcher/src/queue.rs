//! DispatchQueue - deferred, batched delivery with one retry pass

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ContractError, DispatchItem, Param, RelayConfig, RelayStats, Transport, TransportCommand,
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

use crate::metrics::DispatchMetrics;
use crate::scheduler::{IdleScheduler, Scheduler};

/// Param stamped on every event with the configured property id
pub const SEND_TO_PARAM: &str = "send_to";

const DEFAULT_RETRY_CAPACITY: usize = 500;
const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(5);
/// Upper bound on quiet-window rounds, a steady producer still gets flushed
const MAX_COALESCE_ROUNDS: u32 = 20;

/// Outcome of one flush pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Items taken from the pending queue
    pub batch: usize,
    /// Items delivered, on first attempt or on retry
    pub sent: usize,
    /// Items that went into the retry set
    pub retried: usize,
    /// Items given up on
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<DispatchItem>,
    flush_scheduled: bool,
    flushing: bool,
}

struct QueueShared<T> {
    state: Mutex<QueueState>,
    /// Held for a whole pass, so passes never interleave
    transport: tokio::sync::Mutex<T>,
    transport_name: String,
    scheduler: Arc<dyn Scheduler>,
    stats: Arc<RelayStats>,
    metrics: Arc<DispatchMetrics>,
    send_to: Option<String>,
    retry_capacity: usize,
    coalesce_window: Duration,
    /// Bumped on every enqueue
    enqueued: AtomicU64,
    /// Signalled at the end of every pass
    idle: Notify,
}

/// Builder for creating a DispatchQueue
pub struct DispatchQueueBuilder<T> {
    transport: T,
    scheduler: Arc<dyn Scheduler>,
    stats: Option<Arc<RelayStats>>,
    send_to: Option<String>,
    retry_capacity: usize,
    coalesce_window: Duration,
}

impl<T: Transport + Send + 'static> DispatchQueueBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            scheduler: Arc::new(IdleScheduler),
            stats: None,
            send_to: None,
            retry_capacity: DEFAULT_RETRY_CAPACITY,
            coalesce_window: DEFAULT_COALESCE_WINDOW,
        }
    }

    /// Apply property id and dispatch settings from the relay config
    pub fn with_config(self, config: &RelayConfig) -> Self {
        self.send_to(config.measurement_id.clone())
            .retry_capacity(config.dispatch.retry_capacity)
            .coalesce_window(Duration::from_millis(config.dispatch.coalesce_window_ms))
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn stats(mut self, stats: Arc<RelayStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn send_to(mut self, measurement_id: impl Into<String>) -> Self {
        self.send_to = Some(measurement_id.into());
        self
    }

    pub fn retry_capacity(mut self, capacity: usize) -> Self {
        self.retry_capacity = capacity.max(1);
        self
    }

    /// How long the queue must stay quiet before a scheduled pass runs
    pub fn coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window = window;
        self
    }

    pub fn build(self) -> DispatchQueue<T> {
        let transport_name = self.transport.name().to_string();
        DispatchQueue {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState::default()),
                transport: tokio::sync::Mutex::new(self.transport),
                transport_name,
                scheduler: self.scheduler,
                stats: self.stats.unwrap_or_default(),
                metrics: Arc::new(DispatchMetrics::new()),
                send_to: self.send_to,
                retry_capacity: self.retry_capacity,
                coalesce_window: self.coalesce_window,
                enqueued: AtomicU64::new(0),
                idle: Notify::new(),
            }),
        }
    }
}

/// Handle to a dispatch queue
///
/// Cheap to clone; all clones feed the same queue and transport.
pub struct DispatchQueue<T> {
    shared: Arc<QueueShared<T>>,
}

impl<T> Clone for DispatchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport + Send + 'static> DispatchQueue<T> {
    pub fn builder(transport: T) -> DispatchQueueBuilder<T> {
        DispatchQueueBuilder::new(transport)
    }

    pub fn transport_name(&self) -> &str {
        &self.shared.transport_name
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.shared.stats
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.shared.metrics
    }

    /// Items waiting for the next pass
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Nothing pending, scheduled or in flight
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.pending.is_empty() && !state.flush_scheduled && !state.flushing
    }

    /// Exclusive access to the transport, waits for a running pass
    pub async fn lock_transport(&self) -> tokio::sync::MutexGuard<'_, T> {
        self.shared.transport.lock().await
    }

    /// Append an item and make sure a flush is scheduled
    pub fn enqueue(&self, item: DispatchItem) {
        let schedule = {
            let mut state = self.shared.state.lock();
            state.pending.push_back(item);
            self.shared.enqueued.fetch_add(1, Ordering::Release);
            self.shared.metrics.set_pending_len(state.pending.len());
            !std::mem::replace(&mut state.flush_scheduled, true)
        };

        if schedule {
            let queue = self.clone();
            let deferred = self.shared.scheduler.defer(Box::pin(async move {
                queue.wait_for_quiet().await;
                queue.flush().await;
            }));
            if let Err(e) = deferred {
                // Next enqueue tries again
                warn!(error = %e, "Failed to schedule flush");
                self.shared.state.lock().flush_scheduled = false;
            }
        }
    }

    /// Send everything pending, then retry failures once
    #[instrument(name = "dispatch_flush", skip(self), fields(transport = %self.shared.transport_name))]
    pub async fn flush(&self) -> FlushReport {
        let mut transport = self.shared.transport.lock().await;

        let batch: Vec<DispatchItem> = {
            let mut state = self.shared.state.lock();
            state.flush_scheduled = false;
            state.flushing = true;
            self.shared.metrics.set_pending_len(0);
            state.pending.drain(..).collect()
        };

        let mut report = FlushReport {
            batch: batch.len(),
            ..FlushReport::default()
        };
        let mut retry: VecDeque<DispatchItem> = VecDeque::new();

        for item in batch {
            match self.send_item(&mut *transport, item).await {
                Ok(()) => report.sent += 1,
                Err(item) if retry.len() < self.shared.retry_capacity => {
                    report.retried += 1;
                    self.shared.metrics.inc_retry_count();
                    observability::record_dispatch_retry(&self.shared.transport_name);
                    retry.push_back(item);
                }
                Err(item) => {
                    report.dropped += 1;
                    self.drop_item(&item, "retry set full");
                }
            }
        }

        for item in retry {
            match self.send_item(&mut *transport, item).await {
                Ok(()) => report.sent += 1,
                Err(item) => {
                    report.dropped += 1;
                    self.drop_item(&item, "failed after retry");
                }
            }
        }

        self.shared.metrics.record_flush(report.batch);
        observability::record_flush(report.batch);
        self.shared.state.lock().flushing = false;
        drop(transport);
        self.shared.idle.notify_waiters();

        debug!(
            batch = report.batch,
            sent = report.sent,
            retried = report.retried,
            dropped = report.dropped,
            "Flush complete"
        );
        report
    }

    /// Wait until the queue is idle
    pub async fn settle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            // Registered before the check, so a pass ending in between still wakes us
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep window by window until no enqueue lands inside one
    async fn wait_for_quiet(&self) {
        let window = self.shared.coalesce_window;
        if window.is_zero() {
            return;
        }
        let mut seen = self.shared.enqueued.load(Ordering::Acquire);
        for _ in 0..MAX_COALESCE_ROUNDS {
            tokio::time::sleep(window).await;
            let now = self.shared.enqueued.load(Ordering::Acquire);
            if now == seen {
                return;
            }
            seen = now;
        }
        debug!(transport = %self.shared.transport_name, "Producer never went quiet, flushing anyway");
    }

    async fn send_item(&self, transport: &mut T, mut item: DispatchItem) -> Result<(), DispatchItem> {
        item.attempts += 1;
        match transport.send(self.command_for(&item)).await {
            Ok(()) => {
                self.shared.stats.inc_sent();
                observability::record_event_sent(&self.shared.transport_name);
                Ok(())
            }
            Err(e) => {
                self.shared.metrics.inc_failure_count();
                self.log_send_failure(&item, &e);
                Err(item)
            }
        }
    }

    fn command_for(&self, item: &DispatchItem) -> TransportCommand {
        let mut params = item.payload.clone();
        if let Some(id) = &self.shared.send_to {
            params.insert(SEND_TO_PARAM, Param::Text(id.clone()));
        }
        TransportCommand::Event {
            name: item.event_name.clone(),
            params,
        }
    }

    fn log_send_failure(&self, item: &DispatchItem, error: &ContractError) {
        warn!(
            transport = %self.shared.transport_name,
            event = %item.event_name,
            attempts = item.attempts,
            error = %error,
            "Transport send failed"
        );
    }

    fn drop_item(&self, item: &DispatchItem, reason: &str) {
        self.shared.metrics.inc_dropped_count();
        observability::record_dispatch_dropped(&self.shared.transport_name);
        warn!(
            transport = %self.shared.transport_name,
            event = %item.event_name,
            attempts = item.attempts,
            reason,
            "Event dropped"
        );
    }
}
