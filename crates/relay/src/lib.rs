//! # Relay
//!
//! Wires the data layer, the event processor and the dispatch queue
//! together.
//!
//! ## Usage Example
//!
//! ```ignore
//! use relay::Relay;
//!
//! let data_layer = DataLayer::new("dataLayer");
//! let relay = Relay::builder(config, transport).install(&data_layer)?;
//!
//! data_layer.push_one(event);
//! relay.settle().await;
//! println!("{:?}", relay.debug());
//! ```

mod error;

use std::sync::Arc;

use contracts::{ContractError, ObjectMap, RelayConfig, RelayStats, StatsSnapshot, Transport, Value};
use dispatcher::{DispatchQueue, FlushReport, IdleScheduler, Scheduler};
use event_bus::{DataLayer, InterceptReport, PushObserver};
use parking_lot::Mutex;
use relay_engine::{ContextStore, EventProcessor, ProcessOutcome};
use serde::Serialize;
use tracing::{debug, info, instrument};

pub use contracts::RELAY_VERSION;
pub use error::{RelayError, Result};

/// Read-only view for the debug surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayDebugInfo {
    pub version: String,
    pub stats: StatsSnapshot,
    pub context_entries: usize,
    pub pending: usize,
}

/// Observer installed on the data layer
///
/// Runs the processor synchronously and hands accepted events to the queue.
pub struct RelayObserver<T> {
    processor: EventProcessor,
    queue: DispatchQueue<T>,
}

impl<T: Transport + Send + 'static> RelayObserver<T> {
    pub fn new(processor: EventProcessor, queue: DispatchQueue<T>) -> Self {
        Self { processor, queue }
    }
}

impl<T: Transport + Send + 'static> PushObserver for RelayObserver<T> {
    fn observe(&self, value: &Value) -> std::result::Result<(), ContractError> {
        if let ProcessOutcome::Accepted(item) = self.processor.process(value) {
            self.queue.enqueue(item);
        }
        Ok(())
    }
}

/// Builder for installing a relay
pub struct RelayBuilder<T> {
    config: RelayConfig,
    transport: T,
    scheduler: Arc<dyn Scheduler>,
}

impl<T: Transport + Send + 'static> RelayBuilder<T> {
    pub fn new(config: RelayConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            scheduler: Arc::new(IdleScheduler),
        }
    }

    /// Replace the flush scheduler
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Validate the config and intercept the data layer
    #[instrument(name = "relay_install", skip(self, data_layer), fields(data_layer = data_layer.name()))]
    pub fn install(self, data_layer: &DataLayer) -> Result<Relay<T>> {
        config_loader::ConfigLoader::validate(&self.config)?;

        let stats = Arc::new(RelayStats::new());
        let context = Arc::new(Mutex::new(ContextStore::new(&self.config.context)));
        let processor = EventProcessor::new(&self.config, context.clone(), stats.clone());
        let queue = DispatchQueue::builder(self.transport)
            .with_config(&self.config)
            .scheduler(self.scheduler)
            .stats(stats.clone())
            .build();

        log_banner(&self.config);

        let observer = Arc::new(RelayObserver::new(processor, queue.clone()));
        let intercept = data_layer.intercept(observer)?;

        Ok(Relay {
            data_layer: data_layer.clone(),
            queue,
            context,
            stats,
            intercept,
        })
    }
}

fn log_banner(config: &RelayConfig) {
    info!(
        version = RELAY_VERSION,
        measurement_id = %config.measurement_id,
        transport_url = ?config.normalized_transport_url(),
        allowlist_enabled = config.filters.allowlist_enabled,
        "DataLayer relay installed"
    );
    debug!(
        blocked_prefixes = ?config.filters.blocked_event_prefixes,
        allowed_prefixes = ?config.filters.allowed_event_prefixes,
        sticky_prefixes = ?config.context.sticky_prefixes,
        max_entries = config.context.max_entries,
        ttl_secs = config.context.ttl_secs,
        "Relay filters"
    );
}

/// An installed relay
pub struct Relay<T> {
    data_layer: DataLayer,
    queue: DispatchQueue<T>,
    context: Arc<Mutex<ContextStore>>,
    stats: Arc<RelayStats>,
    intercept: InterceptReport,
}

impl<T: Transport + Send + 'static> Relay<T> {
    pub fn builder(config: RelayConfig, transport: T) -> RelayBuilder<T> {
        RelayBuilder::new(config, transport)
    }

    /// Install with the default idle scheduler
    pub fn install(config: RelayConfig, transport: T, data_layer: &DataLayer) -> Result<Self> {
        RelayBuilder::new(config, transport).install(data_layer)
    }

    pub fn data_layer(&self) -> &DataLayer {
        &self.data_layer
    }

    pub fn queue(&self) -> &DispatchQueue<T> {
        &self.queue
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// What happened to entries pushed before installation
    pub fn intercept_report(&self) -> InterceptReport {
        self.intercept
    }

    pub fn context_snapshot(&self) -> ObjectMap {
        self.context.lock().snapshot()
    }

    pub fn debug(&self) -> RelayDebugInfo {
        RelayDebugInfo {
            version: RELAY_VERSION.to_string(),
            stats: self.stats.snapshot(),
            context_entries: self.context.lock().len(),
            pending: self.queue.pending_len(),
        }
    }

    /// Run a flush pass now
    pub async fn flush(&self) -> FlushReport {
        self.queue.flush().await
    }

    /// Wait until every accepted event has been delivered or dropped
    pub async fn settle(&self) {
        self.queue.settle().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher::{FailurePlan, ManualScheduler, RecordingTransport};

    fn event(name: &str) -> Value {
        Value::object([("event", Value::from(name))])
    }

    fn install(
        config: RelayConfig,
        data_layer: &DataLayer,
    ) -> (Relay<RecordingTransport>, RecordingTransport, ManualScheduler) {
        let transport = RecordingTransport::new("rec");
        let record = transport.clone();
        let scheduler = ManualScheduler::new();
        let relay = Relay::builder(config, transport)
            .scheduler(Arc::new(scheduler.clone()))
            .install(data_layer)
            .unwrap();
        (relay, record, scheduler)
    }

    #[tokio::test]
    async fn test_push_to_transport() {
        let dl = DataLayer::new("dataLayer");
        let (relay, record, scheduler) = install(RelayConfig::new("G-TEST"), &dl);

        assert_eq!(dl.push_one(event("pageView")), 1);
        assert!(record.delivered().is_empty());
        assert_eq!(relay.debug().pending, 1);

        scheduler.run_pending().await;
        assert_eq!(record.event_names(), vec!["pageView"]);
        assert_eq!(relay.debug().stats.sent, 1);
    }

    #[tokio::test]
    async fn test_preloaded_entries_processed() {
        let dl = DataLayer::with_entries(
            "dataLayer",
            vec![
                Value::object([("user.id", Value::from("42"))]),
                event("gtm.js"),
                event("pageView"),
            ],
        );
        let (relay, record, scheduler) = install(RelayConfig::new("G-TEST"), &dl);

        assert_eq!(relay.intercept_report().observed, 3);
        scheduler.run_pending().await;
        assert_eq!(record.event_names(), vec!["pageView"]);

        let info = relay.debug();
        assert_eq!(info.stats.processed, 2);
        assert_eq!(info.stats.blocked, 1);
        assert_eq!(info.context_entries, 1);
        assert_eq!(info.version, RELAY_VERSION);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let dl = DataLayer::new("dataLayer");
        let result = Relay::builder(RelayConfig::new(""), RecordingTransport::new("rec"))
            .scheduler(Arc::new(ManualScheduler::new()))
            .install(&dl);
        assert!(matches!(result, Err(RelayError::Config(_))));
        assert!(!dl.is_intercepted());
    }

    #[tokio::test]
    async fn test_second_install_rejected() {
        let dl = DataLayer::new("dataLayer");
        let (_relay, _record, _scheduler) = install(RelayConfig::new("G-TEST"), &dl);

        let again = Relay::builder(RelayConfig::new("G-TEST"), RecordingTransport::new("rec"))
            .scheduler(Arc::new(ManualScheduler::new()))
            .install(&dl);
        assert!(matches!(again, Err(RelayError::EventBus(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_reach_producer() {
        let dl = DataLayer::new("dataLayer");
        let transport = RecordingTransport::with_plan("rec", FailurePlan::Always);
        let relay = Relay::builder(RelayConfig::new("G-TEST"), transport)
            .scheduler(Arc::new(ManualScheduler::new()))
            .install(&dl)
            .unwrap();

        assert_eq!(dl.push_one(event("deposit")), 1);
        let report = relay.flush().await;
        assert_eq!(report.dropped, 1);
        assert_eq!(relay.stats().sent(), 0);
    }

    #[tokio::test]
    async fn test_settle_with_idle_scheduler() {
        let dl = DataLayer::new("dataLayer");
        let transport = RecordingTransport::new("rec");
        let record = transport.clone();
        let relay = Relay::install(RelayConfig::new("G-TEST"), transport, &dl).unwrap();

        dl.push([event("a"), event("b")]);
        relay.settle().await;
        assert_eq!(record.event_names(), vec!["a", "b"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_synchronous_burst_is_one_flush_on_multi_thread() {
        let dl = DataLayer::new("dataLayer");
        let transport = RecordingTransport::new("rec");
        let record = transport.clone();
        let relay = Relay::install(RelayConfig::new("G-TEST"), transport, &dl).unwrap();

        for i in 0..200 {
            dl.push_one(event(&format!("burst{i}")));
        }
        relay.settle().await;

        assert_eq!(relay.queue().metrics().flush_count(), 1);
        assert_eq!(record.delivered().len(), 200);
        assert_eq!(relay.stats().sent(), 200);
    }
}
