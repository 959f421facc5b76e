//! Per-push pipeline: context, gates, merge, shaping.

use std::sync::Arc;

use contracts::{DispatchItem, ObjectMap, RelayConfig, RelayStats, Value};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::context::ContextStore;
use crate::filter::{EventFilter, Rejection};
use crate::shaper::PayloadShaper;

/// What happened to one observed value
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Not an object
    Ignored,
    /// Object without an event name, only the context was touched
    ContextOnly,
    /// Named event stopped by a gate
    Rejected { name: String, rejection: Rejection },
    /// Ready for the dispatch queue
    Accepted(DispatchItem),
}

/// Event processor
///
/// Owns the filters and the shaper, shares the context store and the
/// statistics with the rest of the relay.
#[derive(Debug)]
pub struct EventProcessor {
    discriminator: String,
    filter: EventFilter,
    shaper: PayloadShaper,
    context: Arc<Mutex<ContextStore>>,
    stats: Arc<RelayStats>,
}

impl EventProcessor {
    pub fn new(
        config: &RelayConfig,
        context: Arc<Mutex<ContextStore>>,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            discriminator: config.params.discriminator.clone(),
            filter: EventFilter::new(&config.filters),
            shaper: PayloadShaper::new(&config.params),
            context,
            stats,
        }
    }

    /// Processor with its own context store and statistics
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config,
            Arc::new(Mutex::new(ContextStore::new(&config.context))),
            Arc::new(RelayStats::new()),
        )
    }

    pub fn context(&self) -> &Arc<Mutex<ContextStore>> {
        &self.context
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Process one pushed value
    pub fn process(&self, value: &Value) -> ProcessOutcome {
        let Value::Object(shared) = value else {
            trace!(kind = value.type_name(), "Ignoring non-object push");
            return ProcessOutcome::Ignored;
        };

        // Copy out of the guard so shaping never re-enters this lock
        let object = match shared.read() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                debug!("Ignoring push whose object lock is poisoned");
                return ProcessOutcome::Ignored;
            }
        };
        self.process_object(&object)
    }

    /// Process one pushed object
    pub fn process_object(&self, object: &ObjectMap) -> ProcessOutcome {
        let mut context = self.context.lock();
        let update = context.update(object);
        observability::record_context_entries(context.len());

        let Some(raw_name) = object.get(&self.discriminator) else {
            debug!(
                written = update.written,
                cleared = update.cleared,
                "Context-only push"
            );
            return ProcessOutcome::ContextOnly;
        };

        self.stats.inc_processed();
        observability::record_event_processed();

        // A non-string name is treated as empty
        let name = raw_name.as_str().map(str::trim).unwrap_or_default();

        if let Err(rejection) = self.filter.check(name) {
            match rejection {
                Rejection::NotAllowed => self.stats.inc_not_allowed(),
                Rejection::EmptyName | Rejection::BlockedPrefix(_) => self.stats.inc_blocked(),
            }
            observability::record_event_blocked(rejection.reason());
            debug!(event = %name, reason = rejection.reason(), "Event rejected");
            return ProcessOutcome::Rejected {
                name: name.to_string(),
                rejection,
            };
        }

        let merged = context.merge_into(object);
        drop(context);

        let payload = self.shaper.shape(&merged);
        debug!(event = %name, params = payload.len(), "Event accepted");
        ProcessOutcome::Accepted(DispatchItem::new(name, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Param, Shared};

    fn config(allowlist: Option<&[&str]>) -> RelayConfig {
        let mut config = RelayConfig::new("G-TEST");
        if let Some(allowed) = allowlist {
            config.filters.allowlist_enabled = true;
            config.filters.allowed_event_prefixes =
                allowed.iter().map(|s| s.to_string()).collect();
        }
        config
    }

    fn accepted(outcome: ProcessOutcome) -> DispatchItem {
        match outcome {
            ProcessOutcome::Accepted(item) => item,
            other => panic!("expected accepted, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_ignored() {
        let processor = EventProcessor::from_config(&config(None));
        assert_eq!(processor.process(&Value::from("pageView")), ProcessOutcome::Ignored);
        assert_eq!(
            processor.process(&Value::array([Value::from("config")])),
            ProcessOutcome::Ignored
        );
        assert_eq!(processor.stats().processed(), 0);
    }

    #[test]
    fn test_nameless_object_updates_context_only() {
        let processor = EventProcessor::from_config(&config(None));
        let outcome = processor.process(&Value::object([("browser.lang", Value::from("en"))]));

        assert_eq!(outcome, ProcessOutcome::ContextOnly);
        assert_eq!(processor.stats().processed(), 0);
        assert_eq!(
            processor.context().lock().get("browser.lang"),
            Some(&Value::from("en"))
        );
    }

    #[test]
    fn test_blocked_prefix_counted_even_with_allowlist() {
        let processor = EventProcessor::from_config(&config(Some(&["gtm."])));
        let outcome = processor.process(&Value::object([("event", Value::from("gtm.load"))]));

        assert!(matches!(
            outcome,
            ProcessOutcome::Rejected {
                rejection: Rejection::BlockedPrefix(_),
                ..
            }
        ));
        let stats = processor.stats().snapshot();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.not_allowed, 0);
    }

    #[test]
    fn test_non_string_name_is_blocked() {
        let processor = EventProcessor::from_config(&config(None));
        let outcome = processor.process(&Value::object([("event", Value::from(5))]));
        assert!(matches!(
            outcome,
            ProcessOutcome::Rejected {
                rejection: Rejection::EmptyName,
                ..
            }
        ));
        assert_eq!(processor.stats().blocked(), 1);
    }

    #[test]
    fn test_not_allowed_counted() {
        let processor = EventProcessor::from_config(&config(Some(&["deposit"])));
        processor.process(&Value::object([("event", Value::from("withdraw"))]));
        assert_eq!(processor.stats().not_allowed(), 1);
        assert_eq!(processor.stats().blocked(), 0);
    }

    #[test]
    fn test_name_trimmed_and_context_merged() {
        let processor = EventProcessor::from_config(&config(None));
        processor.process(&Value::object([("page.title", Value::from("Home"))]));

        let item = accepted(processor.process(&Value::object([
            ("event", Value::from("  deposit ")),
            ("value", Value::from(50)),
        ])));

        assert_eq!(item.event_name, "deposit");
        assert_eq!(item.attempts, 0);
        assert_eq!(item.payload.get("value"), Some(&Param::Number(50.0)));
        assert_eq!(
            item.payload.get("datalayer"),
            Some(&Param::Text(r#"{"page.title":"Home"}"#.into()))
        );
    }

    #[test]
    fn test_rejected_event_still_updates_context() {
        let processor = EventProcessor::from_config(&config(None));
        processor.process(&Value::object([
            ("event", Value::from("gtm.dom")),
            ("user.id", Value::from("42")),
        ]));
        assert_eq!(processor.context().lock().len(), 1);
    }

    #[test]
    fn test_self_referencing_event() {
        let processor = EventProcessor::from_config(&config(None));
        let event = Shared::new(ObjectMap::new());
        {
            let mut guard = event.write().unwrap();
            guard.insert("event".into(), Value::from("loop"));
            guard.insert("me".into(), Value::Object(event.clone()));
        }

        let item = accepted(processor.process(&Value::Object(event)));
        let bundle = item.payload.get("datalayer").and_then(Param::as_text).unwrap();
        assert!(bundle.contains("[Circular]"));
    }

    #[test]
    fn test_shared_stats_and_context() {
        let config = config(None);
        let stats = Arc::new(RelayStats::new());
        let context = Arc::new(Mutex::new(ContextStore::new(&config.context)));
        let processor = EventProcessor::new(&config, context.clone(), stats.clone());

        processor.process(&Value::object([
            ("event", Value::from("pageView")),
            ("page.path", Value::from("/")),
        ]));
        assert_eq!(stats.processed(), 1);
        assert_eq!(context.lock().len(), 1);
    }
}
