//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置与合约冒烟测试
//! - 端到端场景（数据层 -> 处理器 -> 分发队列 -> 传输层）
//! - 启动流程（脚本加载回退、命令缓冲回放）

#[cfg(test)]
mod contract_tests {
    use contracts::RelayConfig;

    #[test]
    fn test_default_config_validates() {
        let config = RelayConfig::new("G-TEST");
        assert!(config_loader::ConfigLoader::validate(&config).is_ok());
        assert_eq!(relay::RELAY_VERSION, contracts::RELAY_VERSION);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use contracts::{Param, RelayConfig, TransportCommand, Value};
    use dispatcher::{FailurePlan, ManualScheduler, RecordingTransport};
    use event_bus::DataLayer;
    use relay::Relay;

    fn event(name: &str) -> Value {
        Value::object([("event", Value::from(name))])
    }

    fn install(
        config: RelayConfig,
        transport: RecordingTransport,
        data_layer: &DataLayer,
    ) -> (Relay<RecordingTransport>, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let relay = Relay::builder(config, transport)
            .scheduler(Arc::new(scheduler.clone()))
            .install(data_layer)
            .unwrap();
        (relay, scheduler)
    }

    fn allowlist(prefixes: &[&str]) -> RelayConfig {
        let mut config = RelayConfig::new("G-TEST");
        config.filters.allowlist_enabled = true;
        config.filters.allowed_event_prefixes = prefixes.iter().map(|p| p.to_string()).collect();
        config
    }

    fn event_params(command: &TransportCommand) -> &contracts::ShapedPayload {
        match command {
            TransportCommand::Event { params, .. } => params,
            other => panic!("expected event command, got {}", other.kind()),
        }
    }

    /// Context from the first event reaches the second one
    ///
    /// 验证完整的数据流：
    /// 1. pageView 写入 page.title 上下文
    /// 2. deposit 合并上下文后被整形
    /// 3. 一次 flush 后两次传输调用
    #[tokio::test]
    async fn test_e2e_context_carried_between_events() {
        let dl = DataLayer::new("dataLayer");
        let record = RecordingTransport::new("rec");
        let (relay, scheduler) = install(allowlist(&["pageView", "deposit"]), record.clone(), &dl);

        dl.push_one(Value::object([
            ("event", Value::from("pageView")),
            ("page.title", Value::from("Home")),
        ]));
        dl.push_one(Value::object([
            ("event", Value::from("deposit")),
            ("value", Value::from(50)),
        ]));

        // Nothing is sent synchronously
        assert!(record.delivered().is_empty());
        scheduler.run_pending().await;

        assert_eq!(record.event_names(), vec!["pageView", "deposit"]);
        let delivered = record.delivered();
        let deposit = event_params(&delivered[1]);
        assert_eq!(deposit.get("value"), Some(&Param::Number(50.0)));
        assert_eq!(deposit.get("send_to"), Some(&Param::Text("G-TEST".into())));
        let bundle = deposit.get("datalayer").and_then(Param::as_text).unwrap();
        assert!(bundle.contains(r#""page.title":"Home""#), "bundle: {bundle}");
        assert!(!bundle.contains("event"));

        let stats = relay.debug().stats;
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.sent, 2);
    }

    #[tokio::test]
    async fn test_e2e_nameless_object_only_updates_context() {
        let dl = DataLayer::new("dataLayer");
        let record = RecordingTransport::new("rec");
        let (relay, scheduler) = install(RelayConfig::new("G-TEST"), record.clone(), &dl);

        dl.push_one(Value::object([("browser.lang", Value::from("en"))]));
        scheduler.run_pending().await;

        assert_eq!(record.attempts(), 0);
        assert_eq!(
            relay.context_snapshot().get("browser.lang"),
            Some(&Value::from("en"))
        );
        assert_eq!(relay.debug().stats.processed, 0);
    }

    #[tokio::test]
    async fn test_e2e_transport_failure_retried_once() {
        let dl = DataLayer::new("dataLayer");
        let record = RecordingTransport::with_plan("rec", FailurePlan::Next(1));
        let (relay, scheduler) = install(RelayConfig::new("G-TEST"), record.clone(), &dl);

        dl.push_one(event("X"));
        scheduler.run_pending().await;

        assert_eq!(record.attempts(), 2);
        assert_eq!(record.event_names(), vec!["X"]);
        assert_eq!(relay.stats().sent(), 1);

        let dispatch = relay.queue().metrics().snapshot();
        assert_eq!(dispatch.retry_count, 1);
        assert_eq!(dispatch.dropped_count, 0);
    }

    #[tokio::test]
    async fn test_e2e_blocked_prefix_beats_allowlist() {
        let dl = DataLayer::new("dataLayer");
        let record = RecordingTransport::new("rec");
        let (relay, scheduler) = install(allowlist(&["gtm.", "pageView"]), record.clone(), &dl);

        dl.push([event("gtm.dom"), event("pageView")]);
        scheduler.run_pending().await;

        assert_eq!(record.event_names(), vec!["pageView"]);
        let stats = relay.debug().stats;
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.not_allowed, 0);
    }

    #[tokio::test]
    async fn test_e2e_empty_allowlist_forwards_nothing() {
        let dl = DataLayer::new("dataLayer");
        let record = RecordingTransport::new("rec");
        let (relay, scheduler) = install(allowlist(&[]), record.clone(), &dl);

        dl.push([event("pageView"), event("deposit")]);
        scheduler.run_pending().await;

        assert!(record.delivered().is_empty());
        assert_eq!(relay.debug().stats.not_allowed, 2);
    }

    #[tokio::test]
    async fn test_e2e_self_reference_serialized() {
        let dl = DataLayer::new("dataLayer");
        let record = RecordingTransport::new("rec");
        let (_relay, scheduler) = install(RelayConfig::new("G-TEST"), record.clone(), &dl);

        let share = event("share");
        share
            .as_object()
            .unwrap()
            .write()
            .unwrap()
            .insert("self".to_string(), share.clone());

        assert_eq!(dl.push_one(share), 1);
        scheduler.run_pending().await;

        let delivered = record.delivered();
        let bundle = event_params(&delivered[0])
            .get("datalayer")
            .and_then(Param::as_text)
            .unwrap()
            .to_string();
        assert!(bundle.contains("[Circular]"), "bundle: {bundle}");
    }

    #[tokio::test]
    async fn test_e2e_preloaded_entries_drained_in_order() {
        let dl = DataLayer::with_entries(
            "dataLayer",
            vec![
                event("first"),
                Value::from("not an object"),
                event("second"),
            ],
        );
        let record = RecordingTransport::new("rec");
        let (relay, scheduler) = install(RelayConfig::new("G-TEST"), record.clone(), &dl);

        let report = relay.intercept_report();
        assert_eq!(report.existing, 3);
        assert_eq!(report.observed, 2);
        assert_eq!(report.failed, 0);

        // Contents survive interception
        assert_eq!(dl.len(), 3);
        assert_eq!(dl.push_one(event("third")), 4);

        scheduler.run_pending().await;
        assert_eq!(record.event_names(), vec!["first", "second", "third"]);
    }
}

#[cfg(test)]
mod bootstrap_tests {
    use std::sync::Arc;

    use bootstrap::{Bootstrap, LoadOutcome, SimulatedScriptLoader};
    use contracts::{RelayConfig, Transport, Value};
    use dispatcher::{ManualScheduler, QueuedTransport, RecordingTransport};
    use event_bus::DataLayer;
    use relay::Relay;

    fn server_config() -> RelayConfig {
        let mut config = RelayConfig::new("G-TEST");
        config.transport_url = Some("https://sgtm.example.com/".to_string());
        config
    }

    #[tokio::test]
    async fn test_library_falls_back_once() {
        let bootstrap = Bootstrap::new(&server_config());
        let primary = bootstrap.sources().primary.clone();
        assert!(primary.starts_with("https://sgtm.example.com/gtag/js?"));

        let loader = SimulatedScriptLoader::new().failing(primary.clone());
        assert_eq!(bootstrap.load_library(&loader).await, LoadOutcome::Fallback);
        assert_eq!(loader.attempts().len(), 2);

        let loader = SimulatedScriptLoader::failing_all();
        assert_eq!(bootstrap.load_library(&loader).await, LoadOutcome::Failed);
        assert_eq!(loader.attempts(), vec![primary, bootstrap.sources().fallback.clone().unwrap()]);
    }

    #[tokio::test]
    async fn test_buffered_commands_replayed_after_load() {
        let config = server_config();
        let bootstrap = Bootstrap::new(&config);

        let mut queued = QueuedTransport::<RecordingTransport>::new(
            config.relay_queue_name.clone(),
            config.dispatch.buffered_commands,
        );
        bootstrap.configure(&mut queued).await.unwrap();
        assert_eq!(queued.name(), "relayDL");

        let dl = DataLayer::new("dataLayer");
        let scheduler = ManualScheduler::new();
        let relay = Relay::builder(config, queued)
            .scheduler(Arc::new(scheduler.clone()))
            .install(&dl)
            .unwrap();

        dl.push_one(Value::object([("event", Value::from("pageView"))]));
        scheduler.run_pending().await;
        assert_eq!(relay.queue().lock_transport().await.buffered(), 3);

        let loader = SimulatedScriptLoader::new();
        assert!(bootstrap.load_library(&loader).await.is_loaded());

        let backend = RecordingTransport::new("library");
        let record = backend.clone();
        assert_eq!(relay.queue().lock_transport().await.attach(backend).await, 3);

        let kinds: Vec<_> = record.delivered().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec!["js", "config", "event"]);
        assert_eq!(record.event_names(), vec!["pageView"]);
    }
}
