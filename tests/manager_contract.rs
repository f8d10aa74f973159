//! End-to-end lifecycle contract of the flow-rule manager: north-facing
//! staging, south-facing confirmation, event emission, and provider
//! registration, exercised through the public API only.

use async_trait::async_trait;
use flowplane::{
    ApplicationId, ApplicationRegistry, Device, DeviceId, DeviceKind, DeviceService, FlowRule,
    FlowRuleError, FlowRuleEvent, FlowRuleEventType, FlowRuleListener, FlowRuleManager,
    FlowRuleProvider, FlowRuleProviderService, FlowRuleState, MastershipRole, ProviderId,
    TrafficSelector, TrafficTreatment,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct AllMasterDeviceService;

#[async_trait]
impl DeviceService for AllMasterDeviceService {
    async fn get_device(&self, id: &DeviceId) -> Option<Device> {
        Some(Device {
            id: id.clone(),
            kind: DeviceKind::Switch,
        })
    }

    async fn is_available(&self, _id: &DeviceId) -> bool {
        true
    }

    async fn get_role(&self, _id: &DeviceId) -> MastershipRole {
        MastershipRole::Master
    }
}

#[derive(Default)]
struct RecordingProvider {
    applied: Mutex<Vec<FlowRule>>,
    removed: Mutex<Vec<FlowRule>>,
}

#[async_trait]
impl FlowRuleProvider for RecordingProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("of", "test.provider")
    }

    async fn apply_flow_rule(&self, rules: &[FlowRule]) -> Result<(), FlowRuleError> {
        self.applied
            .lock()
            .expect("lock applied")
            .extend_from_slice(rules);
        Ok(())
    }

    async fn remove_flow_rule(&self, rules: &[FlowRule]) -> Result<(), FlowRuleError> {
        self.removed
            .lock()
            .expect("lock removed")
            .extend_from_slice(rules);
        Ok(())
    }

    async fn remove_rules_by_id(
        &self,
        _app_id: &ApplicationId,
        rules: &[FlowRule],
    ) -> Result<(), FlowRuleError> {
        self.removed
            .lock()
            .expect("lock removed")
            .extend_from_slice(rules);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<FlowRuleEvent>>,
}

impl RecordingListener {
    fn types(&self) -> Vec<FlowRuleEventType> {
        self.events
            .lock()
            .expect("lock events")
            .iter()
            .map(FlowRuleEvent::event_type)
            .collect()
    }

    fn count_of(&self, event_type: FlowRuleEventType) -> usize {
        self.types().iter().filter(|t| **t == event_type).count()
    }
}

#[async_trait]
impl FlowRuleListener for RecordingListener {
    async fn event(&self, event: FlowRuleEvent) {
        self.events.lock().expect("lock events").push(event);
    }
}

struct Fixture {
    manager: FlowRuleManager,
    provider: Arc<RecordingProvider>,
    service: FlowRuleProviderService,
    listener: Arc<RecordingListener>,
    app: ApplicationId,
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn fixture() -> Fixture {
    init_logging();
    let manager = FlowRuleManager::new(
        "contract",
        16,
        Arc::new(AllMasterDeviceService),
        ApplicationRegistry::new(),
    );
    let provider = Arc::new(RecordingProvider::default());
    let service = manager
        .register_provider(provider.clone())
        .await
        .expect("register provider");
    let listener = Arc::new(RecordingListener::default());
    manager.add_listener(listener.clone());
    let app = manager.register_application("contract-test");

    Fixture {
        manager,
        provider,
        service,
        listener,
        app,
    }
}

fn device() -> DeviceId {
    DeviceId::new("of:0000000000000001")
}

fn flow(app: &ApplicationId, port: u32) -> FlowRule {
    FlowRule::new(
        device(),
        TrafficSelector::matching([format!("in_port={port}")]),
        TrafficTreatment::acting(["output=controller"]),
        10,
        app.clone(),
    )
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within timeout");
}

#[tokio::test(flavor = "multi_thread")]
async fn south_reports_deduplicate_by_identity() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);
    let f2 = flow(&fx.app, 2);

    assert!(fx.manager.get_flow_entries(&device()).await.is_empty());

    fx.service.flow_added(f1.clone()).await.expect("add f1");
    fx.service.flow_added(f2.clone()).await.expect("add f2");
    // Same identity again: a refresh, never a third entry.
    fx.service.flow_added(f1.clone()).await.expect("re-add f1");
    fx.manager.flush_events().await.expect("flush");

    let entries = fx.manager.get_flow_entries(&device()).await;
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|rule| rule.state() == FlowRuleState::Added));

    assert_eq!(
        fx.listener.types(),
        vec![
            FlowRuleEventType::RuleAdded,
            FlowRuleEventType::RuleAdded,
            FlowRuleEventType::RuleUpdated,
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn north_apply_stages_pending_add_without_events() {
    let fx = fixture().await;

    fx.manager
        .apply_flow_rules([flow(&fx.app, 1), flow(&fx.app, 2), flow(&fx.app, 3)])
        .await;
    fx.manager.flush_events().await.expect("flush");

    let entries = fx.manager.get_flow_entries(&device()).await;
    assert_eq!(entries.len(), 3);
    assert!(entries
        .iter()
        .all(|rule| rule.state() == FlowRuleState::PendingAdd));
    assert!(fx.listener.types().is_empty());

    wait_until(|| fx.provider.applied.lock().expect("lock").len() == 3).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn north_remove_stages_pending_remove_without_events() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);
    let f2 = flow(&fx.app, 2);
    let f3 = flow(&fx.app, 3);

    fx.service.flow_added(f1.clone()).await.expect("add f1");
    fx.service.flow_added(f2.clone()).await.expect("add f2");
    fx.service.flow_added(f3.clone()).await.expect("add f3");
    fx.manager.flush_events().await.expect("flush");
    let events_before = fx.listener.types().len();

    fx.manager
        .remove_flow_rules([f1.clone(), f3.clone()])
        .await;
    fx.manager.flush_events().await.expect("flush");

    // Entries stay in the store until the device confirms eviction.
    let entries = fx.manager.get_flow_entries(&device()).await;
    assert_eq!(entries.len(), 3);
    let state_of = |rule: &FlowRule| {
        entries
            .iter()
            .find(|e| e.id() == rule.id())
            .map(FlowRule::state)
    };
    assert_eq!(state_of(&f1), Some(FlowRuleState::PendingRemove));
    assert_eq!(state_of(&f2), Some(FlowRuleState::Added));
    assert_eq!(state_of(&f3), Some(FlowRuleState::PendingRemove));
    assert_eq!(fx.listener.types().len(), events_before);

    wait_until(|| fx.provider.removed.lock().expect("lock").len() == 2).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn south_confirmed_removal_is_idempotent() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);

    fx.service.flow_added(f1.clone()).await.expect("add f1");
    fx.manager.remove_flow_rules([f1.clone()]).await;

    fx.service.flow_removed(f1.clone()).await.expect("remove");
    fx.service
        .flow_removed(f1.clone())
        .await
        .expect("repeat remove");
    fx.manager.flush_events().await.expect("flush");

    assert!(fx.manager.get_flow_entries(&device()).await.is_empty());
    assert_eq!(fx.listener.count_of(FlowRuleEventType::RuleRemoved), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn metrics_confirm_pending_adds() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);
    let f2 = flow(&fx.app, 2);

    fx.manager.apply_flow_rules([f1.clone(), f2.clone()]).await;

    let report = fx
        .service
        .push_flow_metrics(
            device(),
            vec![
                f1.clone().with_counters(5, 500, 1),
                f2.clone().with_counters(3, 300, 1),
            ],
        )
        .await
        .expect("push metrics");
    fx.manager.flush_events().await.expect("flush");

    assert!(report.is_converged());
    let entries = fx.manager.get_flow_entries(&device()).await;
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|rule| rule.state() == FlowRuleState::Added));
    let counted = entries.iter().find(|e| e.id() == f1.id()).expect("f1");
    assert_eq!(counted.packets(), 5);
    assert_eq!(fx.listener.count_of(FlowRuleEventType::RuleAdded), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn metrics_evict_unreported_pending_removes_and_flag_discrepancies() {
    let fx = fixture().await;
    let confirmed = flow(&fx.app, 1);
    let leaving = flow(&fx.app, 2);
    let vanished = flow(&fx.app, 3);
    let rogue = flow(&fx.app, 9);

    fx.service
        .flow_added(confirmed.clone())
        .await
        .expect("add confirmed");
    fx.service
        .flow_added(leaving.clone())
        .await
        .expect("add leaving");
    fx.service
        .flow_added(vanished.clone())
        .await
        .expect("add vanished");
    fx.manager.remove_flow_rules([leaving.clone()]).await;

    let report = fx
        .service
        .push_flow_metrics(device(), vec![confirmed.clone(), rogue.clone()])
        .await
        .expect("push metrics");
    fx.manager.flush_events().await.expect("flush");

    // The pending remove is treated as device-confirmed and evicted.
    let entries = fx.manager.get_flow_entries(&device()).await;
    assert!(entries.iter().all(|e| e.id() != leaving.id()));
    assert_eq!(fx.listener.count_of(FlowRuleEventType::RuleRemoved), 1);

    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].id(), vanished.id());
    assert_eq!(report.extraneous.len(), 1);
    assert_eq!(report.extraneous[0].id(), rogue.id());
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_add_for_pending_remove_restores_the_rule() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);

    fx.service.flow_added(f1.clone()).await.expect("add f1");
    fx.manager.remove_flow_rules([f1.clone()]).await;

    fx.service.flow_added(f1.clone()).await.expect("re-add f1");
    fx.manager.flush_events().await.expect("flush");

    let entries = fx.manager.get_flow_entries(&device()).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].state(), FlowRuleState::Added);
    assert_eq!(
        fx.listener.types(),
        vec![FlowRuleEventType::RuleAdded, FlowRuleEventType::RuleUpdated]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_report_leaves_confirmed_rules_untouched() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);

    fx.service.flow_added(f1.clone()).await.expect("add f1");
    fx.service.flow_failed(f1.clone()).await.expect("fail f1");
    fx.manager.flush_events().await.expect("flush");

    let entries = fx.manager.get_flow_entries(&device()).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].state(), FlowRuleState::Added);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_south_reports_preserve_per_identity_event_order() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);

    let service = Arc::new(fx.service);
    let mut reports = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        let rule = f1.clone();
        reports.push(tokio::spawn(async move {
            service.flow_added(rule).await.expect("flow added");
        }));
    }
    for report in reports {
        report.await.expect("report task");
    }
    fx.manager.flush_events().await.expect("flush");

    // The confirming transition must be the first event delivered; every
    // later report of the same identity is a refresh.
    let types = fx.listener.types();
    assert_eq!(types.len(), 16);
    assert_eq!(types[0], FlowRuleEventType::RuleAdded);
    assert_eq!(fx.listener.count_of(FlowRuleEventType::RuleAdded), 1);
    assert_eq!(fx.listener.count_of(FlowRuleEventType::RuleUpdated), 15);
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_report_marks_rule_failed_without_event() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);

    fx.manager.apply_flow_rules([f1.clone()]).await;
    fx.service.flow_failed(f1.clone()).await.expect("fail f1");
    fx.manager.flush_events().await.expect("flush");

    let entries = fx.manager.get_flow_entries(&device()).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].state(), FlowRuleState::Failed);
    assert!(fx.listener.types().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unregistered_provider_service_is_rejected() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);

    fx.manager.unregister_provider(&fx.provider.id()).await;
    assert!(fx.manager.providers().await.is_empty());

    let result = fx.service.flow_added(f1.clone()).await;
    assert!(matches!(
        result,
        Err(FlowRuleError::StaleProviderService(id)) if id == fx.provider.id()
    ));
    assert!(fx.manager.get_flow_entries(&device()).await.is_empty());

    let metrics = fx.service.push_flow_metrics(device(), vec![f1]).await;
    assert!(matches!(
        metrics,
        Err(FlowRuleError::StaleProviderService(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_provider_registration_is_rejected() {
    let fx = fixture().await;

    let second = fx
        .manager
        .register_provider(Arc::new(RecordingProvider::default()))
        .await;
    assert!(matches!(
        second,
        Err(FlowRuleError::DuplicateProvider(id)) if id == fx.provider.id()
    ));
    assert_eq!(fx.manager.providers().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn listeners_added_after_an_event_never_see_it() {
    let fx = fixture().await;
    let f1 = flow(&fx.app, 1);
    let f2 = flow(&fx.app, 2);

    fx.service.flow_added(f1).await.expect("add f1");
    fx.manager.flush_events().await.expect("flush");

    let late = Arc::new(RecordingListener::default());
    fx.manager.add_listener(late.clone());

    fx.service.flow_added(f2).await.expect("add f2");
    fx.manager.flush_events().await.expect("flush");

    assert_eq!(late.types(), vec![FlowRuleEventType::RuleAdded]);
    assert_eq!(fx.listener.types().len(), 2);
}
