//! End-to-end orchestrator scenarios over the in-memory store and scheduler

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use common::{deployed_record, orchestrator, publish_machine, DEPLOYED_KEY};
use fleetboot::domain::models::{ActiveState, SubState, UnitState};
use fleetboot::domain::ports::{
    ExpectedVersion, KeyValueStore, StoreError, StoreNode, VersionedValue,
};
use fleetboot::infrastructure::memory::{InMemoryScheduler, InMemoryStore};
use fleetboot::services::{DeploymentTracker, MachineOutcome, RetryPolicy, WaitPolicies};
use fleetboot::{DomainError, UnitGroup};

#[tokio::test]
async fn test_worker_bootstrap_from_unassigned() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(InMemoryScheduler::converging());
    publish_machine(&store, "a", "10.0.0.5", None).await;

    let publisher = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            publish_machine(&store, "a", "10.0.0.5", Some("minion")).await;
        })
    };

    let policies = WaitPolicies::immediate(1_000);
    let report = orchestrator(&store, &scheduler, &policies)
        .run()
        .await
        .expect("bootstrap pass");
    publisher.await.unwrap();

    assert_eq!(report.outcome_of("a"), Some(MachineOutcome::Deployed));
    assert_eq!(
        scheduler.units(),
        vec![
            "minion-download-kubernetes@a.service",
            "minion-kubelet@a.service",
            "minion-proxy@a.service",
        ]
    );
    assert_eq!(deployed_record(&store).await.as_deref(), Some(r#"["a"]"#));

    assert_eq!(report.convergence.len(), 2);
    assert_eq!(report.convergence[0].group, UnitGroup::Download);
    assert_eq!(report.convergence[0].converged, 1);
    assert_eq!(report.convergence[1].group, UnitGroup::Role);
    assert_eq!(report.convergence[1].converged, 2);
}

#[tokio::test]
async fn test_rendered_units_carry_machine_address() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(InMemoryScheduler::converging());
    publish_machine(&store, "cp1", "10.0.0.1", Some("master")).await;

    let policies = WaitPolicies::immediate(5);
    let orchestrator = orchestrator(&store, &scheduler, &policies);
    let record = orchestrator.watcher().await_role("cp1").await.unwrap();
    let units = orchestrator.renderer().render(&record);

    assert_eq!(units.len(), 4);
    for unit in &units {
        let content = unit.content_str();
        assert!(!content.contains("<ID>"), "{} kept the ID token", unit.name);
        assert!(!content.contains("<IP_ADDR>"), "{} kept the address token", unit.name);
    }
}

#[tokio::test]
async fn test_repeated_runs_are_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(InMemoryScheduler::converging());
    publish_machine(&store, "m1", "10.0.0.1", Some("master")).await;
    publish_machine(&store, "w1", "10.0.0.2", Some("minion")).await;

    let policies = WaitPolicies::immediate(5);
    let orchestrator = orchestrator(&store, &scheduler, &policies);

    let first = orchestrator.run().await.unwrap();
    assert_eq!(first.count(MachineOutcome::Deployed), 2);
    let submissions = scheduler.submissions();
    let record = deployed_record(&store).await;

    let second = orchestrator.run().await.unwrap();
    assert_eq!(second.count(MachineOutcome::AlreadyDeployed), 2);
    assert_eq!(second.count(MachineOutcome::Deployed), 0);
    assert_eq!(scheduler.submissions(), submissions);
    assert_eq!(deployed_record(&store).await, record);
    assert_eq!(record.as_deref(), Some(r#"["m1","w1"]"#));
}

#[tokio::test]
async fn test_recorded_machine_still_polled_for_convergence() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(InMemoryScheduler::new());
    publish_machine(&store, "w1", "10.0.0.2", Some("minion")).await;
    store
        .put(DEPLOYED_KEY, r#"["w1"]"#, ExpectedVersion::Any)
        .await
        .unwrap();

    let running = |name: &str, sub: SubState| UnitState {
        unit_name: name.to_string(),
        machine_id: "w1".to_string(),
        active_state: ActiveState::Active,
        sub_state: sub,
        load_state: Some("loaded".to_string()),
        hash: None,
    };
    scheduler.push_states(vec![
        running("minion-download-kubernetes@w1.service", SubState::Exited),
        running("minion-kubelet@w1.service", SubState::Running),
        running("minion-proxy@w1.service", SubState::Running),
    ]);

    let policies = WaitPolicies::immediate(5);
    let report = orchestrator(&store, &scheduler, &policies).run().await.unwrap();

    assert_eq!(report.outcome_of("w1"), Some(MachineOutcome::AlreadyDeployed));
    assert!(scheduler.submissions().is_empty());
    assert_eq!(report.convergence[0].polls, 1);
    assert_eq!(report.convergence[1].polls, 1);
}

#[tokio::test]
async fn test_convergence_timeout_surfaces_counts() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(InMemoryScheduler::new());
    publish_machine(&store, "w1", "10.0.0.2", Some("minion")).await;

    let policies = WaitPolicies::immediate(3);
    let err = orchestrator(&store, &scheduler, &policies)
        .run()
        .await
        .unwrap_err();

    match err {
        DomainError::ConvergenceTimeout {
            converged,
            expected,
            polls,
        } => {
            assert_eq!(converged, 0);
            assert_eq!(expected, 1);
            assert_eq!(polls, 3);
        }
        other => panic!("expected ConvergenceTimeout, got {other:?}"),
    }
    // Units were accepted and recorded before the wait gave up
    assert_eq!(deployed_record(&store).await.as_deref(), Some(r#"["w1"]"#));
}

#[tokio::test]
async fn test_transient_store_outage_is_retried() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(InMemoryScheduler::converging());
    publish_machine(&store, "w1", "10.0.0.2", Some("minion")).await;
    store.inject_outages(2);

    let policies = WaitPolicies::immediate(5);
    let report = orchestrator(&store, &scheduler, &policies).run().await.unwrap();
    assert_eq!(report.outcome_of("w1"), Some(MachineOutcome::Deployed));
}

#[tokio::test]
async fn test_rejected_submission_is_resubmitted() {
    let store = Arc::new(InMemoryStore::new());
    let scheduler = Arc::new(InMemoryScheduler::converging());
    publish_machine(&store, "w1", "10.0.0.2", Some("minion")).await;
    scheduler.reject_next(2);

    let policies = WaitPolicies::immediate(5);
    orchestrator(&store, &scheduler, &policies).run().await.unwrap();

    assert_eq!(scheduler.submissions().len(), 5);
    assert_eq!(scheduler.units().len(), 3);
}

/// Store wrapper that holds the first `gated` reads of the deployment record
/// until that many readers have arrived
struct BarrierStore {
    inner: InMemoryStore,
    barrier: Barrier,
    gated: usize,
    arrivals: AtomicUsize,
}

impl BarrierStore {
    fn new(gated: usize) -> Self {
        Self {
            inner: InMemoryStore::new(),
            barrier: Barrier::new(gated),
            gated,
            arrivals: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KeyValueStore for BarrierStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        let value = self.inner.get(key).await?;
        if key == DEPLOYED_KEY && self.arrivals.fetch_add(1, Ordering::SeqCst) < self.gated {
            self.barrier.wait().await;
        }
        Ok(value)
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        self.inner.put(key, value, expected).await
    }

    async fn list(&self, dir: &str) -> Result<Vec<StoreNode>, StoreError> {
        self.inner.list(dir).await
    }
}

#[tokio::test]
async fn test_concurrent_mark_deployed_keeps_both_ids() {
    let store = Arc::new(BarrierStore::new(2));
    let tracker = |store: &Arc<BarrierStore>| {
        DeploymentTracker::new(
            Arc::clone(store) as Arc<dyn KeyValueStore>,
            DEPLOYED_KEY,
            RetryPolicy::no_retry(),
            RetryPolicy::fixed(Duration::ZERO).with_max_attempts(Some(5)),
        )
    };
    let first = tracker(&store);
    let second = tracker(&store);

    let (a, b) = tokio::join!(first.mark_deployed("a"), second.mark_deployed("b"));
    a.unwrap();
    b.unwrap();

    let mut ids = first.deployed_ids().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_conflict_retries_exhaust() {
    let store = Arc::new(InMemoryStore::new());
    store.inject_conflicts(10);
    let tracker = DeploymentTracker::new(
        Arc::clone(&store) as Arc<dyn KeyValueStore>,
        DEPLOYED_KEY,
        RetryPolicy::no_retry(),
        RetryPolicy::fixed(Duration::ZERO).with_max_attempts(Some(3)),
    );

    let err = tracker.mark_deployed("a").await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::ConflictRetriesExhausted { attempts: 3, .. }
    ));
    assert!(deployed_record(&store).await.is_none());
}
