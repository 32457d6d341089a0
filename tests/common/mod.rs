//! Common fixtures for orchestrator integration tests

#![allow(dead_code)]

use std::sync::Arc;

use fleetboot::domain::ports::{ExpectedVersion, KeyValueStore, Scheduler};
use fleetboot::infrastructure::memory::{InMemoryScheduler, InMemoryStore};
use fleetboot::{Config, Orchestrator, TemplateSet, WaitPolicies};

pub const MEMBERSHIP_PREFIX: &str = "/_coreos.com/fleet/machines";
pub const DEPLOYED_KEY: &str = "/fleetboot/deployed";

/// Publish a machine object the way a scheduler agent would
pub async fn publish_machine(store: &InMemoryStore, id: &str, ip: &str, role: Option<&str>) {
    let metadata = match role {
        Some(role) => serde_json::json!({"kubernetes_role": role, "region": "us-west"}),
        None => serde_json::json!({}),
    };
    let object = serde_json::json!({
        "ID": id,
        "PublicIP": ip,
        "Metadata": metadata,
        "Version": "0.9.1",
    });
    store
        .put(
            &format!("{MEMBERSHIP_PREFIX}/{id}/object"),
            &object.to_string(),
            ExpectedVersion::Any,
        )
        .await
        .expect("publish machine object");
}

/// Orchestrator over in-memory adapters with millisecond waits
pub fn orchestrator(
    store: &Arc<InMemoryStore>,
    scheduler: &Arc<InMemoryScheduler>,
    policies: &WaitPolicies,
) -> Orchestrator {
    Orchestrator::new(
        Arc::clone(store) as Arc<dyn KeyValueStore>,
        Arc::clone(scheduler) as Arc<dyn Scheduler>,
        TemplateSet::builtin(),
        &Config::default(),
        policies,
    )
}

/// Raw deployment record as stored
pub async fn deployed_record(store: &InMemoryStore) -> Option<String> {
    store
        .get(DEPLOYED_KEY)
        .await
        .expect("read deployment record")
        .map(|v| v.value)
}
