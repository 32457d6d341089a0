//! Durable, compare-and-swap guarded ledger of deployed machines.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DeploymentRecord;
use crate::domain::ports::{ExpectedVersion, KeyValueStore, StoreError};
use crate::services::retry::RetryPolicy;

/// Tracks which machines already had their units submitted
pub struct DeploymentTracker {
    store: Arc<dyn KeyValueStore>,
    key: String,
    transient: RetryPolicy,
    conflict: RetryPolicy,
}

impl DeploymentTracker {
    /// Create a tracker over one store key.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the record
    /// * `key` - Key of the JSON array of deployed IDs
    /// * `transient` - Retry policy for unavailable-store errors
    /// * `conflict` - Retry policy for compare-and-swap conflicts
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        transient: RetryPolicy,
        conflict: RetryPolicy,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            transient,
            conflict,
        }
    }

    /// Current record and the precondition a replacing write must carry
    async fn read(&self) -> DomainResult<(DeploymentRecord, ExpectedVersion)> {
        let current = self
            .transient
            .execute(|| self.store.get(&self.key))
            .await?;

        match current {
            None => Ok((DeploymentRecord::new(), ExpectedVersion::Absent)),
            Some(versioned) => {
                let record = DeploymentRecord::from_json(&versioned.value)
                    .map_err(StoreError::from)?;
                Ok((record, ExpectedVersion::Exactly(versioned.version)))
            }
        }
    }

    /// All deployed machine IDs, in deployment order
    pub async fn deployed_ids(&self) -> DomainResult<Vec<String>> {
        let (record, _) = self.read().await?;
        Ok(record.machine_ids().to_vec())
    }

    /// False when the record is absent or does not list the machine
    pub async fn is_deployed(&self, machine_id: &str) -> DomainResult<bool> {
        let (record, _) = self.read().await?;
        Ok(record.contains(machine_id))
    }

    /// Add a machine to the record.
    ///
    /// Read, add if absent, then write conditioned on the version read. A
    /// version conflict means another writer got in between, so re-read and
    /// try again.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn mark_deployed(&self, machine_id: &str) -> DomainResult<()> {
        let mut attempts = self.conflict.start();

        loop {
            let (mut record, expected) = self.read().await?;
            if !record.insert(machine_id) {
                debug!(machine_id, "machine already recorded as deployed");
                return Ok(());
            }

            let value = record.to_json().map_err(StoreError::from)?;
            let write = self
                .transient
                .execute(|| self.store.put(&self.key, &value, expected))
                .await;

            match write {
                Ok(version) => {
                    info!(machine_id, version, deployed = record.len(), "marked machine deployed");
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(machine_id, %expected, "deployment record changed concurrently, re-reading");
                    if !attempts.wait().await {
                        return Err(DomainError::ConflictRetriesExhausted {
                            machine_id: machine_id.to_string(),
                            attempts: attempts.count(),
                        });
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryStore;

    fn tracker(store: Arc<InMemoryStore>) -> DeploymentTracker {
        DeploymentTracker::new(
            store,
            "/fleetboot/deployed",
            RetryPolicy::no_retry(),
            RetryPolicy::fixed(std::time::Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_absent_record_is_not_deployed() {
        let tracker = tracker(Arc::new(InMemoryStore::new()));
        assert!(!tracker.is_deployed("a").await.unwrap());
        assert!(tracker.deployed_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_record_is_replaced_conditionally() {
        let store = Arc::new(InMemoryStore::new());
        let version = store
            .put("/fleetboot/deployed", "", ExpectedVersion::Any)
            .await
            .unwrap();
        let tracker = tracker(Arc::clone(&store));

        assert!(!tracker.is_deployed("a").await.unwrap());
        tracker.mark_deployed("a").await.unwrap();

        let stored = store.get("/fleetboot/deployed").await.unwrap().unwrap();
        assert_eq!(stored.value, r#"["a"]"#);
        assert!(stored.version > version);
    }

    #[tokio::test]
    async fn test_mark_deployed_appends_once() {
        let store = Arc::new(InMemoryStore::new());
        let tracker = tracker(Arc::clone(&store));

        tracker.mark_deployed("a").await.unwrap();
        tracker.mark_deployed("b").await.unwrap();
        tracker.mark_deployed("a").await.unwrap();

        assert!(tracker.is_deployed("a").await.unwrap());
        assert_eq!(tracker.deployed_ids().await.unwrap(), vec!["a", "b"]);
        assert_eq!(
            store.get("/fleetboot/deployed").await.unwrap().unwrap().value,
            r#"["a","b"]"#
        );
    }

    #[tokio::test]
    async fn test_conflict_is_retried_after_reread() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put("/fleetboot/deployed", r#"["x"]"#, ExpectedVersion::Any)
            .await
            .unwrap();
        store.inject_conflicts(1);

        let tracker = tracker(Arc::clone(&store));
        tracker.mark_deployed("a").await.unwrap();

        assert_eq!(tracker.deployed_ids().await.unwrap(), vec!["x", "a"]);
    }

    #[tokio::test]
    async fn test_conflict_retries_are_bounded() {
        let store = Arc::new(InMemoryStore::new());
        store.inject_conflicts(10);

        let tracker = DeploymentTracker::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            "/fleetboot/deployed",
            RetryPolicy::no_retry(),
            RetryPolicy::fixed(std::time::Duration::ZERO).with_max_attempts(Some(3)),
        );

        let result = tracker.mark_deployed("a").await;
        assert!(matches!(
            result,
            Err(DomainError::ConflictRetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_record_is_fatal() {
        let store = Arc::new(InMemoryStore::new());
        store
            .put("/fleetboot/deployed", "not json", ExpectedVersion::Any)
            .await
            .unwrap();

        let result = tracker(store).is_deployed("a").await;
        assert!(matches!(
            result,
            Err(DomainError::Store(StoreError::MalformedResponse(_)))
        ));
    }
}
