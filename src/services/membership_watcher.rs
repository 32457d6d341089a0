//! Fleet membership discovery and role-metadata waits.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{MachineObject, MachineRecord, StoreConfig};
use crate::domain::ports::{KeyValueStore, StoreError};
use crate::services::retry::RetryPolicy;

/// Reads machine records from the membership subtree of the store
pub struct MembershipWatcher {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    role_key: String,
    transient: RetryPolicy,
    metadata: RetryPolicy,
}

impl MembershipWatcher {
    /// Create a watcher over the configured membership prefix.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the membership subtree
    /// * `config` - Membership prefix and metadata role key
    /// * `transient` - Retry policy for unavailable-store errors
    /// * `metadata` - Polling policy for role and machine-count waits
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        config: &StoreConfig,
        transient: RetryPolicy,
        metadata: RetryPolicy,
    ) -> Self {
        Self {
            store,
            prefix: config.membership_prefix.trim_end_matches('/').to_string(),
            role_key: config.role_key.clone(),
            transient,
            metadata,
        }
    }

    fn object_key(&self, machine_id: &str) -> String {
        format!("{}/{machine_id}/object", self.prefix)
    }

    /// Registered machine IDs, sorted
    async fn member_ids(&self) -> DomainResult<Vec<String>> {
        let nodes = self
            .transient
            .execute(|| self.store.list(&self.prefix))
            .await?;

        let mut ids: Vec<String> = nodes
            .iter()
            .map(|node| node.name().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Read one machine's record; an unpublished object yields a pending record
    pub async fn read_member(&self, machine_id: &str) -> DomainResult<MachineRecord> {
        let key = self.object_key(machine_id);
        let Some(raw) = self.transient.execute(|| self.store.get(&key)).await? else {
            return Ok(MachineRecord::pending(machine_id));
        };

        let object: MachineObject = serde_json::from_str(&raw.value).map_err(StoreError::from)?;
        let record = MachineRecord::from_object(object, &self.role_key)?;
        if record.id != machine_id {
            warn!(
                machine_id,
                object_id = %record.id,
                "machine object ID differs from its key"
            );
        }
        Ok(record)
    }

    /// Every registered machine, sorted by ID. An empty fleet is not an error.
    #[instrument(skip(self))]
    pub async fn list_members(&self) -> DomainResult<Vec<MachineRecord>> {
        let ids = self.member_ids().await?;
        let mut members = Vec::with_capacity(ids.len());
        for id in &ids {
            members.push(self.read_member(id).await?);
        }
        debug!(members = members.len(), "listed fleet members");
        Ok(members)
    }

    /// Poll a machine's object until it publishes a role
    #[instrument(skip(self))]
    pub async fn await_role(&self, machine_id: &str) -> DomainResult<MachineRecord> {
        let mut attempts = self.metadata.start();

        loop {
            let record = self.read_member(machine_id).await?;
            if record.has_published_role() {
                debug!(role = %record.role, attempts = attempts.count() + 1, "role published");
                return Ok(record);
            }

            debug!(attempt = attempts.count() + 1, "role not yet published");
            if !attempts.wait().await {
                return Err(DomainError::MetadataTimeout {
                    machine_id: machine_id.to_string(),
                    attempts: attempts.count(),
                });
            }
        }
    }

    /// Poll membership until at least `min_count` machines are registered
    #[instrument(skip(self))]
    pub async fn await_members(&self, min_count: usize) -> DomainResult<Vec<MachineRecord>> {
        let mut attempts = self.metadata.start();

        loop {
            let seen = self.member_ids().await?.len();
            if seen >= min_count {
                info!(seen, min_count, "enough machines registered");
                return self.list_members().await;
            }

            info!(seen, min_count, "waiting for machines to register");
            if !attempts.wait().await {
                return Err(DomainError::MembershipTimeout {
                    expected: min_count,
                    seen,
                });
            }
        }
    }
}
