use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::ports::{ExpectedVersion, KeyValueStore, StoreError, StoreNode, VersionedValue};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    modified_index: u64,
    created_index: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    index: u64,
    pending_conflicts: u32,
    pending_outages: u32,
}

/// In-process versioned key-value store with etcd-style global indices.
///
/// Every write bumps a store-wide index, which becomes the written key's
/// version. Faults can be injected to exercise retry paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Empty store at index 0
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next `n` conditional writes with a version conflict
    pub fn inject_conflicts(&self, n: u32) {
        self.lock().pending_conflicts = n;
    }

    /// Fail the next `n` operations of any kind as unavailable
    pub fn inject_outages(&self, n: u32) {
        self.lock().pending_outages = n;
    }

    fn take_outage(state: &mut State) -> Result<(), StoreError> {
        if state.pending_outages > 0 {
            state.pending_outages -= 1;
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

fn normalize(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        let mut state = self.lock();
        Self::take_outage(&mut state)?;

        Ok(state.entries.get(&normalize(key)).map(|entry| VersionedValue {
            value: entry.value.clone(),
            version: entry.modified_index,
            created_index: entry.created_index,
        }))
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let key = normalize(key);
        let mut state = self.lock();
        Self::take_outage(&mut state)?;

        let current = state.entries.get(&key).map(|e| e.modified_index);
        let conflict = match expected {
            ExpectedVersion::Any => false,
            ExpectedVersion::Absent => current.is_some(),
            ExpectedVersion::Exactly(version) => current != Some(version),
        };
        let injected = expected != ExpectedVersion::Any && state.pending_conflicts > 0;
        if injected {
            state.pending_conflicts -= 1;
        }
        if conflict || injected {
            return Err(StoreError::VersionConflict {
                key,
                expected: expected.to_string(),
            });
        }

        state.index += 1;
        let index = state.index;
        let created_index = state
            .entries
            .get(&key)
            .map_or(index, |existing| existing.created_index);
        state.entries.insert(
            key,
            Entry {
                value: value.to_string(),
                modified_index: index,
                created_index,
            },
        );
        Ok(index)
    }

    async fn list(&self, dir: &str) -> Result<Vec<StoreNode>, StoreError> {
        let mut state = self.lock();
        Self::take_outage(&mut state)?;

        let prefix = format!("{}/", normalize(dir));
        let mut children: BTreeMap<String, StoreNode> = BTreeMap::new();
        for (key, entry) in state.entries.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            let (name, is_dir) = match rest.split_once('/') {
                Some((name, _)) => (name, true),
                None => (rest, false),
            };
            let child_key = format!("{prefix}{name}");
            children
                .entry(child_key.clone())
                .and_modify(|node| {
                    node.version = node.version.max(entry.modified_index);
                    node.created_index = node.created_index.min(entry.created_index);
                })
                .or_insert_with(|| StoreNode {
                    key: child_key,
                    value: (!is_dir).then(|| entry.value.clone()),
                    dir: is_dir,
                    version: entry.modified_index,
                    created_index: entry.created_index,
                });
        }

        Ok(children.into_values().collect())
    }
}
