use serde::{Deserialize, Serialize};

/// Append-only ledger of machine IDs whose units have been submitted.
///
/// Serialized as a plain JSON array of IDs under a single store key.
/// Insertion order is preserved and an ID appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentRecord {
    machine_ids: Vec<String>,
}

impl DeploymentRecord {
    /// An empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored record, collapsing any duplicate IDs.
    ///
    /// An empty or whitespace-only value is an empty record.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let ids: Vec<String> = serde_json::from_str(raw)?;
        let mut record = Self::new();
        for id in ids {
            record.insert(id);
        }
        Ok(record)
    }

    /// Serialize as a JSON array of IDs
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.machine_ids)
    }

    /// Whether the machine is recorded
    pub fn contains(&self, machine_id: &str) -> bool {
        self.machine_ids.iter().any(|id| id == machine_id)
    }

    /// Add an ID; returns false if it was already present
    pub fn insert(&mut self, machine_id: impl Into<String>) -> bool {
        let machine_id = machine_id.into();
        if self.contains(&machine_id) {
            return false;
        }
        self.machine_ids.push(machine_id);
        true
    }

    /// Recorded IDs in insertion order
    pub fn machine_ids(&self) -> &[String] {
        &self.machine_ids
    }

    /// Number of recorded machines
    pub fn len(&self) -> usize {
        self.machine_ids.len()
    }

    /// Whether no machine is recorded
    pub fn is_empty(&self) -> bool {
        self.machine_ids.is_empty()
    }
}
