use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::errors::DomainError;

/// Cluster role a machine has been assigned through its metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ControlPlane,
    Worker,
    Unassigned,
}

impl Role {
    /// Map a metadata role value onto a role.
    ///
    /// Both the legacy (`master`, `minion`) and current (`control-plane`,
    /// `worker`) spellings are accepted. Anything else, including an empty
    /// string, is `Unassigned`.
    pub fn from_metadata(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "master" | "control-plane" | "control_plane" | "controlplane" => Self::ControlPlane,
            "minion" | "worker" | "node" => Self::Worker,
            _ => Self::Unassigned,
        }
    }

    /// Whether the role maps to a unit set
    pub const fn is_assigned(self) -> bool {
        !matches!(self, Self::Unassigned)
    }

    /// Canonical spelling used in output
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ControlPlane => "control-plane",
            Self::Worker => "worker",
            Self::Unassigned => "unassigned",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fleet member as published in the key-value store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRecord {
    /// Fleet machine ID
    pub id: String,
    /// Address other machines reach it on
    pub public_address: String,
    /// Role resolved from the metadata role key
    pub role: Role,
    /// Role value exactly as published, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_label: Option<String>,
    /// Metadata other than the role key, kept for forward compatibility
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Agent version the machine reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl MachineRecord {
    /// A member whose object has not been published yet
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            public_address: String::new(),
            role: Role::Unassigned,
            role_label: None,
            metadata: BTreeMap::new(),
            version: None,
        }
    }

    /// True once the machine has published a non-empty role value, even
    /// one that maps to no known role
    pub fn has_published_role(&self) -> bool {
        self.role_label.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    /// Validate a raw machine object read from the store.
    ///
    /// The role is pulled out of `role_key` in the metadata map. A missing,
    /// null, or empty role leaves the machine `Unassigned`; a role that is
    /// present but not a string is rejected.
    pub fn from_object(object: MachineObject, role_key: &str) -> Result<Self, DomainError> {
        if object.id.trim().is_empty() {
            return Err(DomainError::InvalidMachineRecord {
                id: String::new(),
                reason: "machine object has an empty ID".to_string(),
            });
        }

        let mut metadata = object.metadata.unwrap_or_default();
        let (role, role_label) = match metadata.remove(role_key) {
            None | Some(Value::Null) => (Role::Unassigned, None),
            Some(Value::String(raw)) => {
                let role = Role::from_metadata(&raw);
                if !role.is_assigned() && !raw.trim().is_empty() {
                    tracing::warn!(
                        machine_id = %object.id,
                        role = %raw,
                        "unrecognised role in machine metadata, treating as unassigned"
                    );
                }
                (role, Some(raw))
            }
            Some(other) => {
                return Err(DomainError::InvalidMachineRecord {
                    id: object.id,
                    reason: format!("role key '{role_key}' is not a string: {other}"),
                });
            }
        };

        Ok(Self {
            id: object.id,
            public_address: object.public_ip,
            role,
            role_label,
            metadata,
            version: object.version,
        })
    }
}

impl fmt::Display for MachineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.public_address, self.role)
    }
}

/// Raw machine object as the scheduler agents publish it in the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineObject {
    /// Machine ID
    #[serde(rename = "ID")]
    pub id: String,
    /// Public IP address
    #[serde(rename = "PublicIP", default)]
    pub public_ip: String,
    /// Free-form metadata, including the role key once published
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<BTreeMap<String, Value>>,
    /// Agent version
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
    /// Resource totals, carried through untouched
    #[serde(rename = "TotalResources", default, skip_serializing_if = "Option::is_none")]
    pub total_resources: Option<Value>,
}

/// Public addresses of every machine holding `role`, in input order
pub fn addresses_for_role(machines: &[MachineRecord], role: Role) -> Vec<String> {
    machines
        .iter()
        .filter(|m| m.role == role)
        .map(|m| m.public_address.clone())
        .collect()
}
