use serde::Serialize;

use super::machine::Role;
use super::unit::UnitGroup;

/// Placeholder replaced with the machine identifier
pub const ID_PLACEHOLDER: &str = "<ID>";

/// Placeholder replaced with the machine's public address
pub const ADDRESS_PLACEHOLDER: &str = "<IP_ADDR>";

/// A template's file name and the group its rendered unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateEntry {
    /// Template file name, e.g. `minion-kubelet@.service`
    pub file_name: &'static str,
    /// Group the rendered unit converges with
    pub group: UnitGroup,
}

const CONTROL_PLANE_ENTRIES: [TemplateEntry; 4] = [
    TemplateEntry {
        file_name: "master-apiserver@.service",
        group: UnitGroup::Role,
    },
    TemplateEntry {
        file_name: "master-controller-manager@.service",
        group: UnitGroup::Role,
    },
    TemplateEntry {
        file_name: "master-scheduler@.service",
        group: UnitGroup::Role,
    },
    TemplateEntry {
        file_name: "master-download-kubernetes@.service",
        group: UnitGroup::Download,
    },
];

const WORKER_ENTRIES: [TemplateEntry; 3] = [
    TemplateEntry {
        file_name: "minion-kubelet@.service",
        group: UnitGroup::Role,
    },
    TemplateEntry {
        file_name: "minion-proxy@.service",
        group: UnitGroup::Role,
    },
    TemplateEntry {
        file_name: "minion-download-kubernetes@.service",
        group: UnitGroup::Download,
    },
];

/// Template files making up a role's unit set; empty for `Unassigned`
pub const fn entries_for(role: Role) -> &'static [TemplateEntry] {
    match role {
        Role::ControlPlane => &CONTROL_PLANE_ENTRIES,
        Role::Worker => &WORKER_ENTRIES,
        Role::Unassigned => &[],
    }
}

/// Instance unit name for a template: `kubelet@.service` -> `kubelet@<id>.service`
pub fn instance_name(file_name: &str, machine_id: &str) -> String {
    file_name.replacen('@', &format!("@{machine_id}"), 1)
}

/// One loaded template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTemplate {
    /// Catalogue entry the template was loaded for
    pub entry: TemplateEntry,
    /// Template body with placeholders
    pub content: String,
}

/// The fixed template set keyed by role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    control_plane: Vec<UnitTemplate>,
    worker: Vec<UnitTemplate>,
}

impl TemplateSet {
    /// Build a set from a lookup of template file name to content
    pub fn from_lookup<F, E>(mut lookup: F) -> Result<Self, E>
    where
        F: FnMut(&TemplateEntry) -> Result<String, E>,
    {
        let mut load = |role: Role| -> Result<Vec<UnitTemplate>, E> {
            entries_for(role)
                .iter()
                .map(|entry| {
                    Ok(UnitTemplate {
                        entry: *entry,
                        content: lookup(entry)?,
                    })
                })
                .collect()
        };

        Ok(Self {
            control_plane: load(Role::ControlPlane)?,
            worker: load(Role::Worker)?,
        })
    }

    /// Templates compiled into the binary
    pub fn builtin() -> Self {
        let result: Result<Self, std::convert::Infallible> =
            Self::from_lookup(|entry| Ok(builtin_content(entry.file_name).to_string()));
        match result {
            Ok(set) => set,
            Err(never) => match never {},
        }
    }

    /// Templates for a role; empty for `Unassigned`
    pub fn for_role(&self, role: Role) -> &[UnitTemplate] {
        match role {
            Role::ControlPlane => &self.control_plane,
            Role::Worker => &self.worker,
            Role::Unassigned => &[],
        }
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_content(file_name: &str) -> &'static str {
    match file_name {
        "master-apiserver@.service" => {
            include_str!("../../../templates/master-apiserver@.service")
        }
        "master-controller-manager@.service" => {
            include_str!("../../../templates/master-controller-manager@.service")
        }
        "master-scheduler@.service" => {
            include_str!("../../../templates/master-scheduler@.service")
        }
        "master-download-kubernetes@.service" => {
            include_str!("../../../templates/master-download-kubernetes@.service")
        }
        "minion-kubelet@.service" => include_str!("../../../templates/minion-kubelet@.service"),
        "minion-proxy@.service" => include_str!("../../../templates/minion-proxy@.service"),
        "minion-download-kubernetes@.service" => {
            include_str!("../../../templates/minion-download-kubernetes@.service")
        }
        _ => "",
    }
}
