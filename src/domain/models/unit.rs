use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// systemd `ActiveState` as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActiveState {
    Active,
    Reloading,
    Inactive,
    Failed,
    Activating,
    Deactivating,
    Other(String),
}

impl ActiveState {
    /// Wire spelling, as systemd reports it
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Reloading => "reloading",
            Self::Inactive => "inactive",
            Self::Failed => "failed",
            Self::Activating => "activating",
            Self::Deactivating => "deactivating",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ActiveState {
    fn from(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "reloading" => Self::Reloading,
            "inactive" => Self::Inactive,
            "failed" => Self::Failed,
            "activating" => Self::Activating,
            "deactivating" => Self::Deactivating,
            other => Self::Other(other.to_string()),
        }
    }
}

/// systemd `SubState` as reported by the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubState {
    Running,
    Exited,
    Dead,
    Waiting,
    Failed,
    Start,
    Other(String),
}

impl SubState {
    /// Wire spelling, as systemd reports it
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Dead => "dead",
            Self::Waiting => "waiting",
            Self::Failed => "failed",
            Self::Start => "start",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for SubState {
    fn from(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            "waiting" => Self::Waiting,
            "failed" => Self::Failed,
            "start" => Self::Start,
            other => Self::Other(other.to_string()),
        }
    }
}

macro_rules! string_state_serde {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(Self::from(raw.as_str()))
            }
        }
    };
}

string_state_serde!(ActiveState);
string_state_serde!(SubState);

/// Which set of units a rendered unit belongs to.
///
/// Download units fetch binaries and exit; role units are the long-running
/// cluster services. Each group converges to its own target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitGroup {
    Download,
    Role,
}

impl UnitGroup {
    /// Groups in the order they are converged
    pub const ALL: [Self; 2] = [Self::Download, Self::Role];

    /// Target (active, sub) state a unit of this group must reach
    pub const fn target(self) -> (ActiveState, SubState) {
        match self {
            Self::Download => (ActiveState::Active, SubState::Exited),
            Self::Role => (ActiveState::Active, SubState::Running),
        }
    }

    /// Lowercase name, also the directory name for rendered files
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Role => "role",
        }
    }
}

impl fmt::Display for UnitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered unit ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    /// Instance unit name, e.g. `minion-kubelet@<id>.service`
    pub name: String,
    /// Group the unit converges with
    pub group: UnitGroup,
    /// `ActiveState` the unit must report once converged
    pub target_active_state: ActiveState,
    /// `SubState` the unit must report once converged
    pub target_sub_state: SubState,
    /// Unit file body after placeholder substitution
    pub rendered_content: Vec<u8>,
}

impl UnitSpec {
    /// Create a unit whose target state is its group's target.
    ///
    /// # Arguments
    ///
    /// * `name` - Instance unit name
    /// * `group` - Download or role group
    /// * `rendered_content` - Unit file body
    pub fn new(name: impl Into<String>, group: UnitGroup, rendered_content: Vec<u8>) -> Self {
        let (target_active_state, target_sub_state) = group.target();
        Self {
            name: name.into(),
            group,
            target_active_state,
            target_sub_state,
            rendered_content,
        }
    }

    /// Unit file body as text, lossily decoded
    pub fn content_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.rendered_content)
    }
}

/// Scheduler-reported state of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    /// Unit name as submitted
    pub unit_name: String,
    /// Machine the scheduler placed the unit on
    pub machine_id: String,
    pub active_state: ActiveState,
    pub sub_state: SubState,
    /// systemd `LoadState`, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_state: Option<String>,
    /// Hash of the unit contents the scheduler holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Progress of a single unit toward its target within one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitProgress {
    /// Not submitted in this pass and not reported
    Unknown,
    /// Submitted in this pass but not yet reported by the scheduler
    Submitted,
    /// Reported, but not in the target state
    Pending,
    /// Reported in the target state
    Converged,
}

/// The set of units a poll must see in one (active, sub) state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceTarget {
    /// Units that must all reach the required state
    pub unit_group: BTreeSet<String>,
    /// `ActiveState` every unit must report
    pub required_active_state: ActiveState,
    /// `SubState` every unit must report
    pub required_sub_state: SubState,
    /// Members of `unit_group` submitted during the current pass
    pub submitted: BTreeSet<String>,
}

impl ConvergenceTarget {
    /// Create a target with no units marked as submitted
    pub fn new(
        unit_group: impl IntoIterator<Item = String>,
        required_active_state: ActiveState,
        required_sub_state: SubState,
    ) -> Self {
        Self {
            unit_group: unit_group.into_iter().collect(),
            required_active_state,
            required_sub_state,
            submitted: BTreeSet::new(),
        }
    }

    /// Mark units as submitted during this pass; names outside the group are ignored
    #[must_use]
    pub fn with_submitted<'a>(mut self, names: impl IntoIterator<Item = &'a String>) -> Self {
        self.submitted = names
            .into_iter()
            .filter(|name| self.unit_group.contains(*name))
            .cloned()
            .collect();
        self
    }

    /// Build one target per unit group present in `units`, in [`UnitGroup::ALL`] order.
    ///
    /// # Arguments
    ///
    /// * `units` - Every unit expected to converge
    /// * `submitted` - Names of the units submitted during this pass
    pub fn for_units(units: &[UnitSpec], submitted: &BTreeSet<String>) -> Vec<(UnitGroup, Self)> {
        UnitGroup::ALL
            .into_iter()
            .filter_map(|group| {
                let names: BTreeSet<String> = units
                    .iter()
                    .filter(|u| u.group == group)
                    .map(|u| u.name.clone())
                    .collect();
                if names.is_empty() {
                    return None;
                }
                let (active, sub) = group.target();
                Some((group, Self::new(names, active, sub).with_submitted(submitted)))
            })
            .collect()
    }

    /// Group size; a poll converges when this many units match
    pub fn expected(&self) -> usize {
        self.unit_group.len()
    }

    /// Whether a reported state is a group member in the required state
    pub fn matches(&self, state: &UnitState) -> bool {
        self.unit_group.contains(&state.unit_name)
            && state.active_state == self.required_active_state
            && state.sub_state == self.required_sub_state
    }

    /// Number of distinct units in the group currently in the target state
    pub fn count_converged(&self, states: &[UnitState]) -> usize {
        states
            .iter()
            .filter(|s| self.matches(s))
            .map(|s| s.unit_name.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Classify a unit of this group against the scheduler report
    pub fn progress_of(&self, unit_name: &str, states: &[UnitState]) -> UnitProgress {
        let mut reported = states.iter().filter(|s| s.unit_name == unit_name).peekable();
        if reported.peek().is_none() {
            return if self.submitted.contains(unit_name) {
                UnitProgress::Submitted
            } else {
                UnitProgress::Unknown
            };
        }
        if reported.any(|s| self.matches(s)) {
            UnitProgress::Converged
        } else {
            UnitProgress::Pending
        }
    }
}

impl fmt::Display for ConvergenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} unit(s) -> {}/{}",
            self.unit_group.len(),
            self.required_active_state,
            self.required_sub_state
        )
    }
}
