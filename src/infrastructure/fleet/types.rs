use serde::{Deserialize, Serialize};

/// Desired state sent with every submission
pub const DESIRED_STATE_LAUNCHED: &str = "launched";

/// One `[Section] Name=Value` line of a unit file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOption {
    /// Section name without brackets
    pub section: String,
    /// Option name
    pub name: String,
    /// Option value, continuation lines joined
    pub value: String,
}

/// Body of `PUT /units/{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRequest {
    /// Unit name
    pub name: String,
    /// Always [`DESIRED_STATE_LAUNCHED`]
    pub desired_state: String,
    /// Parsed unit file
    pub options: Vec<UnitOption>,
}

/// Body of `GET /state`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    /// Unit states on this page
    #[serde(default)]
    pub states: Vec<FleetUnitState>,
    /// Token for the next page, absent on the last one
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Per-unit entry of the state report
#[derive(Debug, Clone, Deserialize)]
pub struct FleetUnitState {
    /// Unit name
    pub name: String,
    /// Machine the unit runs on
    #[serde(rename = "machineID", default)]
    pub machine_id: String,
    #[serde(rename = "systemdActiveState", default)]
    pub active_state: String,
    #[serde(rename = "systemdSubState", default)]
    pub sub_state: String,
    #[serde(rename = "systemdLoadState", default)]
    pub load_state: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Split a unit file into its options.
///
/// Understands `[Section]` headers, `Key=Value` lines, `#`/`;` comments and
/// trailing-backslash continuations. Continued lines are joined with a
/// single space.
pub fn parse_unit_file(content: &str) -> Result<Vec<UnitOption>, String> {
    let mut options = Vec::new();
    let mut section: Option<String> = None;
    let mut lines = content.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let mut line = raw.trim().to_string();
        while let Some(stripped) = line.strip_suffix('\\') {
            let joined = stripped.trim_end().to_string();
            match lines.next() {
                Some((_, next)) => line = format!("{joined} {}", next.trim()),
                None => line = joined,
            }
        }
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .strip_suffix(']')
                .ok_or_else(|| format!("line {}: unterminated section header", index + 1))?;
            section = Some(name.trim().to_string());
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {}: expected Key=Value", index + 1))?;
        let section = section
            .clone()
            .ok_or_else(|| format!("line {}: option outside of a section", index + 1))?;

        options.push(UnitOption {
            section,
            name: key.trim().to_string(),
            value: value.trim().to_string(),
        });
    }

    Ok(options)
}
