//! Unit template loader and rendered-unit writer

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::domain::models::{TemplateSet, TemplatesConfig, UnitSpec};

/// Loads unit templates from a directory of `*@.service` files
pub struct UnitTemplateLoader {
    template_dir: PathBuf,
}

impl UnitTemplateLoader {
    /// Create a new template loader
    pub fn new<P: AsRef<Path>>(template_dir: P) -> Self {
        Self {
            template_dir: template_dir.as_ref().to_path_buf(),
        }
    }

    /// Templates from the configured directory, or the built-in set when none is configured
    pub fn from_config(config: &TemplatesConfig) -> Result<TemplateSet, DomainError> {
        match config.dir.as_deref() {
            Some(dir) => Self::new(dir).load(),
            None => {
                debug!("no template directory configured, using built-in templates");
                Ok(TemplateSet::builtin())
            }
        }
    }

    /// Load every template the role table names; a missing file is an error
    pub fn load(&self) -> Result<TemplateSet, DomainError> {
        info!(dir = %self.template_dir.display(), "loading unit templates");

        TemplateSet::from_lookup(|entry| {
            let path = self.template_dir.join(entry.file_name);
            std::fs::read_to_string(&path).map_err(|e| {
                DomainError::Template(format!("failed to read {}: {e}", path.display()))
            })
        })
    }
}

/// Write rendered units under `dir/{group}/{name}`, returning the written paths
pub fn write_units<P: AsRef<Path>>(dir: P, units: &[UnitSpec]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(units.len());

    for unit in units {
        let group_dir = dir.as_ref().join(unit.group.as_str());
        std::fs::create_dir_all(&group_dir)
            .with_context(|| format!("Failed to create directory: {}", group_dir.display()))?;

        let path = group_dir.join(&unit.name);
        std::fs::write(&path, &unit.rendered_content)
            .with_context(|| format!("Failed to write unit file: {}", path.display()))?;
        debug!(path = %path.display(), "wrote unit");
        written.push(path);
    }

    Ok(written)
}
