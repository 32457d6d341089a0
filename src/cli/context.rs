//! Wiring from configuration to live adapters and services.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::Config;
use crate::domain::ports::{KeyValueStore, Scheduler};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::etcd::{EtcdClientConfig, EtcdStore};
use crate::infrastructure::fleet::{FleetClientConfig, FleetScheduler};
use crate::infrastructure::templates::UnitTemplateLoader;
use crate::services::{Orchestrator, WaitPolicies};

/// Load configuration from an explicit file, or from the project hierarchy
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Adapters and policies shared by the commands
pub struct AppContext {
    /// Validated configuration
    pub config: Config,
    /// etcd-backed store
    pub store: Arc<dyn KeyValueStore>,
    /// fleet-backed scheduler
    pub scheduler: Arc<dyn Scheduler>,
    /// Wait policies derived from `config`
    pub policies: WaitPolicies,
}

impl AppContext {
    /// Build the HTTP adapters and wait policies from configuration
    pub fn new(config: Config) -> Result<Self> {
        let store = EtcdStore::new(EtcdClientConfig::from(&config.store))
            .context("Failed to create store client")?;
        let scheduler = FleetScheduler::new(FleetClientConfig::from(&config.scheduler))
            .context("Failed to create scheduler client")?;
        let policies = WaitPolicies::from_config(&config);
        debug!(
            poll_max_attempts = ?policies.convergence.max_attempts(),
            poll_unbounded = policies.convergence.is_unbounded(),
            transient_max_attempts = ?policies.transient.max_attempts(),
            "wait policies configured"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
            scheduler: Arc::new(scheduler),
            policies,
        })
    }

    /// Orchestrator over the shared adapters, with templates loaded per call
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let templates = UnitTemplateLoader::from_config(&self.config.templates)
            .context("Failed to load unit templates")?;

        Ok(Orchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.scheduler),
            templates,
            &self.config,
            &self.policies,
        ))
    }
}
