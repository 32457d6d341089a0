use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::debug;

use super::types::PeerMachine;
use crate::domain::models::PeersConfig;
use crate::domain::ports::StoreError;

/// Client for the store cluster's peer admin API
pub struct EtcdPeers {
    http_client: ReqwestClient,
    endpoint: String,
}

impl EtcdPeers {
    /// Build a peers client.
    ///
    /// # Arguments
    ///
    /// * `config` - Admin API endpoint
    /// * `timeout` - Per-request timeout
    pub fn new(config: &PeersConfig, timeout: Duration) -> Result<Self, StoreError> {
        let http_client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// List every member of the store cluster
    pub async fn list_peers(&self) -> Result<Vec<PeerMachine>, StoreError> {
        let url = format!("{}/v2/admin/machines", self.endpoint);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!("{url}: HTTP {status}: {body}")));
        }

        let peers: Vec<PeerMachine> = serde_json::from_str(&body)?;
        debug!(peers = peers.len(), "listed store peers");
        Ok(peers)
    }
}

/// State of the peer whose name matches the short form of `hostname`
pub fn local_state<'a>(peers: &'a [PeerMachine], hostname: &str) -> Option<&'a str> {
    let short = hostname.split('.').next().unwrap_or(hostname);
    peers
        .iter()
        .find(|peer| peer.name == short)
        .map(|peer| peer.state.as_str())
}
