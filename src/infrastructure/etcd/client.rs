use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::{
    ErrorBody, KeysResponse, Node, ERROR_KEY_NOT_FOUND, ERROR_NODE_EXIST, ERROR_TEST_FAILED,
};
use crate::domain::models::StoreConfig;
use crate::domain::ports::{ExpectedVersion, KeyValueStore, StoreError, StoreNode, VersionedValue};

/// Configuration for the etcd HTTP client
#[derive(Debug, Clone)]
pub struct EtcdClientConfig {
    /// Base URL, e.g. `http://10.1.42.1:4001`
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EtcdClientConfig {
    fn default() -> Self {
        Self::from(&StoreConfig::default())
    }
}

impl From<&StoreConfig> for EtcdClientConfig {
    fn from(config: &StoreConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// `KeyValueStore` over the etcd v2 keys API
pub struct EtcdStore {
    http_client: ReqwestClient,
    endpoint: String,
}

impl EtcdStore {
    /// Build a client with the configured request timeout
    pub fn new(config: EtcdClientConfig) -> Result<Self, StoreError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn key_url(&self, key: &str) -> String {
        let key = key.trim_end_matches('/');
        if key.starts_with('/') {
            format!("{}/v2/keys{}", self.endpoint, key)
        } else {
            format!("{}/v2/keys/{}", self.endpoint, key)
        }
    }

    /// Send a request and return status plus raw body
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, String), StoreError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        Ok((status, body))
    }

    async fn get_node(&self, key: &str) -> Result<Option<Node>, StoreError> {
        let (status, body) = self.send(self.http_client.get(self.key_url(key))).await?;

        if status.is_success() {
            let response: KeysResponse = serde_json::from_str(&body)?;
            return Ok(Some(response.node));
        }

        match classify_error(status, &body) {
            Some(error) if error.error_code == ERROR_KEY_NOT_FOUND => Ok(None),
            _ => Err(status_error(status, &body, key)),
        }
    }
}

#[async_trait]
impl KeyValueStore for EtcdStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        let Some(node) = self.get_node(key).await? else {
            debug!("key not found");
            return Ok(None);
        };

        if node.dir {
            return Err(StoreError::MalformedResponse(format!(
                "{key} is a directory, expected a value"
            )));
        }

        Ok(Some(VersionedValue {
            value: node.value.unwrap_or_default(),
            version: node.modified_index,
            created_index: node.created_index,
        }))
    }

    #[instrument(skip(self, value))]
    async fn put(
        &self,
        key: &str,
        value: &str,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let mut request = self.http_client.put(self.key_url(key)).form(&[("value", value)]);
        request = match expected {
            ExpectedVersion::Any => request,
            ExpectedVersion::Absent => request.query(&[("prevExist", "false")]),
            ExpectedVersion::Exactly(version) => request.query(&[("prevIndex", version)]),
        };

        let (status, body) = self.send(request).await?;

        if status.is_success() {
            let response: KeysResponse = serde_json::from_str(&body)?;
            debug!(version = response.node.modified_index, "key written");
            return Ok(response.node.modified_index);
        }

        match classify_error(status, &body) {
            Some(error)
                if error.error_code == ERROR_TEST_FAILED || error.error_code == ERROR_NODE_EXIST =>
            {
                Err(StoreError::VersionConflict {
                    key: key.to_string(),
                    expected: expected.to_string(),
                })
            }
            _ => Err(status_error(status, &body, key)),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, dir: &str) -> Result<Vec<StoreNode>, StoreError> {
        let Some(node) = self.get_node(dir).await? else {
            return Ok(Vec::new());
        };

        if !node.dir {
            return Err(StoreError::MalformedResponse(format!(
                "{dir} is a value, expected a directory"
            )));
        }

        Ok(node
            .nodes
            .into_iter()
            .map(|child| StoreNode {
                key: child.key,
                value: child.value,
                dir: child.dir,
                version: child.modified_index,
                created_index: child.created_index,
            })
            .collect())
    }
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::MalformedResponse(err.to_string())
    } else {
        StoreError::Unavailable(err.to_string())
    }
}

fn classify_error(status: StatusCode, body: &str) -> Option<ErrorBody> {
    if status.is_client_error() {
        serde_json::from_str(body).ok()
    } else {
        None
    }
}

/// Map a non-success status that carries no recognised error code
fn status_error(status: StatusCode, body: &str, key: &str) -> StoreError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        StoreError::Unavailable(format!("{key}: HTTP {status}: {body}"))
    } else {
        StoreError::MalformedResponse(format!("{key}: unexpected HTTP {status}: {body}"))
    }
}
