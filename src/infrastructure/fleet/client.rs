use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::{parse_unit_file, StateResponse, UnitRequest, DESIRED_STATE_LAUNCHED};
use crate::domain::models::{SchedulerConfig, UnitSpec, UnitState};
use crate::domain::ports::{Scheduler, SchedulerError, SubmitOutcome};

/// Configuration for the fleet HTTP client
#[derive(Debug, Clone)]
pub struct FleetClientConfig {
    /// Base URL, e.g. `http://127.0.0.1:10001`
    pub endpoint: String,

    /// Path prefix of the API version, e.g. `v1-alpha`
    pub api_prefix: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FleetClientConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for FleetClientConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_prefix: config.api_prefix.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// `Scheduler` over the fleet HTTP API
pub struct FleetScheduler {
    http_client: ReqwestClient,
    base_url: String,
}

impl FleetScheduler {
    /// Build a client with the configured request timeout
    pub fn new(config: FleetClientConfig) -> Result<Self, SchedulerError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                SchedulerError::Unavailable(format!("failed to build HTTP client: {e}"))
            })?;

        let endpoint = config.endpoint.trim_end_matches('/');
        let prefix = config.api_prefix.trim_matches('/');
        let base_url = if prefix.is_empty() {
            endpoint.to_string()
        } else {
            format!("{endpoint}/{prefix}")
        };

        Ok(Self {
            http_client,
            base_url,
        })
    }

    async fn fetch_state_page(&self, token: Option<&str>) -> Result<StateResponse, SchedulerError> {
        let mut request = self.http_client.get(format!("{}/state", self.base_url));
        if let Some(token) = token {
            request = request.query(&[("nextPageToken", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SchedulerError::Unavailable(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SchedulerError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(if status.is_server_error() {
                SchedulerError::Unavailable(format!("GET /state: HTTP {status}: {body}"))
            } else {
                SchedulerError::MalformedResponse(format!("GET /state: HTTP {status}: {body}"))
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Scheduler for FleetScheduler {
    #[instrument(skip(self, unit), fields(unit = %unit.name))]
    async fn submit_unit(&self, unit: &UnitSpec) -> Result<SubmitOutcome, SchedulerError> {
        let options =
            parse_unit_file(&unit.content_str()).map_err(|reason| SchedulerError::InvalidUnit {
                unit: unit.name.clone(),
                reason,
            })?;
        let request = UnitRequest {
            name: unit.name.clone(),
            desired_state: DESIRED_STATE_LAUNCHED.to_string(),
            options,
        };

        let response = self
            .http_client
            .put(format!("{}/units/{}", self.base_url, unit.name))
            .json(&request)
            .send()
            .await
            .map_err(|e| SchedulerError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(%status, "unit submission answered");

        match status {
            StatusCode::NO_CONTENT => Ok(SubmitOutcome::Accepted),
            StatusCode::CONFLICT => Ok(SubmitOutcome::AlreadyExists),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Ok(SubmitOutcome::NotAccepted {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn unit_states(&self) -> Result<Vec<UnitState>, SchedulerError> {
        let mut states = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.fetch_state_page(token.as_deref()).await?;
            states.extend(page.states.into_iter().map(|s| UnitState {
                unit_name: s.name,
                machine_id: s.machine_id,
                active_state: s.active_state.as_str().into(),
                sub_state: s.sub_state.as_str().into(),
                load_state: s.load_state,
                hash: s.hash,
            }));

            match page.next_page_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        debug!(states = states.len(), "fetched unit states");
        Ok(states)
    }
}
