use serde::{Deserialize, Serialize};

/// Main configuration structure for fleetboot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Wait for at least this many registered machines before deploying (0 = don't wait)
    #[serde(default)]
    pub machine_count: usize,

    /// Key-value store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Scheduler API configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Store peer admin API configuration
    #[serde(default)]
    pub peers: PeersConfig,

    /// Unit template configuration
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Wait-loop configuration for metadata, submission and convergence
    #[serde(default)]
    pub polling: PollingConfig,

    /// Retry policy for transient store and scheduler errors
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreConfig {
    /// Base URL of the store's client API
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,

    /// Directory holding one child per registered machine
    #[serde(default = "default_membership_prefix")]
    pub membership_prefix: String,

    /// Key holding the JSON array of deployed machine IDs
    #[serde(default = "default_deployed_key")]
    pub deployed_key: String,

    /// Metadata key carrying the machine's role
    #[serde(default = "default_role_key")]
    pub role_key: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_endpoint() -> String {
    "http://127.0.0.1:4001".to_string()
}

fn default_membership_prefix() -> String {
    "/_coreos.com/fleet/machines".to_string()
}

fn default_deployed_key() -> String {
    "/fleetboot/deployed".to_string()
}

fn default_role_key() -> String {
    "kubernetes_role".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_store_endpoint(),
            membership_prefix: default_membership_prefix(),
            deployed_key: default_deployed_key(),
            role_key: default_role_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Scheduler API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Base URL of the scheduler API
    #[serde(default = "default_scheduler_endpoint")]
    pub endpoint: String,

    /// Path prefix of the versioned API
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_scheduler_endpoint() -> String {
    "http://127.0.0.1:10001".to_string()
}

fn default_api_prefix() -> String {
    "v1-alpha".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_scheduler_endpoint(),
            api_prefix: default_api_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Store peer admin API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PeersConfig {
    /// Base URL of the store's peer admin API
    #[serde(default = "default_peers_endpoint")]
    pub endpoint: String,
}

fn default_peers_endpoint() -> String {
    "http://127.0.0.1:7001".to_string()
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            endpoint: default_peers_endpoint(),
        }
    }
}

/// Unit template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TemplatesConfig {
    /// Directory of unit templates; built-in templates are used when unset
    #[serde(default)]
    pub dir: Option<String>,
}

/// Wait-loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollingConfig {
    /// Interval between machine metadata reads
    #[serde(default = "default_metadata_interval_ms")]
    pub metadata_interval_ms: u64,

    /// Delay before resubmitting a unit the scheduler did not accept
    #[serde(default = "default_submit_interval_ms")]
    pub submit_interval_ms: u64,

    /// Interval between scheduler state polls
    #[serde(default = "default_convergence_interval_ms")]
    pub convergence_interval_ms: u64,

    /// Give up a wait after this many attempts (unset = wait forever)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up a wait after this many seconds (unset = wait forever)
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

const fn default_metadata_interval_ms() -> u64 {
    500
}

const fn default_submit_interval_ms() -> u64 {
    1000
}

const fn default_convergence_interval_ms() -> u64 {
    1000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            metadata_interval_ms: default_metadata_interval_ms(),
            submit_interval_ms: default_submit_interval_ms(),
            convergence_interval_ms: default_convergence_interval_ms(),
            max_attempts: None,
            deadline_secs: None,
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts for transient errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Maximum re-read attempts after a conditional write conflict (unset = unbounded)
    #[serde(default)]
    pub max_conflict_retries: Option<u32>,
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_conflict_retries: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
