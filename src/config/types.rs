use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Crawl-Rotor
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub policy: PolicyOverrides,
    pub work: WorkConfig,
}

/// Control surface (REST) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    pub host: String,

    /// Port to bind the HTTP listener to (0 lets the OS pick)
    pub port: u16,

    /// When set, every request must carry `?api_key=<value>`
    #[serde(rename = "api-key")]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            api_key: None,
        }
    }
}

/// Liveness probe configuration used when identities are added
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Fixed reference URL fetched through the candidate proxy
    #[serde(rename = "target-url")]
    pub target_url: String,

    /// Upper bound on a single probe (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// User agent sent with probe requests
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target_url: "https://www.reddit.com/".to_string(),
            timeout_secs: 5,
            user_agent: "script:crawl-rotor-probe:0.1".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fixed timings of the orchestrator loop
///
/// These are distinct from the adaptive policy: they never change at runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Backoff when no concurrency slot is available (milliseconds)
    #[serde(rename = "slot-backoff-ms")]
    pub slot_backoff_ms: u64,

    /// Sleep after a failed cycle instead of the cycle interval (seconds)
    #[serde(rename = "recovery-delay-secs")]
    pub recovery_delay_secs: u64,

    /// Wall-clock bound on a single work callback (seconds)
    #[serde(rename = "work-timeout-secs")]
    pub work_timeout_secs: u64,

    /// How long `stop` waits for the loop to exit (seconds)
    #[serde(rename = "shutdown-grace-secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            slot_backoff_ms: 1000,
            recovery_delay_secs: 5,
            work_timeout_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

/// Optional overrides for the initial policy
///
/// Values go through the same clamping as runtime updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    #[serde(rename = "concurrency-limit")]
    pub concurrency_limit: Option<i64>,

    #[serde(rename = "cycle-interval")]
    pub cycle_interval: Option<i64>,

    #[serde(rename = "rotation-interval")]
    pub rotation_interval: Option<i64>,

    #[serde(rename = "retry-count")]
    pub retry_count: Option<i64>,

    #[serde(rename = "fail-threshold")]
    pub fail_threshold: Option<i64>,

    #[serde(rename = "delay-threshold")]
    pub delay_threshold: Option<i64>,

    #[serde(rename = "target-subject")]
    pub target_subject: Option<String>,

    #[serde(rename = "max-items-per-cycle")]
    pub max_items_per_cycle: Option<i64>,
}

/// Built-in HTTP work callback configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkConfig {
    /// URL fetched once per cycle; `{subject}` and `{limit}` are substituted
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// JSON pointer to the array of items in the response (empty = top level)
    #[serde(rename = "items-pointer", default)]
    pub items_pointer: String,

    /// User agent sent with work requests
    #[serde(rename = "user-agent", default = "default_work_user_agent")]
    pub user_agent: String,
}

fn default_work_user_agent() -> String {
    "script:crawl-rotor:1.0".to_string()
}
