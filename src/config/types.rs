use serde::{Deserialize, Serialize};

use crate::filter::FilterConfig;
use crate::providers::ProviderKind;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8686
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// One configured provider connection. Immutable after load; changing it
/// requires an explicit config reload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ProviderKind,

    pub hostname: String,

    pub port: u16,

    #[serde(default)]
    pub api_key: String,

    /// Plain-http transport for LAN deployments without TLS.
    #[serde(default)]
    pub insecure: bool,

    /// Skip TLS certificate verification for https providers with
    /// self-signed certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Extra attempts after the first failure (total attempts = this + 1).
    #[serde(default = "default_max_retries")]
    pub retry_max_retries: u32,

    /// First backoff wait in milliseconds; doubles per retry.
    #[serde(default = "default_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default)]
    pub filters: FilterConfig,
}

fn default_enabled() -> bool {
    true
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}

impl ProviderConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_retries,
            base_delay_ms: self.retry_base_delay_ms,
        }
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{scheme}://{}:{}", self.hostname, self.port)
    }
}
