//! Calculator settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the distributed calculator and its servers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub host: String,
    /// First server port; 0 binds every server to an ephemeral port
    pub base_port: u16,
    pub server_count: usize,
    pub request_timeout_ms: u64,
    /// Decompose/execute/validate attempts before falling back
    pub max_iterations: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: 8000,
            server_count: 2,
            request_timeout_ms: 5000,
            max_iterations: 3,
        }
    }
}

impl CalculatorConfig {
    pub fn builder() -> CalculatorConfigBuilder {
        CalculatorConfigBuilder::default()
    }

    /// Defaults overridden by `CALCULATOR_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("CALCULATOR_HOST").unwrap_or(defaults.host),
            base_port: env_parse("CALCULATOR_BASE_PORT").unwrap_or(defaults.base_port),
            server_count: env_parse("CALCULATOR_SERVER_COUNT").unwrap_or(defaults.server_count),
            request_timeout_ms: env_parse("CALCULATOR_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            max_iterations: env_parse("CALCULATOR_MAX_ITERATIONS").unwrap_or(defaults.max_iterations),
        }
    }

    /// Ports for each server
    pub fn ports(&self) -> Vec<u16> {
        (0..self.server_count)
            .map(|i| {
                if self.base_port == 0 {
                    0
                } else {
                    self.base_port.saturating_add(i as u16)
                }
            })
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value, "ignoring unparsable setting");
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct CalculatorConfigBuilder {
    config: CalculatorConfig,
}

impl CalculatorConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn base_port(mut self, port: u16) -> Self {
        self.config.base_port = port;
        self
    }

    pub fn server_count(mut self, count: usize) -> Self {
        self.config.server_count = count;
        self
    }

    pub fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.request_timeout_ms = timeout_ms;
        self
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.config.max_iterations = iterations;
        self
    }

    pub fn build(self) -> CalculatorConfig {
        self.config
    }
}
