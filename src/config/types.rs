use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sync::PollingOptions;

/// Configuration for the OPD queue client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Polling period shared by token tracking and the dashboard.
    #[serde(default = "default_interval_ms", alias = "intervalMs")]
    pub interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Statuses after which a token is no longer polled.
    #[serde(default = "default_terminal_statuses")]
    pub terminal_statuses: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            interval_ms: default_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            terminal_statuses: default_terminal_statuses(),
        }
    }
}

impl Config {
    pub fn polling(&self) -> PollingOptions {
        PollingOptions {
            interval: Duration::from_millis(self.interval_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    8000
}

fn default_terminal_statuses() -> Vec<String> {
    vec!["completed".to_string()]
}
