use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_event_chunk_size() -> usize {
    200
}

/// Connection settings for one SecuritySpy server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub use_tls: bool,
    /// Timeout for inventory, snapshot and schedule requests (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Initial capacity of the event line buffer
    #[serde(default = "default_event_chunk_size")]
    pub event_chunk_size: usize,
    /// End the event listener when no data arrives for this many seconds
    #[serde(default)]
    pub event_idle_timeout_secs: Option<u64>,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16, username: &str, password: &str, use_tls: bool) -> Self {
        ServerConfig {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            use_tls,
            request_timeout_secs: default_request_timeout_secs(),
            event_chunk_size: default_event_chunk_size(),
            event_idle_timeout_secs: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn event_idle_timeout(&self) -> Option<Duration> {
        self.event_idle_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied_when_deserializing() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"host":"nvr.local","port":8000,"username":"admin","password":"secret"}"#,
        )
        .unwrap();

        assert!(!config.use_tls);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.event_chunk_size, 200);
        assert_eq!(config.event_idle_timeout(), None);
        assert_eq!(config.scheme(), "http");
    }

    #[test]
    fn validate_rejects_empty_host_and_zero_port() {
        assert!(ServerConfig::new("", 8000, "u", "p", false).validate().is_err());
        assert!(ServerConfig::new("nvr", 0, "u", "p", false).validate().is_err());
        assert!(ServerConfig::new("nvr", 8000, "u", "p", true).validate().is_ok());
    }
}
