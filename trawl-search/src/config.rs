//! Client, pool and deployment configuration.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Prefix of the environment variables read by [`ClientSettings::from_env`].
pub const ENV_PREFIX: &str = "TRAWL";

/// OpenSearch client configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Cluster URL(s). The first one is used.
    pub urls: Vec<String>,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Request timeout.
    pub request_timeout: Duration,
}

impl SearchConfig {
    /// Create a new configuration with a single URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Create configuration with multiple URLs for a cluster.
    pub fn cluster(urls: Vec<String>) -> Self {
        Self {
            urls,
            ..Self::new("")
        }
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of clients.
    pub max_size: u32,
    /// Clients kept idle and ready.
    pub min_idle: Option<u32>,
    /// How long `get` waits for a client.
    pub connection_timeout: Duration,
    /// Ping a client before handing it out.
    pub test_on_check_out: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: None,
            connection_timeout: Duration::from_secs(30),
            test_on_check_out: true,
        }
    }
}

impl PoolConfig {
    /// Set the maximum pool size.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Keep at least this many idle clients.
    pub fn with_min_idle(mut self, min_idle: u32) -> Self {
        self.min_idle = Some(min_idle);
        self
    }

    /// Set the checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Enable or disable the checkout ping.
    pub fn with_test_on_check_out(mut self, test: bool) -> Self {
        self.test_on_check_out = test;
        self
    }
}

/// Deployment settings, as stored in a JSON file or the environment.
///
/// ```json
/// {"host": "http://127.0.0.1", "port": 9200, "user": "admin", "passwd": "secret",
///  "max_count": 20, "min_count": 2, "timeout": 10}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Host, with or without scheme.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Basic auth user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Basic auth password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passwd: Option<String>,
    /// Maximum pooled clients.
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    /// Idle clients kept ready.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
    /// Request and checkout timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_max_count() -> u32 {
    PoolConfig::default().max_size
}

impl ClientSettings {
    /// Parse settings from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| SearchError::Configuration(format!("Invalid settings: {}", e)))
    }

    /// Load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SearchError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Load settings from `TRAWL_HOST`, `TRAWL_PORT`, `TRAWL_USER`,
    /// `TRAWL_PASSWD`, `TRAWL_MAX_COUNT`, `TRAWL_MIN_COUNT` and
    /// `TRAWL_TIMEOUT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(format!("{}_{}", ENV_PREFIX, key)).ok())
    }

    /// Load settings through `lookup`, which receives unprefixed keys
    /// (`HOST`, `PORT`, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("HOST")
            .ok_or_else(|| SearchError::Configuration(format!("{}_HOST is not set", ENV_PREFIX)))?;
        let port = parse_var(&lookup, "PORT")?
            .ok_or_else(|| SearchError::Configuration(format!("{}_PORT is not set", ENV_PREFIX)))?;

        Ok(Self {
            host,
            port,
            user: lookup("USER"),
            passwd: lookup("PASSWD"),
            max_count: parse_var(&lookup, "MAX_COUNT")?.unwrap_or_else(default_max_count),
            min_count: parse_var(&lookup, "MIN_COUNT")?,
            timeout: parse_var(&lookup, "TIMEOUT")?,
        })
    }

    /// Base URL built from host and port. `http://` is assumed when the host
    /// has no scheme.
    pub fn url(&self) -> String {
        if self.host.contains("://") {
            format!("{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    /// Client configuration for these settings.
    pub fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::new(self.url());
        if let (Some(user), Some(passwd)) = (&self.user, &self.passwd) {
            config = config.with_basic_auth(user, passwd);
        }
        if let Some(secs) = self.timeout {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        config
    }

    /// Pool configuration for these settings.
    pub fn pool_config(&self) -> PoolConfig {
        let mut pool = PoolConfig::default().with_max_size(self.max_count);
        if let Some(min) = self.min_count {
            pool = pool.with_min_idle(min);
        }
        if let Some(secs) = self.timeout {
            pool = pool.with_connection_timeout(Duration::from_secs(secs));
        }
        pool
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            SearchError::Configuration(format!("{}_{} is not a valid number: {}", ENV_PREFIX, key, raw))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_search_config_builder() {
        let config = SearchConfig::new("http://localhost:9200")
            .with_basic_auth("admin", "admin")
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.urls, vec!["http://localhost:9200"]);
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_settings_from_json() {
        let settings = ClientSettings::from_json(
            r#"{"host": "es.internal", "port": 9200, "user": "u", "passwd": "p", "min_count": 2, "timeout": 10}"#,
        )
        .unwrap();
        assert_eq!(settings.max_count, 10);
        assert_eq!(settings.url(), "http://es.internal:9200");

        let config = settings.search_config();
        assert_eq!(config.password.as_deref(), Some("p"));
        assert_eq!(config.request_timeout, Duration::from_secs(10));

        let pool = settings.pool_config();
        assert_eq!(pool.min_idle, Some(2));
        assert_eq!(pool.connection_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_settings_keep_scheme() {
        let settings = ClientSettings::from_json(r#"{"host": "https://es", "port": 443}"#).unwrap();
        assert_eq!(settings.url(), "https://es:443");
        assert!(settings.search_config().username.is_none());
    }

    #[test]
    fn test_settings_invalid_json() {
        assert!(matches!(
            ClientSettings::from_json(r#"{"host": "x"}"#),
            Err(SearchError::Configuration(_))
        ));
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [("HOST", "127.0.0.1"), ("PORT", "9201"), ("MAX_COUNT", "4")]
            .into_iter()
            .collect();
        let settings = ClientSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.port, 9201);
        assert_eq!(settings.max_count, 4);
        assert_eq!(settings.min_count, None);
    }

    #[test]
    fn test_settings_from_lookup_bad_number() {
        let result = ClientSettings::from_lookup(|k| match k {
            "HOST" => Some("h".to_string()),
            "PORT" => Some("ninety".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(SearchError::Configuration(msg)) if msg.contains("TRAWL_PORT")));
    }

    #[test]
    fn test_settings_missing_file() {
        assert!(ClientSettings::from_file("/nonexistent/trawl.json").is_err());
    }
}
