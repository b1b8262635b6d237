//! Configuration management for Guardchat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! GraphQL settings are all optional: whether GraphQL is usable is decided
//! later by [`TransportDescriptor::resolve`](crate::transport::TransportDescriptor::resolve).

use crate::error::{GuardchatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variable holding the GraphQL endpoint URL
pub const ENV_GRAPHQL_ENDPOINT: &str = "GUARDCHAT_GRAPHQL_ENDPOINT";
/// Environment variable holding the GraphQL API region
pub const ENV_AWS_REGION: &str = "GUARDCHAT_AWS_REGION";
/// Environment variable holding the GraphQL API key
pub const ENV_GRAPHQL_API_KEY: &str = "GUARDCHAT_GRAPHQL_API_KEY";
/// Environment variable holding the REST base URL
pub const ENV_REST_BASE_URL: &str = "GUARDCHAT_REST_BASE_URL";
/// Environment variable holding the REST request timeout in seconds
pub const ENV_REST_TIMEOUT_SECONDS: &str = "GUARDCHAT_REST_TIMEOUT_SECONDS";
/// Environment variable holding the preferred transport (`graphql` or `rest`)
pub const ENV_PRIMARY: &str = "GUARDCHAT_PRIMARY";

/// Main configuration structure for Guardchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend transport settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Interactive chat settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Transport configuration for both backends
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// Preferred transport when both are usable ("graphql" or "rest")
    #[serde(default)]
    pub primary: Option<String>,

    /// Managed GraphQL backend
    #[serde(default)]
    pub graphql: GraphqlConfig,

    /// REST classification service
    #[serde(default)]
    pub rest: RestConfig,
}

/// Managed GraphQL backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphqlConfig {
    /// GraphQL endpoint URL; `None` leaves GraphQL unconfigured
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Region of the managed API
    #[serde(default = "default_region")]
    pub region: String,

    /// API key sent as `x-api-key` when present
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            api_key: None,
        }
    }
}

/// REST classification service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestConfig {
    /// Base URL; operations are issued against `{base_url}/classify` etc.
    #[serde(default = "default_rest_base_url")]
    pub base_url: String,

    /// Per-request timeout applied by the HTTP client (seconds)
    #[serde(default = "default_rest_timeout")]
    pub timeout_seconds: u64,
}

fn default_rest_base_url() -> String {
    "http://localhost:5001/api".to_string()
}

fn default_rest_timeout() -> u64 {
    30
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: default_rest_base_url(),
            timeout_seconds: default_rest_timeout(),
        }
    }
}

/// Interactive chat configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Print the welcome message when a session starts
    #[serde(default = "default_true")]
    pub show_welcome: bool,

    /// Print the stats sidebar after each refresh
    #[serde(default = "default_true")]
    pub show_sidebar: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            show_welcome: true,
            show_sidebar: true,
        }
    }
}

impl TransportConfig {
    /// Build a transport configuration from a key/value map
    ///
    /// Keys use the same names as the process environment
    /// (`GUARDCHAT_GRAPHQL_ENDPOINT`, ...). Unknown keys are ignored and
    /// missing keys keep their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use guardchat::config::TransportConfig;
    ///
    /// let mut vars = HashMap::new();
    /// vars.insert("GUARDCHAT_REST_BASE_URL".to_string(), "http://svc:8080/api".to_string());
    /// let cfg = TransportConfig::from_vars(&vars);
    /// assert_eq!(cfg.rest.base_url, "http://svc:8080/api");
    /// assert!(cfg.graphql.endpoint.is_none());
    /// ```
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let mut cfg = Self::default();
        cfg.apply_vars(|key| vars.get(key).cloned());
        cfg
    }

    fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_GRAPHQL_ENDPOINT) {
            tracing::debug!(endpoint = %endpoint, "Env override: {}", ENV_GRAPHQL_ENDPOINT);
            self.graphql.endpoint = Some(endpoint);
        }

        if let Some(region) = lookup(ENV_AWS_REGION) {
            self.graphql.region = region;
        }

        if let Some(api_key) = lookup(ENV_GRAPHQL_API_KEY) {
            tracing::debug!("Env override: {} (value hidden)", ENV_GRAPHQL_API_KEY);
            self.graphql.api_key = Some(api_key);
        }

        if let Some(base_url) = lookup(ENV_REST_BASE_URL) {
            tracing::debug!(base_url = %base_url, "Env override: {}", ENV_REST_BASE_URL);
            self.rest.base_url = base_url;
        }

        if let Some(timeout) = lookup(ENV_REST_TIMEOUT_SECONDS) {
            match timeout.parse::<u64>() {
                Ok(v) => self.rest.timeout_seconds = v,
                Err(_) => {
                    tracing::warn!("Invalid {}: {}", ENV_REST_TIMEOUT_SECONDS, timeout);
                }
            }
        }

        if let Some(primary) = lookup(ENV_PRIMARY) {
            self.primary = Some(primary);
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(GuardchatError::from)?;
        serde_yaml::from_str(&contents).map_err(|e| GuardchatError::from(e).into())
    }

    fn apply_env_vars(&mut self) {
        self.transport.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(primary) = &cli.primary {
            tracing::debug!("Using primary transport override: {}", primary);
            self.transport.primary = Some(primary.clone());
        }
        if let Some(base_url) = &cli.rest_url {
            self.transport.rest.base_url = base_url.clone();
        }
    }

    /// Validate the configuration
    ///
    /// Only the REST side is validated: it is the transport of last resort.
    /// GraphQL problems degrade to REST-only operation during resolution.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let base_url = self.transport.rest.base_url.trim();
        if base_url.is_empty() {
            return Err(GuardchatError::Config("rest.base_url cannot be empty".to_string()).into());
        }

        url::Url::parse(base_url).map_err(|e| {
            GuardchatError::Config(format!("rest.base_url is not a valid URL: {}", e))
        })?;

        if self.transport.rest.timeout_seconds == 0 {
            return Err(GuardchatError::Config(
                "rest.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if let Some(primary) = &self.transport.primary {
            let valid = ["graphql", "rest"];
            if !valid.contains(&primary.to_lowercase().as_str()) {
                return Err(GuardchatError::Config(format!(
                    "Invalid primary transport: {}. Must be one of: {}",
                    primary,
                    valid.join(", ")
                ))
                .into());
            }
        }

        Ok(())
    }
}
