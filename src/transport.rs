//! Transport descriptor resolution
//!
//! Decides once, at startup and without any network call, which transports
//! are usable. The result is an immutable [`TransportDescriptor`] shared by
//! every operation for the rest of the session.

use crate::backends::BackendKind;
use crate::config::{RestConfig, TransportConfig};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Marker contained in the template endpoint shipped with sample configs
pub const PLACEHOLDER_ENDPOINT_MARKER: &str = "your-amplify-endpoint";

/// A usable GraphQL endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlEndpoint {
    /// Endpoint URL
    pub url: Url,
    /// Region of the managed API
    pub region: String,
    /// API key, when configured
    pub api_key: Option<String>,
}

/// A REST endpoint; always present
#[derive(Debug, Clone, PartialEq)]
pub struct RestEndpoint {
    /// Base URL for `/classify`, `/stats`, `/flag`
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl From<&RestConfig> for RestEndpoint {
    fn from(config: &RestConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

impl RestEndpoint {
    /// Back to the configuration shape the REST backend is built from
    pub fn to_config(&self) -> RestConfig {
        RestConfig {
            base_url: self.base_url.clone(),
            timeout_seconds: self.timeout.as_secs(),
        }
    }
}

/// Why GraphQL was left out of the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphqlUnavailable {
    /// No endpoint value (or a blank one)
    Absent,
    /// The endpoint still carries the template placeholder
    Placeholder,
    /// The endpoint is not an absolute http(s) URL
    InvalidUrl(String),
}

impl GraphqlUnavailable {
    /// True when an endpoint was supplied but cannot be used
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::InvalidUrl(_))
    }
}

impl fmt::Display for GraphqlUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "no endpoint configured"),
            Self::Placeholder => write!(f, "endpoint is the template placeholder"),
            Self::InvalidUrl(reason) => write!(f, "endpoint is not a valid URL: {}", reason),
        }
    }
}

/// Resolved, immutable transport configuration
#[derive(Debug, Clone, PartialEq)]
pub enum TransportDescriptor {
    /// GraphQL is configured; REST remains available as the other transport
    Graphql {
        /// Managed GraphQL endpoint
        graphql: GraphqlEndpoint,
        /// REST endpoint
        rest: RestEndpoint,
        /// Which of the two is tried first
        primary: BackendKind,
    },
    /// REST is the sole viable transport
    Rest {
        /// REST endpoint
        rest: RestEndpoint,
        /// Why GraphQL is unusable
        reason: GraphqlUnavailable,
    },
}

impl TransportDescriptor {
    /// Resolve the descriptor from transport configuration
    ///
    /// Never fails: any GraphQL problem degrades to REST-only.
    ///
    /// # Examples
    ///
    /// ```
    /// use guardchat::backends::BackendKind;
    /// use guardchat::config::TransportConfig;
    /// use guardchat::transport::TransportDescriptor;
    ///
    /// let mut cfg = TransportConfig::default();
    /// cfg.graphql.endpoint = Some("https://your-amplify-endpoint/graphql".to_string());
    /// let descriptor = TransportDescriptor::resolve(&cfg);
    /// assert_eq!(descriptor.primary(), BackendKind::Rest);
    /// assert!(!descriptor.graphql_configured());
    /// ```
    pub fn resolve(config: &TransportConfig) -> Self {
        let rest = RestEndpoint::from(&config.rest);

        let graphql = match Self::graphql_endpoint(config) {
            Ok(endpoint) => endpoint,
            Err(reason) => {
                if reason.is_misconfiguration() {
                    tracing::warn!("GraphQL endpoint ignored ({}); using REST only", reason);
                } else {
                    tracing::info!("GraphQL transport unconfigured ({}); using REST only", reason);
                }
                return Self::Rest { rest, reason };
            }
        };

        let primary = match config.primary.as_deref().map(BackendKind::parse_str) {
            Some(Ok(kind)) => kind,
            Some(Err(e)) => {
                tracing::warn!("{}; preferring GraphQL", e);
                BackendKind::Graphql
            }
            None => BackendKind::Graphql,
        };

        tracing::info!(
            "GraphQL transport configured: endpoint={}, primary={}",
            graphql.url,
            primary
        );

        Self::Graphql {
            graphql,
            rest,
            primary,
        }
    }

    /// Resolve the descriptor from a key/value map (environment-style keys)
    pub fn resolve_env(vars: &HashMap<String, String>) -> Self {
        Self::resolve(&TransportConfig::from_vars(vars))
    }

    fn graphql_endpoint(
        config: &TransportConfig,
    ) -> std::result::Result<GraphqlEndpoint, GraphqlUnavailable> {
        let raw = config
            .graphql
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(GraphqlUnavailable::Absent)?;

        if raw.contains(PLACEHOLDER_ENDPOINT_MARKER) {
            return Err(GraphqlUnavailable::Placeholder);
        }

        let url = Url::parse(raw).map_err(|e| GraphqlUnavailable::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GraphqlUnavailable::InvalidUrl(format!(
                "unsupported scheme `{}`",
                url.scheme()
            )));
        }

        let api_key = config
            .graphql
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(GraphqlEndpoint {
            url,
            region: config.graphql.region.clone(),
            api_key,
        })
    }

    /// The transport tried first
    pub fn primary(&self) -> BackendKind {
        match self {
            Self::Graphql { primary, .. } => *primary,
            Self::Rest { .. } => BackendKind::Rest,
        }
    }

    /// The transport tried after the primary fails, if any
    pub fn fallback(&self) -> Option<BackendKind> {
        match self {
            Self::Graphql { primary, .. } => Some(primary.other()),
            Self::Rest { .. } => None,
        }
    }

    /// Transports in the order the router tries them
    pub fn order(&self) -> Vec<BackendKind> {
        std::iter::once(self.primary()).chain(self.fallback()).collect()
    }

    /// Whether GraphQL may be contacted at all
    pub fn graphql_configured(&self) -> bool {
        matches!(self, Self::Graphql { .. })
    }

    /// The GraphQL endpoint, when configured
    pub fn graphql(&self) -> Option<&GraphqlEndpoint> {
        match self {
            Self::Graphql { graphql, .. } => Some(graphql),
            Self::Rest { .. } => None,
        }
    }

    /// The REST endpoint
    pub fn rest(&self) -> &RestEndpoint {
        match self {
            Self::Graphql { rest, .. } | Self::Rest { rest, .. } => rest,
        }
    }
}

impl fmt::Display for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Primary:  {}", self.primary())?;
        match self.fallback() {
            Some(kind) => writeln!(f, "Fallback: {}", kind)?,
            None => writeln!(f, "Fallback: none")?,
        }
        match self {
            Self::Graphql { graphql, .. } => {
                writeln!(f, "GraphQL:  {} ({})", graphql.url, graphql.region)?;
                let key = graphql
                    .api_key
                    .as_deref()
                    .map(mask_secret)
                    .unwrap_or_else(|| "none".to_string());
                writeln!(f, "API key:  {}", key)?;
            }
            Self::Rest { reason, .. } => writeln!(f, "GraphQL:  unconfigured ({})", reason)?,
        }
        write!(f, "REST:     {}", self.rest().base_url)
    }
}

/// Mask all but the last four characters of a secret
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
