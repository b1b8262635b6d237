//! Backend module for Guardchat
//!
//! This module contains the backend abstraction shared by the two
//! interchangeable transports (managed GraphQL API and REST service) and
//! their implementations.

pub mod graphql;
pub mod rest;
pub mod types;

pub use graphql::GraphqlBackend;
pub use rest::RestBackend;
pub use types::{ClassificationResult, Stats, Verdict};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the two transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Managed GraphQL API (queries and mutations)
    Graphql,
    /// REST classification service
    Rest,
}

impl BackendKind {
    /// Parse a backend kind from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use guardchat::backends::BackendKind;
    ///
    /// assert_eq!(BackendKind::parse_str("GraphQL").unwrap(), BackendKind::Graphql);
    /// assert!(BackendKind::parse_str("soap").is_err());
    /// ```
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "graphql" => Ok(Self::Graphql),
            "rest" => Ok(Self::Rest),
            other => Err(format!("Unknown transport: {}", other)),
        }
    }

    /// The other transport
    pub fn other(&self) -> Self {
        match self {
            Self::Graphql => Self::Rest,
            Self::Rest => Self::Graphql,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graphql => write!(f, "graphql"),
            Self::Rest => write!(f, "rest"),
        }
    }
}

/// Operations every classification backend must serve
///
/// Implementations only marshal requests and unmarshal responses. Every
/// failure (network, malformed payload, application-level error) must be
/// reported as [`GuardchatError::Transport`](crate::error::GuardchatError::Transport),
/// and implementations never retry: fallback is the router's job.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use guardchat::backends::{BackendKind, ClassificationResult, ClassifierBackend, Stats, Verdict};
/// use guardchat::error::Result;
///
/// struct AlwaysSafe;
///
/// #[async_trait]
/// impl ClassifierBackend for AlwaysSafe {
///     fn kind(&self) -> BackendKind {
///         BackendKind::Rest
///     }
///
///     async fn classify(&self, _prompt: &str) -> Result<ClassificationResult> {
///         Ok(ClassificationResult::new("id-1", Verdict::Safe, 1.0, 0.0))
///     }
///
///     async fn fetch_stats(&self) -> Result<Stats> {
///         Ok(Stats::default())
///     }
///
///     async fn flag(&self, _id: &str) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Which transport this backend speaks
    fn kind(&self) -> BackendKind;

    /// Classify a prompt
    async fn classify(&self, prompt: &str) -> Result<ClassificationResult>;

    /// Fetch the current usage statistics snapshot
    async fn fetch_stats(&self) -> Result<Stats>;

    /// Mark a stored classification as incorrect
    async fn flag(&self, id: &str) -> Result<()>;
}
