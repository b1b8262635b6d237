//! Error types for Guardchat
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use crate::backends::BackendKind;
use thiserror::Error;

/// Main error type for Guardchat operations
///
/// Absent GraphQL configuration is not represented here: it
/// resolves to a REST-only [`TransportDescriptor`](crate::transport::TransportDescriptor)
/// instead of failing.
#[derive(Error, Debug)]
pub enum GuardchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single transport failed (network, malformed response, or backend error)
    ///
    /// This is the only error the backend adapters produce, and the only
    /// error the router falls back on.
    #[error("Transport error ({backend}): {message}")]
    Transport {
        /// Backend that produced the failure
        backend: BackendKind,
        /// Human readable cause
        message: String,
    },

    /// Both the preferred and the fallback transport failed
    #[error("All transports failed: {primary}; fallback: {secondary}")]
    BothTransportsFailed {
        /// Failure reported by the preferred transport
        primary: String,
        /// Failure reported by the fallback transport (propagated cause)
        #[source]
        secondary: Box<GuardchatError>,
    },

    /// A message was asked to be flagged but carries no verdict
    #[error("Message cannot be flagged: {0}")]
    NotFlaggable(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GuardchatError {
    /// Build a transport error for the given backend
    pub fn transport(backend: BackendKind, message: impl Into<String>) -> Self {
        Self::Transport {
            backend,
            message: message.into(),
        }
    }

    /// Returns true for errors that the fallback router may recover from
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Result type alias for Guardchat operations
///
/// Uses `anyhow::Error` so callers can attach context; typed failures are
/// recovered with `downcast_ref::<GuardchatError>()`.
pub type Result<T> = anyhow::Result<T>;

/// Returns true if the error wraps a [`GuardchatError::Transport`]
pub fn is_transport_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<GuardchatError>()
        .map(GuardchatError::is_transport)
        .unwrap_or(false)
}
