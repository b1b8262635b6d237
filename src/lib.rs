//! Guardchat - guardrail classification chat client library
//!
//! Submits user text to a content-classification service that labels it SAFE
//! or MISUSE, keeps a conversation log of verdicts, lets the user flag
//! incorrect verdicts, and shows aggregate usage statistics.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `transport`: Resolves which transports are usable from configuration
//! - `backends`: Shared data model plus the GraphQL and REST adapters
//! - `router`: Dispatches operations with one fallback between transports
//! - `conversation`: Message log and submission state machine
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Handlers for the CLI commands
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use guardchat::{Config, FallbackRouter, TransportDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let descriptor = TransportDescriptor::resolve(&config.transport);
//!     let router = Arc::new(FallbackRouter::new(descriptor)?);
//!     let verdict = router.classify("What are investment strategies?").await?;
//!     println!("{}", verdict.predicted_class);
//!     Ok(())
//! }
//! ```

pub mod backends;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod router;
pub mod transport;

// Re-export commonly used types
pub use backends::{BackendKind, ClassificationResult, ClassifierBackend, Stats, Verdict};
pub use config::Config;
pub use conversation::{Conversation, ConversationEvent, ConversationState, Message, Role};
pub use error::{GuardchatError, Result};
pub use router::FallbackRouter;
pub use transport::TransportDescriptor;

#[cfg(test)]
pub mod test_utils;
