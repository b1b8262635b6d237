//! Command-line interface definition for Guardchat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat plus one-shot classify, stats, and flag
//! commands.

use clap::{Parser, Subcommand};

/// Guardchat - guardrail classification chat client
///
/// Submit text to a content-classification service over GraphQL or REST,
/// with automatic fallback between the two.
#[derive(Parser, Debug, Clone)]
#[command(name = "guardchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Preferred transport (graphql, rest)
    #[arg(long, global = true)]
    pub primary: Option<String>,

    /// Override the REST base URL
    #[arg(long, global = true)]
    pub rest_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Guardchat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive classification chat
    Chat,

    /// Classify a single prompt and print the verdict
    Classify {
        /// Text to classify
        prompt: String,
    },

    /// Show collected usage statistics
    Stats {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Flag a previous classification as incorrect
    Flag {
        /// Classification identifier returned by `classify`
        id: String,
    },

    /// Show which transports were resolved from configuration
    Transport,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            primary: None,
            rest_url: None,
            command: Commands::Chat,
        }
    }
}
