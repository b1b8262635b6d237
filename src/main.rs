//! Guardchat - guardrail classification chat client
//!
#![doc = "Guardchat - guardrail classification chat client"]
#![doc = "Main entry point for the guardchat binary."]

use anyhow::Result;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use guardchat::cli::{Cli, Commands};
use guardchat::commands;
use guardchat::config::Config;
use guardchat::router::FallbackRouter;
use guardchat::transport::TransportDescriptor;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Resolved once; every operation of the process shares it
    let descriptor = TransportDescriptor::resolve(&config.transport);
    tracing::debug!("Transport order: {:?}", descriptor.order());

    match cli.command {
        Commands::Transport => {
            commands::transport::run_transport(&descriptor);
            Ok(())
        }
        Commands::Chat => commands::chat::run_chat(config, build_router(descriptor)?).await,
        Commands::Classify { prompt } => {
            commands::classify::run_classify(build_router(descriptor)?, &prompt).await
        }
        Commands::Stats { json } => {
            commands::stats::run_stats(build_router(descriptor)?, json).await
        }
        Commands::Flag { id } => commands::flag::run_flag(build_router(descriptor)?, &id).await,
    }
}

fn build_router(descriptor: TransportDescriptor) -> Result<Arc<FallbackRouter>> {
    Ok(Arc::new(FallbackRouter::new(descriptor)?))
}

/// Initialize tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise `guardchat=info`, or
/// `guardchat=debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "guardchat=debug"
    } else {
        "guardchat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
