// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Earshot -- a group-chat listening daemon.
//!
//! This is the binary entry point: CLI parsing, config loading, logging
//! setup, and subcommand dispatch. The actual wiring lives in `serve`.

use clap::{Parser, Subcommand};

mod serve;

/// Earshot - listens to group chats and extracts todos, notifications, and
/// activities.
#[derive(Parser, Debug)]
#[command(name = "earshot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the daemon: gateway listener, ingestion, and scheduler.
    Serve,
    /// Run one analysis pass over the backlog and exit.
    Analyze,
    /// Run one expiration sweep and exit.
    Sweep,
    /// Print the resolved configuration (secrets redacted).
    Config,
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match earshot_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            earshot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Serve) | None => serve::run(config).await,
        Some(Commands::Analyze) => serve::run_single_analysis(config).await,
        Some(Commands::Sweep) => serve::run_single_sweep(config).await,
        Some(Commands::Config) => {
            print_config(config);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "fatal");
        std::process::exit(1);
    }
}

/// Print the resolved config as TOML with credentials masked.
fn print_config(mut config: earshot_config::EarshotConfig) {
    if config.gateway.secret.is_some() {
        config.gateway.secret = Some("[redacted]".to_string());
    }
    if config.model.api_key.is_some() {
        config.model.api_key = Some("[redacted]".to_string());
    }
    match toml::to_string_pretty(&config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("could not render config: {e}"),
    }
}
