// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod commands;
mod runtime;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cadenza plugin runtime.
#[derive(Parser, Debug)]
#[command(name = "cadenza", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and load plugins.
    Plugins {
        #[command(subcommand)]
        action: PluginsCommand,
    },
    /// Query metadata providers.
    Tracks {
        #[command(subcommand)]
        action: TracksCommand,
    },
    /// Resolve a track id to a playable stream.
    Resolve { track_id: String },
    /// List or run track actions contributed by plugins.
    Actions {
        #[command(subcommand)]
        action: ActionsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PluginsCommand {
    /// Show every installable plugin and its status.
    List,
    /// Search installable plugins by id, name, or description.
    Search { query: String },
    /// Load a plugin with its configured settings.
    Load { id: String },
}

#[derive(Subcommand, Debug)]
enum TracksCommand {
    /// Search tracks across metadata providers.
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ActionsCommand {
    /// List actions offered for a track.
    List { track_id: String },
    /// Run one action on a track.
    Run {
        track_id: String,
        action_id: String,
        /// Plugin that owns the action.
        #[arg(long)]
        plugin: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => cadenza_config::load_and_validate_path(path),
        None => cadenza_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            cadenza_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.runtime.log_level);

    let mut runtime = runtime::Runtime::start(&config).await;
    let result = match cli.command {
        Commands::Plugins { action } => match action {
            PluginsCommand::List => commands::list_plugins(&runtime, cli.json).await,
            PluginsCommand::Search { query } => commands::search_plugins(&runtime, &query, cli.json),
            PluginsCommand::Load { id } => commands::load_plugin(&mut runtime, &id, cli.json).await,
        },
        Commands::Tracks {
            action: TracksCommand::Search { query, limit },
        } => commands::search_tracks(&runtime, &query, limit, cli.json).await,
        Commands::Resolve { track_id } => commands::resolve(&runtime, &track_id, cli.json).await,
        Commands::Actions { action } => match action {
            ActionsCommand::List { track_id } => {
                commands::list_actions(&runtime, &track_id, cli.json).await
            }
            ActionsCommand::Run {
                track_id,
                action_id,
                plugin,
            } => commands::run_action(&runtime, &track_id, &action_id, &plugin, cli.json).await,
        },
    };
    runtime.shutdown().await;

    if let Err(e) = result {
        let notice = e.user_notice();
        eprintln!("cadenza: {}", notice.message);
        if let Some(description) = notice.description {
            eprintln!("  {description}");
        }
        tracing::debug!(error = %e, "command failed");
        std::process::exit(1);
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let level = log_level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cadenza={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
