//! Horde - Match Server

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use horde_server::{MatchServer, ServerConfig};

/// Run one authoritative wave-survival match.
#[derive(Parser, Debug)]
#[command(name = "horde_server")]
#[command(about = "Headless authoritative match server")]
#[command(version)]
struct Args {
    /// Server config (RON). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wave catalog (JSON); overrides the config file.
    #[arg(short, long)]
    waves: Option<PathBuf>,

    /// Archetype registry (RON); overrides the config file.
    #[arg(short, long)]
    archetypes: Option<PathBuf>,

    /// Player names; overrides the config roster.
    #[arg(short, long, value_delimiter = ',')]
    players: Vec<String>,

    /// RNG seed.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(waves) = self.waves {
            config.waves_path = Some(waves);
        }
        if let Some(archetypes) = self.archetypes {
            config.archetypes_path = Some(archetypes);
        }
        if !self.players.is_empty() {
            config.players = self.players;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if self.max_ticks.is_some() {
            config.max_ticks = self.max_ticks;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::info!("Starting Horde match server");

    let mut config = match args.config.as_deref() {
        Some(path) => match ServerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Could not load server config");
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    args.apply(&mut config);
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid server config");
        return ExitCode::FAILURE;
    }
    if config.players.is_empty() {
        config.players.push("player1".to_string());
    }

    let (server, _handle) = MatchServer::from_config(config);
    let (reason, summary) = server
        .run(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await;
    tracing::info!(?reason, "Match finished");

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Could not encode match summary");
            ExitCode::FAILURE
        }
    }
}
