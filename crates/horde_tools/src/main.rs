//! Horde - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use horde_core::archetype::ArchetypeRegistry;
use horde_tools::{preview, validate, ToolResult};

#[derive(Parser)]
#[command(name = "horde-tools")]
#[command(about = "Development tools for Horde wave data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Print the wave plan for a catalog
    Preview {
        /// Wave catalog (JSON)
        #[arg(default_value = "assets/data/waves.json")]
        waves_file: PathBuf,

        /// Archetype registry (RON); built-ins when omitted
        #[arg(short, long)]
        archetypes: Option<PathBuf>,

        /// Number of waves to show
        #[arg(short, long, default_value_t = 10)]
        waves: u32,

        /// Living players
        #[arg(short, long, default_value_t = 1)]
        players: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn run_preview(
    waves_file: &std::path::Path,
    archetypes: Option<&std::path::Path>,
    waves: u32,
    players: usize,
    json: bool,
) -> ToolResult<String> {
    let catalog = validate::load_catalog(waves_file)?;
    let registry = match archetypes {
        Some(path) => validate::load_registry(path)?,
        None => ArchetypeRegistry::builtin(),
    };
    let rows = preview::plan(&catalog, &registry, waves, players);
    if json {
        Ok(serde_json::to_string_pretty(&rows)? + "\n")
    } else {
        Ok(preview::render_table(&rows))
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match validate::validate_data_directory(&path) {
                Ok(report) => tracing::info!(
                    waves = report.waves,
                    archetypes = report.archetypes,
                    warnings = report.warnings.len(),
                    "Validation passed"
                ),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Preview {
            waves_file,
            archetypes,
            waves,
            players,
            json,
        } => match run_preview(&waves_file, archetypes.as_deref(), waves, players, json) {
            Ok(output) => print!("{output}"),
            Err(e) => {
                tracing::error!("Preview failed: {e}");
                std::process::exit(1);
            }
        },
    }
}
