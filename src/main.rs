//! Depline CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{AnalyzeArgs, DiffArgs, Level};
use config::Config;

#[derive(Parser)]
#[command(name = "depline")]
#[command(about = "Versioned dependency graphs and dependency diffs for Java projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Workspace root holding `depline.toml` and the stored graph (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze sources as a new version of a project
    Analyze(AnalyzeArgs),
    /// Report dependencies added and removed between two versions
    Diff(DiffArgs),
    /// List the analyzed versions of a project
    Versions {
        #[arg(short, long)]
        project: String,
    },
    /// Print a project's structure and dependencies at a version
    Show {
        #[arg(short, long)]
        project: String,

        /// Defaults to the latest version
        #[arg(long = "version")]
        version: Option<String>,
    },
    /// Collapse a version's dependencies to one structural level
    Rollup {
        #[arg(short, long)]
        project: String,

        #[arg(long = "version")]
        version: String,

        #[arg(short, long, value_enum, default_value = "package")]
        level: Level,
    },
    /// Clear the stored graph
    Clear,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "depline={0},depline_core={0},depline_indexer={0}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Depline v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Workspace root: {}", cli.root.display());

    let config = Config::load(&cli.root)?;

    match cli.command {
        Commands::Analyze(args) => commands::analyze(cli.root, config, args).await,
        Commands::Diff(args) => commands::diff(cli.root, config, args),
        Commands::Versions { project } => commands::versions(cli.root, config, project),
        Commands::Show { project, version } => commands::show(cli.root, config, project, version),
        Commands::Rollup {
            project,
            version,
            level,
        } => commands::rollup_view(cli.root, config, project, version, level),
        Commands::Clear => commands::clear(cli.root),
        Commands::Version => {
            println!("Depline v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
