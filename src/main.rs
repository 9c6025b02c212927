// ABOUTME: Entry point for the rollwright CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use rollwright::config::{self, Manifest};
use rollwright::deploy::{PhaseCatalog, StatusFormat};
use rollwright::error::{Error, Result};
use rollwright::output::{Output, OutputMode};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli.command, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

fn load_manifest(file: Option<&Path>) -> Result<Manifest> {
    match file {
        Some(path) => Manifest::load(path),
        None => Manifest::discover(&env::current_dir()?),
    }
}

async fn run(command: Commands, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);
    match command {
        Commands::Init {
            stack,
            deployment_type,
            force,
        } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, stack.as_deref(), deployment_type.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Run {
            file,
            only,
            dry_run,
            format,
        } => {
            let format: StatusFormat = format.parse().map_err(Error::Deploy)?;
            let manifest = load_manifest(file.as_deref())?;
            commands::run(manifest, &only, dry_run, format, output).await
        }
        Commands::Classify {
            text,
            context,
            exit_code,
        } => commands::classify_error(&text, &context, exit_code, &output),
        Commands::Phases { file } => {
            let catalog = match file {
                Some(path) => Manifest::load(&path)?.phases.catalog()?,
                None => PhaseCatalog::standard(),
            };
            commands::show_phases(&catalog, &output)
        }
    }
}
