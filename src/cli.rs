// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollwright")]
#[command(about = "Phased cloud deployment orchestrator with adaptive retries and circuit breaking")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new rollwright.yml configuration file
    Init {
        /// Stack name for the sample deployment
        #[arg(long)]
        stack: Option<String>,

        /// Deployment type for the sample deployment (simple, spot, ondemand)
        #[arg(long = "type")]
        deployment_type: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the deployments defined in the manifest
    Run {
        /// Manifest path (default: discover in the current directory)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Only run these deployment ids (and what they depend on)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Skip step commands for every deployment
        #[arg(long)]
        dry_run: bool,

        /// Final status format: summary, detailed, or structured
        #[arg(long, default_value = "summary")]
        format: String,
    },

    /// Classify a provider error message
    Classify {
        /// Error text as printed by the provider CLI
        text: String,

        /// Operation the error came from
        #[arg(long, default_value = "cli")]
        context: String,

        /// Exit code of the failed command
        #[arg(long, default_value_t = 1)]
        exit_code: i32,
    },

    /// Show the phase catalog
    Phases {
        /// Manifest whose timeout overrides should be applied
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
