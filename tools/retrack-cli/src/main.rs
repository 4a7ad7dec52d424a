//! Retrack CLI — Rebuild a project's audio track from its edit decision list.
//!
//! Usage:
//!   retrack rebuild <EDL>    Rebuild the audio timeline
//!   retrack info <EDL>       Show EDL information
//!   retrack check            Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "retrack",
    about = "Sample-accurate audio timeline reconstruction from edit decision lists",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the audio timeline described by an EDL file
    Rebuild {
        /// Path to the EDL JSON file
        edl: PathBuf,

        /// Output file path (defaults next to the EDL)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "wav")]
        format: String,

        /// Clip fade duration in milliseconds
        #[arg(long, default_value = "5.0")]
        fade: f64,

        /// Skip the external enhancement step
        #[arg(long)]
        skip_enhance: bool,

        /// Enhancement command template ({input} and {output} placeholders)
        #[arg(long)]
        enhance_cmd: Option<String>,

        /// Enhancement timeout in seconds
        #[arg(long, default_value = "900")]
        enhance_timeout_secs: u64,

        /// Keep the intermediate work directory
        #[arg(long)]
        keep_workdir: bool,
    },

    /// Show EDL information
    Info {
        /// Path to the EDL JSON file
        edl: PathBuf,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    retrack_common::logging::init_logging(&retrack_common::logging::LoggingConfig {
        level: log_level.to_string(),
        json: false,
    });

    match cli.command {
        Commands::Rebuild {
            edl,
            output,
            format,
            fade,
            skip_enhance,
            enhance_cmd,
            enhance_timeout_secs,
            keep_workdir,
        } => {
            commands::rebuild::run(commands::rebuild::RebuildArgs {
                edl,
                output,
                format,
                fade_ms: fade,
                skip_enhance,
                enhance_cmd,
                enhance_timeout_secs,
                keep_workdir,
            })
            .await
        }
        Commands::Info { edl } => commands::info::run(edl),
        Commands::Check => commands::check::run(),
    }
}
