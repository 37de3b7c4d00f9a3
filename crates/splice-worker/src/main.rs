//! Splice CLI.
//!
//! Usage:
//!   splice probe <FILES..>           Print clip metadata as JSON
//!   splice join <FILES..> -o NAME    Join clips in order
//!   splice check                     Check for FFmpeg and FFprobe

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use splice_worker::{init_tracing, WorkerConfig};

mod commands;

#[derive(Parser)]
#[command(name = "splice", about = "Join video clips in order", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print metadata for each clip
    Probe {
        /// Clip files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Skip thumbnail capture
        #[arg(long)]
        no_thumbnails: bool,
    },

    /// Concatenate clips in the given order
    Join {
        /// Clip files, in output order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file name, placed in the output directory
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        encoding: commands::join::EncodingArgs,

        /// Skip thumbnail capture while probing inputs
        #[arg(long)]
        no_thumbnails: bool,
    },

    /// Check that FFmpeg and FFprobe can be found
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();

    match cli.command {
        Commands::Probe {
            files,
            no_thumbnails,
        } => commands::probe::run(config, files, no_thumbnails).await,
        Commands::Join {
            files,
            output,
            encoding,
            no_thumbnails,
        } => commands::join::run(config, files, output, encoding, no_thumbnails).await,
        Commands::Check => commands::check::run(&config),
    }
}
