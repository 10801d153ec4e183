//! Nebula CLI
//!
//! Drives the Nebula core against a project directory: merges assistant
//! responses into files, composes the sandboxed preview and reads back the
//! runtime events it posts.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "nebula")]
#[command(author, version, about = "Nebula - AI app builder preview toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default nebula.config.yaml
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        yes: bool,
    },

    /// Merge the code blocks of an assistant response into the project
    Extract {
        /// Response file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Show the writes without touching the directory
        #[arg(long)]
        dry_run: bool,

        /// Feed the response in deltas of this many bytes
        #[arg(long, value_name = "N")]
        stream_chunk: Option<usize>,
    },

    /// Compose the preview document
    Preview {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Output file (defaults to preview.output from the config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Recompose the preview whenever a project file changes
    Dev {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Render an assistant message as chat HTML
    Render {
        /// Message file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Read sandbox messages from stdin, one JSON object per line
    Events {
        /// Generation of the current document
        #[arg(short, long, default_value_t = 0)]
        generation: u64,

        /// Print a repair request for the last error
        #[arg(long)]
        repair: bool,

        /// Extra instruction for the repair request
        #[arg(long, requires = "repair")]
        instruction: Option<String>,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// List project files
    Files {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Validate the project configuration
    Validate {
        /// Project directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "nebula_cli=debug,nebula_core=debug"
        } else {
            "nebula_cli=info"
        })
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    info!("Starting Nebula CLI");

    let result = match cli.command {
        Commands::Init { dir, yes } => commands::init::run(&dir, yes).await,
        Commands::Extract {
            input,
            dir,
            dry_run,
            stream_chunk,
        } => commands::extract::run(input.as_deref(), &dir, dry_run, stream_chunk).await,
        Commands::Preview { dir, out } => commands::preview::run(&dir, out.as_deref()).await,
        Commands::Dev { dir } => commands::dev::run(&dir).await,
        Commands::Render { input } => commands::render::run(input.as_deref()).await,
        Commands::Events {
            generation,
            repair,
            instruction,
            dir,
        } => commands::events::run(generation, repair, instruction.as_deref(), &dir).await,
        Commands::Files { dir } => commands::files::run(&dir).await,
        Commands::Validate { dir } => commands::validate::run(&dir).await,
    };

    if let Err(ref e) = result {
        error!("Command failed: {}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
