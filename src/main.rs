use std::path::PathBuf;

use clap::{Parser, Subcommand};

use yt_snapshot::commands;
use yt_snapshot::commands::extract::ExtractOptions;
use yt_snapshot::config::{config_path, load_env};
use yt_snapshot::diagnostics::init_logger;

#[derive(Parser)]
#[command(name = "yt-snapshot")]
#[command(about = "Extract channel analytics and video statistics into a yearly JSON snapshot")]
#[command(version)]
struct Cli {
    /// Path to config.json (default: ~/.yt-snapshot/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full extraction and write the snapshot
    Extract {
        /// Channel ID (overrides the config file)
        #[arg(short = 'C', long)]
        channel: Option<String>,

        /// Number of past years to analyze, in addition to the current one
        #[arg(short, long)]
        years: Option<u32>,

        /// Output file (overrides the config file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Authorize access and store the token
    Auth,

    /// Write a default config file
    Init {
        /// Channel ID to store in the config
        #[arg(short = 'C', long)]
        channel: Option<String>,

        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Summarize a previously written snapshot
    Summary {
        /// Snapshot file (default: the configured output file)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    load_env();

    let cli = Cli::parse();
    if let Err(e) = init_logger(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let config_file = cli.config.unwrap_or_else(config_path);

    let result = match cli.command {
        Commands::Extract {
            channel,
            years,
            output,
        } => {
            commands::extract::run(ExtractOptions {
                config_path: config_file,
                channel,
                years,
                output,
            })
            .await
        }
        Commands::Auth => commands::auth::run(&config_file).await,
        Commands::Init { channel, force } => commands::init::run(&config_file, channel, force),
        Commands::Summary { path } => match path {
            Some(path) => commands::summary::run(&path),
            None => commands::load_resolved_config(&config_file)
                .and_then(|config| commands::summary::run(&config.output_file)),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
