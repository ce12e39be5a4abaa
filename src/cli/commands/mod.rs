//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod documents;
mod helpers;
mod ingest;
mod init;
mod process;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "redline")]
#[command(about = "Contract document intake and analysis pipeline")]
#[command(version)]
pub struct Cli {
    /// Target directory or database file (overrides config file).
    /// Can be a directory containing redline.db or a .db file directly.
    #[arg(long, short = 'd', global = true)]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the web server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:3030)
        #[arg(default_value = "127.0.0.1:3030")]
        bind: String,

        /// Skip automatic database migration on startup
        #[arg(long)]
        no_migrate: bool,
    },

    /// Ingest a contract file into the pipeline
    Ingest {
        /// File to ingest
        file: PathBuf,
        /// Content type (MIME type, auto-detected if not specified)
        #[arg(short = 't', long)]
        content_type: Option<String>,
        /// Document name (defaults to the file name)
        #[arg(short = 'n', long)]
        name: Option<String>,
        /// Run the processing pipeline immediately after ingest
        #[arg(short, long)]
        process: bool,
    },

    /// Run the processing pipeline for a document
    Process {
        /// Document ID
        document_id: String,
        /// Reset a failed document back to PENDING before running
        #[arg(long)]
        retry: bool,
        /// Per-stage timeout in seconds (default: from config)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Detect and restart documents stuck mid-pipeline
    Recover {
        /// Staleness threshold in seconds (default: from config)
        #[arg(long)]
        staleness: Option<u64>,
        /// Maximum documents to restart in one sweep (default: from config)
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show pipeline status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List documents in the repository
    List {
        /// Filter by status (e.g. PENDING, COMPLETED, ERROR)
        #[arg(short, long)]
        status: Option<String>,
        /// Limit number of results
        #[arg(short, long, default_value = "50")]
        limit: i64,
        /// Skip this many results
        #[arg(short, long, default_value = "0")]
        offset: i64,
        /// Output format (table, json, ids)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Query the processing ledger
    Logs {
        /// Filter by document ID
        #[arg(long)]
        document: Option<String>,
        /// Filter by action (e.g. CONVERSION, CONTRACT_ANALYSIS)
        #[arg(long)]
        action: Option<String>,
        /// Filter by source (USER, BACKGROUND, RECOVERY)
        #[arg(long)]
        source: Option<String>,
        /// Filter by status (SUCCESS, ERROR, SKIPPED)
        #[arg(long)]
        status: Option<String>,
        /// Substring search across description and metadata
        #[arg(long)]
        search: Option<String>,
        /// Limit number of results
        #[arg(short, long, default_value = "50")]
        limit: i64,
        /// Skip this many results
        #[arg(short, long, default_value = "0")]
        offset: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind, no_migrate } => {
            serve::cmd_serve(&settings, &bind, no_migrate).await
        }
        Commands::Ingest {
            file,
            content_type,
            name,
            process,
        } => {
            ingest::cmd_ingest(
                &settings,
                &file,
                content_type.as_deref(),
                name.as_deref(),
                process,
            )
            .await
        }
        Commands::Process {
            document_id,
            retry,
            timeout,
        } => process::cmd_process(&settings, &document_id, retry, timeout).await,
        Commands::Recover { staleness, limit } => {
            process::cmd_recover(&settings, staleness, limit).await
        }
        Commands::Status { json } => documents::cmd_status(&settings, json).await,
        Commands::List {
            status,
            limit,
            offset,
            format,
        } => documents::cmd_list(&settings, status.as_deref(), limit, offset, &format).await,
        Commands::Logs {
            document,
            action,
            source,
            status,
            search,
            limit,
            offset,
            json,
        } => {
            documents::cmd_logs(
                &settings,
                document,
                action,
                source,
                status,
                search,
                limit,
                offset,
                json,
            )
            .await
        }
    }
}
