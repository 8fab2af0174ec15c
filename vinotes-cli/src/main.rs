//! vinotes CLI - maintenance tools for the tasting-note store

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use vinotes_core::services::DEFAULT_SQL_FILE;

mod commands;
mod output;

use commands::{logs, migrate, normalize};

/// vinotes - maintenance tools for the tasting-note store
#[derive(Parser)]
#[command(name = "vinotes", version, about, long_about = None)]
struct Cli {
    /// Env file to read SUPABASE_* variables from
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a schema migration for manual execution in the dashboard
    Migrate {
        /// SQL file to report
        #[arg(short, long, default_value = DEFAULT_SQL_FILE)]
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite absolute image URLs into /api/images/ paths
    Normalize {
        /// Table holding the image URLs
        #[arg(long, default_value = "tasting_notes")]
        table: String,
        /// Primary key column
        #[arg(long, default_value = "id")]
        id_column: String,
        /// Image URL column
        #[arg(long, default_value = "image_url")]
        url_column: String,
        /// Also rewrite https://<host>/api/images/... to /api/images/...
        #[arg(long)]
        strip_api_origin: bool,
        /// Show what would change without prompting or writing
        #[arg(long)]
        dry_run: bool,
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the run log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let env_file = cli.env_file.as_deref();

    match cli.command {
        Commands::Migrate { file, json } => migrate::run(env_file, &file, json),
        Commands::Normalize {
            table,
            id_column,
            url_column,
            strip_api_origin,
            dry_run,
            yes,
            json,
        } => normalize::run(
            env_file,
            normalize::NormalizeArgs {
                table,
                id_column,
                url_column,
                strip_api_origin,
                dry_run,
                yes,
                json,
            },
        ),
        Commands::Logs { command } => logs::run(command),
    }
}
