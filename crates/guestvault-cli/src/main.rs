//! Operator CLI for the guest data store
//!
//! Works directly on the partition files under the data directory. No remote
//! is configured, so `pending` reports every attempt as failed.

use anyhow::Result;
use clap::{Parser, Subcommand};
use guestvault_cli::{commands, load_config, open_service};
use guestvault_core::{ActorId, Location, RecordId};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guestvault")]
#[command(about = "Guestvault - Permission-Scoped Guest Data Store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overriding the config file
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Actor recorded in audit entries
    #[arg(short, long, global = true, default_value = "operator")]
    actor: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show per-partition statistics
    Stats {
        /// Only this partition
        #[arg(short, long)]
        location: Option<Location>,
    },

    /// List records visible from a partition
    List {
        /// Partition to list
        #[arg(short, long, default_value = "reception")]
        location: Location,
    },

    /// Show one record
    Show {
        /// Record identifier
        id: RecordId,

        /// Partition to read from
        #[arg(short, long, default_value = "manager")]
        location: Location,
    },

    /// Import records from a JSON array
    Import {
        /// File to import
        file: PathBuf,

        /// Partition the records are created at
        #[arg(short, long, default_value = "reception")]
        location: Location,
    },

    /// Run one retention sweep
    Sweep,

    /// Attempt every pending record once
    Pending,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref(), cli.data_dir)?;
    let service = open_service(&config).await?;
    let actor = ActorId::new(cli.actor);

    let result = match cli.command {
        Commands::Stats { location } => {
            let locations = match location {
                Some(location) => vec![location],
                None => Location::ALL.to_vec(),
            };
            print_json(&commands::stats(&service, &locations).await?)
        }
        Commands::List { location } => {
            print_json(&commands::list(&service, location, &actor).await?)
        }
        Commands::Show { id, location } => {
            print_json(&commands::show(&service, id, location, &actor).await?)
        }
        Commands::Import { file, location } => {
            print_json(&commands::import(&service, &file, location, &actor).await?)
        }
        Commands::Sweep => print_json(&commands::sweep(&service).await?),
        Commands::Pending => print_json(&commands::pending(&service).await?),
    };

    service.shutdown();
    result
}
