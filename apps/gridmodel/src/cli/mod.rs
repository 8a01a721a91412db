//! # gridmodel CLI Module
//!
//! Operator commands over a `GdaSession`.
//!
//! ## Available Commands
//!
//! - `status` - Replay the log and show entity counts
//! - `apply` - Apply a JSON delta file
//! - `import` - Convert JSON import records into one insert delta and apply it
//! - `get` - Show properties of one entity
//! - `extent` - List every entity of a kind
//! - `related` - List entities reached through a reference property
//! - `dump` - Print the whole model

mod commands;

use crate::config::StoreConfig;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use gridmodel_core::{DmsType, Gid, ModelCode};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// gridmodel - power-network model store
///
/// Every invocation replays the delta log before running its command.
#[derive(Parser, Debug)]
#[command(name = "gridmodel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Delta log file (overrides config and environment)
    #[arg(short = 'L', long, global = true)]
    pub log_path: Option<PathBuf>,

    /// Do not flush the log after each commit
    #[arg(long, global = true)]
    pub no_sync: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show model status
    Status,

    /// Apply a delta from a JSON file
    Apply {
        /// Path to the delta file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Import records from a JSON file
    Import {
        /// Path to the records file (a JSON array)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show properties of one entity
    Get {
        /// Entity GID (0x-prefixed hex or decimal)
        #[arg(short, long)]
        gid: Gid,

        /// Property to read (name or 0x code); all properties when omitted
        #[arg(short, long = "attr")]
        attrs: Vec<ModelCode>,
    },

    /// List every entity of a concrete kind
    Extent {
        /// Entity kind (e.g. Switch, Terminal)
        #[arg(short, long)]
        kind: DmsType,

        /// Property to read; all properties of the kind when omitted
        #[arg(short, long = "attr")]
        attrs: Vec<ModelCode>,

        /// Cursor page size
        #[arg(short, long)]
        batch: Option<usize>,
    },

    /// List entities reached from one entity through a reference property
    Related {
        /// Source entity GID
        #[arg(short, long)]
        gid: Gid,

        /// Reference property to follow
        #[arg(short, long)]
        property: ModelCode,

        /// Keep only targets of this class (or a subclass)
        #[arg(short = 't', long = "type")]
        type_filter: Option<ModelCode>,

        /// Property to read from each target
        #[arg(short, long = "attr")]
        attrs: Vec<ModelCode>,
    },

    /// Print every entity with all of its properties
    Dump,
}

impl Cli {
    /// Defaults, then the config file, then the environment, then flags.
    pub fn store_config(&self) -> Result<StoreConfig, AppError> {
        let base = match &self.config {
            Some(path) => StoreConfig::load(path)?,
            None => StoreConfig::default(),
        };
        let mut config = base.with_env();
        if let Some(path) = &self.log_path {
            config.log_path.clone_from(path);
        }
        if self.no_sync {
            config.sync_on_commit = false;
        }
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let config = cli.store_config()?;
    let json_mode = cli.json;

    match cli.command {
        Some(Commands::Apply { file }) => cmd_apply(&config, json_mode, &file),
        Some(Commands::Import { file }) => cmd_import(&config, json_mode, &file),
        Some(Commands::Get { gid, attrs }) => cmd_get(&config, json_mode, gid, &attrs),
        Some(Commands::Extent { kind, attrs, batch }) => {
            cmd_extent(&config, json_mode, kind, &attrs, batch)
        }
        Some(Commands::Related {
            gid,
            property,
            type_filter,
            attrs,
        }) => cmd_related(&config, json_mode, gid, property, type_filter, &attrs),
        Some(Commands::Dump) => cmd_dump(&config, json_mode),
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
    }
}
