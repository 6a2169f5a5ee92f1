//! apexres - APEX content resolution
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Loads a module graph snapshot and resolves what each APEX container
//! installs.
//!
//! # Snapshot Layout
//!
//! ```text
//! [config]              # GlobalConfig, overridable from APEXRES_* variables
//! [[modules]]           # one entry per module variant, with `deps`
//! [[containers]]        # container declarations
//! [overrides.<name>]    # override_apex entries keyed by base name
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "apexres")]
#[command(author, version, about = "apexres - resolve APEX container content")]
pub struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve container content and print the packaged artifacts
    Resolve {
        /// Module graph snapshot (.toml or .json)
        #[arg(long, short = 'g', env = "APEXRES_GRAPH")]
        graph: PathBuf,
        /// Containers to report (all if empty)
        #[arg(long, short = 'c')]
        container: Vec<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the per-target dependency requests of a container
    Fanout {
        /// Module graph snapshot (.toml or .json)
        #[arg(long, short = 'g', env = "APEXRES_GRAPH")]
        graph: PathBuf,
        /// Container name
        #[arg(long, short = 'c')]
        container: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Resolve and validate containers, failing if any has errors
    Check {
        /// Module graph snapshot (.toml or .json)
        #[arg(long, short = 'g', env = "APEXRES_GRAPH")]
        graph: PathBuf,
        /// Containers to check (all if empty)
        #[arg(long, short = 'c')]
        container: Vec<String>,
    },
}
