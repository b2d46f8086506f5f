//! Command line definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Inspect template namespace resolution for an installation file.
#[derive(Debug, Parser)]
#[command(name = "tplns", version)]
pub struct Cli {
    /// SQLite file used to cache resolved namespaces between runs
    #[arg(long, global = true, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the resolved namespaces of one theme
    Namespaces {
        /// Installation file (JSON)
        installation: PathBuf,

        /// Theme to resolve instead of the installation's active theme
        #[arg(long)]
        theme: Option<String>,
    },

    /// Locate the file a template reference resolves to
    Find {
        /// Installation file (JSON)
        installation: PathBuf,

        /// Template reference, e.g. `@zen/cards/card.twig`
        template: String,

        #[arg(long)]
        theme: Option<String>,
    },

    /// List protected namespaces and the contributions dropped because of them
    Protected {
        /// Installation file (JSON)
        installation: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
