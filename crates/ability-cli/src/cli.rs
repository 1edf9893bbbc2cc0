//! CLI argument definitions for the `abilities` binary.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Run and inspect voice abilities from a terminal.
#[derive(Parser)]
#[command(
    name = "abilities",
    version,
    about = "Console host for voice abilities",
    long_about = "Type what you would say to the speaker. Lines that match an ability's \
                  hotwords start a session; its replies are printed as spoken text."
)]
pub struct Cli {
    /// Configuration file.  Missing files fall back to built-in defaults.
    #[arg(long, short, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered abilities and their hotwords.
    List,

    /// Validate ability manifests (`config.json`) in one or more directories.
    Validate {
        /// Directories holding a `config.json`, or ability subdirectories.
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },

    /// Start the console host.
    Run {
        /// Invoke this ability directly instead of routing by hotword.
        #[arg(long, short)]
        ability: Option<String>,

        /// Whose storage to use.  Defaults to `[general] user`.
        #[arg(long, short)]
        user: Option<String>,
    },
}
