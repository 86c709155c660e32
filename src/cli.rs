// src/cli.rs

//! CLI definitions for outfit.
//!
//! This module contains all command-line interface definitions using
//! clap. The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "outfit")]
#[command(author = "Outfit Project")]
#[command(version)]
#[command(about = "Capture a machine's state and reconcile other machines against it", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the outfit state database
    Init {
        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/outfit/outfit.db")]
        db_path: String,
    },

    /// Capture this machine's state into a descriptor file
    Capture {
        /// Where to write the descriptor
        #[arg(short, long, default_value = "/etc/outfit/machine.toml")]
        output: String,

        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/outfit/outfit.db")]
        db_path: String,

        /// Inventory snapshot file listing installed packages
        #[arg(long)]
        inventory: Option<String>,

        /// Free-form description embedded in the descriptor header
        #[arg(long)]
        description: Option<String>,
    },

    /// Show the changes needed to reach a descriptor's state
    Diff {
        /// Path to the descriptor file
        #[arg(short = 'm', long, default_value = "/etc/outfit/machine.toml")]
        descriptor: String,

        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/outfit/outfit.db")]
        db_path: String,

        /// Inventory snapshot file for the observed package state
        #[arg(long)]
        inventory: Option<String>,

        /// Only diff package state
        #[arg(long, conflicts_with = "prefs_only")]
        packages_only: bool,

        /// Only diff preference state
        #[arg(long)]
        prefs_only: bool,
    },

    /// Check whether this machine matches a descriptor (exit 1 on drift)
    Check {
        /// Path to the descriptor file
        #[arg(short = 'm', long, default_value = "/etc/outfit/machine.toml")]
        descriptor: String,

        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/outfit/outfit.db")]
        db_path: String,

        /// Inventory snapshot file for the observed package state
        #[arg(long)]
        inventory: Option<String>,

        /// List every difference instead of a one-line summary
        #[arg(short, long)]
        verbose: bool,
    },

    /// Apply a descriptor to this machine
    Apply {
        /// Path to the descriptor file
        #[arg(short = 'm', long, default_value = "/etc/outfit/machine.toml")]
        descriptor: String,

        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/outfit/outfit.db")]
        db_path: String,

        /// Inventory snapshot file for the observed package state
        #[arg(long)]
        inventory: Option<String>,

        /// Show what would be applied without making changes
        #[arg(long)]
        dry_run: bool,

        /// Bypass the compatibility gate's version check
        #[arg(long)]
        force: bool,

        /// Only apply package actions
        #[arg(long, conflicts_with = "prefs_only")]
        packages_only: bool,

        /// Only apply preference changes
        #[arg(long)]
        prefs_only: bool,

        /// Per-action timeout in seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },

    /// Show recorded apply runs
    History {
        /// Path to the database file
        #[arg(short, long, default_value = "/var/lib/outfit/outfit.db")]
        db_path: String,

        /// Maximum number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}
