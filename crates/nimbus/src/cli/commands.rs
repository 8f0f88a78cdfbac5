//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use nimbus::{LimitKind, Subscription};
use std::path::PathBuf;

/// Nimbus - usage limits for weather refreshes, recommendations and location changes
#[derive(Parser, Debug)]
#[command(name = "nimbus")]
#[command(about = "Check and spend Nimbus usage limits", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the timestamp log and freshness cache
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Load configuration from this file instead of the default search path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Trust the system clock instead of the configured time service
    #[arg(long, global = true)]
    pub local_clock: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report whether an action is currently allowed
    Check {
        #[command(flatten)]
        target: Target,
    },

    /// Spend one action if the limit allows it
    Consume {
        #[command(flatten)]
        target: Target,
    },

    /// Show every limit for a user
    Status {
        /// User identifier
        #[arg(long)]
        user: String,

        /// Apply premium quotas
        #[arg(long)]
        premium: bool,
    },

    /// Delete expired records for an action
    Prune {
        #[command(flatten)]
        target: Target,
    },

    /// Delete all records for an action
    Reset {
        /// User identifier
        #[arg(long)]
        user: String,

        /// Action kind (current_weather, activity_recommendation, location_change)
        #[arg(long)]
        kind: LimitKind,
    },
}

/// User, action and subscription a command applies to.
#[derive(clap::Args, Debug)]
pub struct Target {
    /// User identifier
    #[arg(long)]
    pub user: String,

    /// Action kind (current_weather, activity_recommendation, location_change)
    #[arg(long)]
    pub kind: LimitKind,

    /// Apply premium quotas
    #[arg(long)]
    pub premium: bool,
}

impl Target {
    /// Subscription implied by the flags.
    pub fn subscription(&self) -> Subscription {
        subscription(self.premium)
    }
}

/// Map the `--premium` flag to a subscription.
pub fn subscription(premium: bool) -> Subscription {
    if premium {
        Subscription::Premium
    } else {
        Subscription::Free
    }
}

/// Output format for command results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One summary line per result
    Human,
    /// Pretty-printed JSON
    Json,
}
