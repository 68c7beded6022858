use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dvrflow")]
#[command(author, version, about = "Finished-recording to transcode job pipeline")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Turn finished-recording notifications into work orders
    Publish,

    /// Fetch and transcode work orders
    Work {
        /// Join this shared-subscription group (overrides the config)
        #[arg(long)]
        share_group: Option<String>,
    },

    /// Print finished-recording notifications as they arrive
    Listen,

    /// Inspect or edit the scheduled-recordings ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerCommands,
    },

    /// Show the work order a notification would produce, without publishing
    Derive {
        /// JSON file holding a notification batch or a single entry
        #[arg(required = true)]
        notification: PathBuf,

        /// Local copy of the recording to inspect and probe
        #[arg(long)]
        sample: Option<PathBuf>,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Report whether a recording has been scheduled
    Check { uuid: String },

    /// Record a recording as scheduled so it is never published
    Mark { uuid: String },

    /// List the most recently scheduled recordings
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}
