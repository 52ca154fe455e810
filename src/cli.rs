use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streamdrop")]
#[command(author, version, about = "Short-lived streaming and download links")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the delivery server and the expiry sweeper
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one expiry sweep and exit
    Sweep,

    /// Register a local file or remote URL and print its share links
    Register {
        /// Local file path or http(s) URL
        #[arg(required = true)]
        source: String,

        /// Display name (defaults to the source's file name)
        #[arg(long)]
        name: Option<String>,

        /// Owner recorded for audit
        #[arg(long, default_value = "cli")]
        owner: String,

        /// MIME type (guessed from the name if omitted)
        #[arg(long)]
        content_type: Option<String>,

        /// Retention in days (overrides config)
        #[arg(long)]
        retention_days: Option<u32>,

        /// Size in bytes of a remote file, if known
        #[arg(long, default_value = "0")]
        size: u64,
    },

    /// Show a registered file
    Show {
        /// Share ID
        id: String,
    },

    /// Validate configuration file
    Validate,

    /// Display version information
    Version,
}
