//! Command-line surface (SPEC_FULL §2 item 14): a thin `run`/`status`/
//! `check-config` wrapper around the daemon process, grounded on the
//! teacher's `cli/mod.rs` (`clap::Parser` top-level struct holding a global
//! `--config` path plus a `Subcommand` enum).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tradebot-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook listener in the foreground.
    Run,
    /// Query a running instance's `/healthz` endpoint.
    Status {
        /// Base URL of the running instance.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
    /// Load and validate the configuration file without starting anything.
    CheckConfig,
}
