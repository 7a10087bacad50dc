//! Chefpup: media server and playback controller for the conversation demo.
//!
//! - [`server`] streams the videos and clips, and stores uploads.
//! - [`playback`] sequences the conversation on the page side.

pub mod config;
pub mod error;
pub mod playback;
pub mod server;

use anyhow::{Context, Result};
use clap::Parser;

use config::{Cli, MediaConfig};

/// Parses the command line, sets up logging and runs the server to completion.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = MediaConfig::from_cli(&cli)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(server::start_server(config))
}
