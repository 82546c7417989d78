//! CLI for the metacache metadata service.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use metacache_core::config;

use commands::{run_collect, run_lookup, run_serve};

/// Top-level CLI for metacache.
#[derive(Debug, Parser)]
#[command(name = "metacache")]
#[command(about = "metacache: cache of page headers, cookies and source, keyed by URL", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind, overriding `listen_addr` from the config.
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
        /// Keep records in process memory instead of SQLite (lost on exit).
        #[arg(long)]
        memory: bool,
    },

    /// Print the cached record for a URL, if any. Never fetches.
    Lookup {
        /// URL to look up; normalized before the cache read.
        url: String,
    },

    /// Fetch a URL now, store the result and print it.
    Collect {
        /// HTTP/HTTPS URL to collect.
        url: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Serve { listen, memory } => run_serve(&cfg, listen, memory).await?,
            CliCommand::Lookup { url } => run_lookup(&cfg, &url).await?,
            CliCommand::Collect { url } => run_collect(&cfg, &url).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
