use metacache_core::logging;

mod cli;
mod http;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; an unwritable state dir is not fatal.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("metacache error: {:#}", err);
        std::process::exit(1);
    }
}
