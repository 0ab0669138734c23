#![cfg(not(tarpaulin_include))]

use mess_feedback::app;
use mess_feedback::config::Config;

/// Main entry point for the feedback web application
///
/// Reads the configuration from the environment and serves until Ctrl+C or
/// SIGTERM. Logging is controlled through `RUST_LOG` (default `info`).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    app::run(config).await
}
