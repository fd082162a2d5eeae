mod app;
mod cli;
mod config;
mod db;
mod error;
mod http;
mod paths;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging();
    app::run(cli)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("XKCD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
