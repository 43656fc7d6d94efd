//! `reaper` CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reaper::display::{Display, NullDisplay, TerminalDisplay};
use reaper::engine::Engine;
use reaper::options::{Cli, Options};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let opts = Options::from_cli(cli);
    info!(seed = %opts.seed_url, depth = opts.depth, "starting crawl");

    let dashboard;
    let null;
    let display: &dyn Display = if atty_stdout() {
        dashboard = TerminalDisplay::new();
        &dashboard
    } else {
        null = NullDisplay;
        &null
    };

    let mut engine = Engine::new(opts, display);
    let reaped = engine
        .run()
        .context("crawl aborted with a fatal error")?;

    info!(reaped, "crawl finished");
    Ok(())
}

fn atty_stdout() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}
