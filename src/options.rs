//! CLI and runtime options (`SPEC_FULL.md` §5.I). `clap` parses the command
//! line into [`Cli`]; core modules never import `clap` themselves, they
//! only see the plain [`Options`] value this module derives from it.

use std::path::PathBuf;

use clap::Parser;

/// Recursively mirror a site to a local directory tree.
#[derive(Parser, Debug)]
#[command(name = "reaper")]
#[command(about = "Recursive web archiver: BFS crawl over HTTP/1.1")]
#[command(version)]
pub struct Cli {
    /// Seed URL to start crawling from.
    pub url: String,

    /// How many BFS generations (link hops) to follow from the seed.
    #[arg(short, long, default_value = "3")]
    pub depth: u32,

    /// Seconds to sleep between requests.
    #[arg(long, default_value = "1")]
    pub delay: u64,

    /// Follow links to other hosts, not just the seed's own host.
    #[arg(long)]
    pub xdomain: bool,

    /// Force TLS even if the seed URL is `http://`.
    #[arg(long)]
    pub tls: bool,

    /// Directory to write the mirror into. Defaults to
    /// `$REAPER_ARCHIVE_ROOT`, falling back to `<home>/WR_Reaped`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Resolved runtime configuration, derived once from [`Cli`] plus
/// environment/filesystem defaults.
#[derive(Debug, Clone)]
pub struct Options {
    pub seed_url: String,
    pub depth: u32,
    pub delay_secs: u64,
    pub allow_xdomain: bool,
    pub force_tls: bool,
    pub archive_root: PathBuf,
}

impl Options {
    #[must_use]
    pub fn from_cli(cli: Cli) -> Self {
        let archive_root = cli.output.unwrap_or_else(default_archive_root);
        Self {
            seed_url: cli.url,
            depth: cli.depth,
            delay_secs: cli.delay,
            allow_xdomain: cli.xdomain,
            force_tls: cli.tls,
            archive_root,
        }
    }
}

/// `$REAPER_ARCHIVE_ROOT` if set, else `<home>/WR_Reaped`, else the current
/// directory (if `dirs::home_dir` can't resolve one, which only happens on
/// exotic platforms/sandboxes).
fn default_archive_root() -> PathBuf {
    if let Ok(root) = std::env::var("REAPER_ARCHIVE_ROOT") {
        return PathBuf::from(root);
    }
    dirs::home_dir()
        .map(|home| home.join("WR_Reaped"))
        .unwrap_or_else(|| PathBuf::from("WR_Reaped"))
}
