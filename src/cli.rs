//! CLI struct definitions for the objlint command-line interface.
//!
//! Running with no flags scans the current directory with one worker per core.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "objlint",
    version = env!("CARGO_PKG_VERSION"),
    about = "Check that every behavior-tree XML file under a directory carries a complete objective description."
)]
pub(crate) struct Cli {
    /// Directory to scan (defaults to the current working directory).
    #[clap(short, long)]
    pub root: Option<PathBuf>,
    /// Worker threads (defaults to one per available core).
    #[clap(short, long)]
    pub jobs: Option<usize>,
    /// Follow symlinked files and directories while scanning.
    #[clap(long)]
    pub follow_links: bool,
    /// Directory name to skip wherever it appears. Repeatable.
    #[clap(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,
    /// Config file (defaults to `objlint.toml` in the scan root, if present).
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
    /// Print per-file timing information on stderr.
    #[clap(long, short = 'v')]
    pub verbose: bool,
}
