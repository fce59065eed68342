//! objlint: objective linting for behavior-tree XML datasets
//!
//! A file that declares a `BehaviorTree` element must also carry a complete
//! objective description:
//!
//! ```xml
//! <root>
//!   <BehaviorTree ID="Pick">...</BehaviorTree>
//!   <TreeNodesModel>
//!     <SubTree ID="Pick">
//!       <MetadataFields>
//!         <Metadata subcategory="Grasping"/>
//!         <Metadata description="Pick the object in front of the robot"/>
//!       </MetadataFields>
//!     </SubTree>
//!   </TreeNodesModel>
//! </root>
//! ```
//!
//! Files without a `BehaviorTree` are counted but not checked. Malformed XML
//! is reported like any other failure and never stops the batch.
//!
//! # Examples
//!
//! ```bash
//! # Lint every .xml file below the current directory
//! objlint
//!
//! # Another root, four workers, machine-readable output
//! objlint --root objectives --jobs 4 --format json
//! ```
//!
//! # Crate Structure
//!
//! - [`core::document`](crate::core::document): whole-file XML tree and lookups
//! - [`core::objective`](crate::core::objective): the ordered objective rules
//! - [`core::discovery`](crate::core::discovery): recursive `.xml` discovery
//! - [`core::runner`](crate::core::runner): parallel batch validation and reporting
//! - [`core::config`](crate::core::config): optional `objlint.toml`

pub mod core;
mod cli;

use crate::core::{config, error, runner};

use clap::Parser;
use std::io::IsTerminal;

pub use crate::core::error::LintError;
pub use crate::core::objective::{check_document, validate_objective, validate_source};
pub use crate::core::runner::{BatchSummary, RunOptions, run_batch};

pub fn run() -> Result<(), error::LintError> {
    use colored::Colorize;

    let cli = cli::Cli::parse();
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let format = cli.format.as_str();
    if !matches!(format, "text" | "json") {
        return Err(error::LintError::ConfigError(format!(
            "unknown output format '{}' (expected 'text' or 'json')",
            format
        )));
    }

    let root = match cli.root {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let file_config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&root)?,
    };

    let mut exclude = file_config.exclude;
    exclude.extend(cli.exclude);
    let options = RunOptions {
        jobs: cli.jobs.or(file_config.jobs),
        follow_links: cli.follow_links || file_config.follow_links,
        exclude,
        verbose: cli.verbose,
        ..RunOptions::new(root)
    };

    let summary = runner::run_batch(&options)?;

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&summary.to_json()?)?;
        println!("{}", rendered);
    } else {
        for line in summary.error_lines() {
            println!("{}", line.red());
        }
        let summary_line = summary.summary_line();
        if summary.failed_count() == 0 {
            println!("{}", summary_line.green());
        } else {
            println!("{}", summary_line);
        }
    }

    summary.into_result().map(|_| ())
}
