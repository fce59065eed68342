//! Batch runner: discover, validate in parallel, aggregate.
//!
//! Every file is validated independently on a rayon pool. Results come back
//! in discovery order and nothing is reported until all of them are in.

use crate::core::discovery::{self, DiscoveryOptions, XmlFile};
use crate::core::error::LintError;
use crate::core::objective::{self, FileError, FileReport, Outcome};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub root: PathBuf,
    /// Worker threads; `None` means one per available core.
    pub jobs: Option<usize>,
    pub follow_links: bool,
    pub exclude: Vec<String>,
    /// Per-file timing lines on stderr.
    pub verbose: bool,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    fn worker_count(&self) -> usize {
        self.jobs.filter(|n| *n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

fn trace_enabled() -> bool {
    std::env::var("OBJLINT_TRACE").ok().as_deref() == Some("1")
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub reports: Vec<FileReport>,
    pub elapsed: Duration,
}

#[derive(Debug, Serialize)]
struct JsonError {
    path: String,
    kind: &'static str,
    reason: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    files: usize,
    failed: usize,
    elapsed_secs: f64,
    errors: Vec<JsonError>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileReport, &FileError)> {
        self.reports
            .iter()
            .filter_map(|r| r.outcome.error().map(|e| (r, e)))
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Files that declared a `BehaviorTree` and satisfied every rule.
    pub fn objective_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome == Outcome::Passed)
            .count()
    }

    pub fn error_lines(&self) -> Vec<String> {
        self.failures().map(|(r, e)| e.line(&r.path)).collect()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Validated {} files in {:.2} seconds.",
            self.total(),
            self.elapsed.as_secs_f64()
        )
    }

    pub fn to_json(&self) -> Result<serde_json::Value, LintError> {
        let errors = self
            .failures()
            .map(|(r, e)| JsonError {
                path: r.path.display().to_string(),
                kind: e.kind(),
                reason: e.to_string(),
                message: e.line(&r.path),
            })
            .collect::<Vec<_>>();
        let summary = JsonSummary {
            files: self.total(),
            failed: errors.len(),
            elapsed_secs: self.elapsed.as_secs_f64(),
            errors,
        };
        serde_json::to_value(summary).map_err(LintError::from)
    }

    /// `Err(ValidationFailed(k))` when any file failed.
    pub fn into_result(self) -> Result<BatchSummary, LintError> {
        match self.failed_count() {
            0 => Ok(self),
            k => Err(LintError::ValidationFailed(k)),
        }
    }
}

/// Validate an explicit file list. Read failures abort the whole batch.
pub fn validate_files(
    files: &[XmlFile],
    options: &RunOptions,
) -> Result<Vec<FileReport>, LintError> {
    let trace = trace_enabled();
    let verbose = options.verbose;
    let pool = ThreadPoolBuilder::new()
        .num_threads(options.worker_count())
        .build()?;

    pool.install(|| {
        files
            .par_iter()
            .map(|file| -> Result<FileReport, LintError> {
                if trace {
                    eprintln!("objlint: trace {}", file.relative.display());
                }
                let started = Instant::now();
                let report = objective::validate_file(&file.absolute, &file.relative)?;
                if verbose {
                    eprintln!(
                        "objlint: {} {} {}ms",
                        file.relative.display(),
                        outcome_label(&report.outcome),
                        started.elapsed().as_millis()
                    );
                }
                Ok(report)
            })
            .collect()
    })
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Skipped => "skipped",
        Outcome::Passed => "ok",
        Outcome::Failed(_) => "failed",
    }
}

pub fn run_batch(options: &RunOptions) -> Result<BatchSummary, LintError> {
    let started = Instant::now();
    let files = discovery::collect_xml_files(
        &options.root,
        &DiscoveryOptions {
            follow_links: options.follow_links,
            exclude: options.exclude.clone(),
        },
    )?;
    let reports = validate_files(&files, options)?;
    Ok(BatchSummary {
        reports,
        elapsed: started.elapsed(),
    })
}
