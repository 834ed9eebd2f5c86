//! Batch front end support
//!
//! Provides programmatic access to the `docweave` command's batch mode for
//! embedding in other tools.

mod batch;

pub use batch::{BatchOptions, JobOutcome, execute_batch, plan_jobs};

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that stop a batch before any report is produced
#[derive(Debug, Error)]
pub enum CliError {
    /// Config file missing or malformed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Explicit outputs that do not pair up with the workbooks
    #[error("{outputs} output paths were given for {workbooks} workbooks")]
    OutputCount { outputs: usize, workbooks: usize },

    /// Worker pool could not be started
    #[error("Cannot start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
