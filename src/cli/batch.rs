use super::CliError;
use crate::config::ReportConfig;
use crate::report::{ReportError, ReportJob, ReportSummary, produce_report};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;

/// Options for running one template against many workbooks
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub template: PathBuf,
    pub workbooks: Vec<PathBuf>,
    /// Empty to write each report next to its workbook
    pub outputs: Vec<PathBuf>,
    /// Worker threads; 0 runs the jobs one after another
    pub threads: usize,
}

/// Result of one job of a batch
#[derive(Debug)]
pub struct JobOutcome {
    pub job: ReportJob,
    pub result: Result<ReportSummary, ReportError>,
    pub elapsed: Duration,
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Pairs every workbook with the template and an output path.
pub fn plan_jobs(options: &BatchOptions) -> Result<Vec<ReportJob>, CliError> {
    if !options.outputs.is_empty() && options.outputs.len() != options.workbooks.len() {
        return Err(CliError::OutputCount {
            outputs: options.outputs.len(),
            workbooks: options.workbooks.len(),
        });
    }

    let jobs = options
        .workbooks
        .iter()
        .enumerate()
        .map(|(i, workbook)| {
            let job = ReportJob::new(&options.template, workbook);
            match options.outputs.get(i) {
                Some(output) => job.with_output(output),
                None => job,
            }
        })
        .collect();
    Ok(jobs)
}

/// Runs every job of the batch; outcomes keep the order of the workbooks.
///
/// A failing job never stops the others.
pub fn execute_batch(
    options: &BatchOptions,
    config: &ReportConfig,
) -> Result<Vec<JobOutcome>, CliError> {
    let jobs = plan_jobs(options)?;

    let run = |job: ReportJob| {
        let started = Instant::now();
        let result = produce_report(&job, config);
        JobOutcome {
            job,
            result,
            elapsed: started.elapsed(),
        }
    };

    if options.threads == 0 || jobs.len() < 2 {
        debug!("Running {} jobs sequentially", jobs.len());
        return Ok(jobs.into_iter().map(run).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()?;
    debug!("Running {} jobs on {} threads", jobs.len(), pool.current_num_threads());
    Ok(pool.install(|| jobs.into_par_iter().map(run).collect()))
}
