//! Row-barrier dispatch over a bounded worker pool.
//!
//! Rows run strictly one after another in ascending order. Inside a row,
//! jobs run on blocking worker threads, at most `workers` at a time, and the
//! row is finished only when every one of its jobs has produced an outcome.
//! An optional pause separates consecutive rows.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::codec::RasterCodec;
use crate::error::{ConversionFailure, FailureCause, TargetDirectoryError};
use crate::plan::{ConversionJob, JobPlan};

use super::engine::ConversionEngine;
use super::summary::{RunSummary, TileOutcome};

/// Runs a [`JobPlan`] row by row.
pub struct Dispatcher<C> {
    engine: Arc<ConversionEngine<C>>,
    workers: usize,
    row_pause: Duration,
}

impl<C: RasterCodec> Dispatcher<C> {
    /// A worker count of zero is treated as one.
    pub fn new(engine: ConversionEngine<C>, workers: usize, row_pause: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            workers: workers.max(1),
            row_pause,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Dispatch every row of the plan and summarize the outcomes.
    ///
    /// Individual failures are recorded and never stop the run.
    pub async fn run(&self, plan: JobPlan) -> RunSummary {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let row_count = plan.row_count();
        let mut summary = RunSummary::new();

        info!(
            rows = row_count,
            jobs = plan.job_count(),
            workers = self.workers,
            "Starting conversion"
        );

        for (index, (row, jobs)) in plan.into_iter().enumerate() {
            let row_started = Instant::now();
            let outcomes = self.run_row(jobs, &semaphore).await;

            let failed = outcomes.iter().filter(|o| o.is_failure()).count();
            for outcome in &outcomes {
                summary.record(&row, outcome);
            }
            summary.rows += 1;

            info!(
                row = %row,
                tiles = outcomes.len(),
                failed,
                elapsed_secs = row_started.elapsed().as_secs_f64(),
                "Finished row {}/{}",
                index + 1,
                row_count
            );

            if index + 1 < row_count && !self.row_pause.is_zero() {
                info!(
                    pause_secs = self.row_pause.as_secs_f64(),
                    "Pausing before next row"
                );
                tokio::time::sleep(self.row_pause).await;
            }
        }

        summary.elapsed_secs = started.elapsed().as_secs_f64();
        summary
    }

    /// Run one row and wait for all of its jobs. Outcomes are sorted by
    /// tile id.
    async fn run_row(
        &self,
        jobs: Vec<ConversionJob>,
        semaphore: &Arc<Semaphore>,
    ) -> Vec<TileOutcome> {
        let poisoned: Arc<OnceLock<TargetDirectoryError>> = Arc::new(OnceLock::new());
        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut tasks = JoinSet::new();

        for job in jobs {
            let permit = match Arc::clone(semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    outcomes.push(failed(&job, FailureCause::Dispatch(e.to_string())));
                    continue;
                }
            };

            let engine = Arc::clone(&self.engine);
            let poisoned = Arc::clone(&poisoned);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                execute(&engine, &job, &poisoned)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!(error = %e, "Conversion task lost");
                    outcomes.push(TileOutcome::Failed(ConversionFailure {
                        tile_id: "<unknown>".to_string(),
                        path: Default::default(),
                        cause: FailureCause::Dispatch(e.to_string()),
                    }));
                }
            }
        }

        outcomes.sort_by(|a, b| a.tile_id().cmp(b.tile_id()));
        outcomes
    }
}

/// Convert one job on a worker thread.
///
/// Once a job of the row hits an unusable target directory, the remaining
/// jobs of that row fail with the same cause without touching the codec.
fn execute<C: RasterCodec>(
    engine: &ConversionEngine<C>,
    job: &ConversionJob,
    poisoned: &OnceLock<TargetDirectoryError>,
) -> TileOutcome {
    if let Some(err) = poisoned.get() {
        return failed(job, err.clone().into());
    }

    let outcome = match catch_unwind(AssertUnwindSafe(|| engine.convert(job))) {
        Ok(outcome) => outcome,
        Err(payload) => failed(job, FailureCause::WorkerPanicked(panic_message(&*payload))),
    };

    if let TileOutcome::Failed(failure) = &outcome {
        warn!(
            tile = %failure.tile_id,
            source = %failure.path.display(),
            error = %failure.cause,
            "Tile conversion failed"
        );
        if let FailureCause::TargetDirectory(err) = &failure.cause {
            let _ = poisoned.set(err.clone());
        }
    }
    outcome
}

fn failed(job: &ConversionJob, cause: FailureCause) -> TileOutcome {
    TileOutcome::Failed(ConversionFailure {
        tile_id: job.tile_id.clone(),
        path: job.source.clone(),
        cause,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
