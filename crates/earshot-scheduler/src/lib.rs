// SPDX-FileCopyrightText: 2026 Earshot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-cadence triggers for the analysis pass and the expiration sweep.
//!
//! The pass logic itself lives in `earshot-analysis`; this crate only owns
//! timing. Both the cron loops and the manual triggers call the same pure
//! entry points, so nothing here needs a live clock to be tested.
//!
//! There is intentionally no run-lock: a manual trigger racing a scheduled
//! tick can double-read the same backlog. Single-process deployments absorb
//! the waste; the whole-pass processed commit keeps it from corrupting
//! state.

use std::str::FromStr;
use std::sync::Arc;

use cron::Schedule;
use earshot_analysis::{Batcher, PassOutcome, run_expiration_sweep};
use earshot_core::{Clock, EarshotError};
use earshot_storage::Database;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Which job a loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Analysis,
    Expiration,
}

struct Job {
    kind: JobKind,
    name: &'static str,
    description: String,
    schedule: Schedule,
}

/// Status snapshot for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub description: String,
    pub next_run: Option<String>,
}

/// Owns the cron loops; cheap to share behind an `Arc`.
pub struct Scheduler {
    batcher: Arc<Batcher>,
    db: Database,
    clock: Arc<dyn Clock>,
    jobs: Arc<Vec<Job>>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Build the scheduler with the standard two jobs: an analysis pass
    /// every `interval_minutes` and an hourly expiration sweep.
    pub fn new(
        batcher: Arc<Batcher>,
        db: Database,
        clock: Arc<dyn Clock>,
        interval_minutes: u32,
        shutdown: CancellationToken,
    ) -> Result<Self, EarshotError> {
        if interval_minutes == 0 {
            return Err(EarshotError::Config(
                "analysis interval must be at least one minute".to_string(),
            ));
        }

        // Six-field expressions: seconds lead.
        let analysis_expr = format!("0 */{interval_minutes} * * * *");
        let analysis_schedule = Schedule::from_str(&analysis_expr).map_err(|e| {
            EarshotError::Config(format!("invalid analysis cron `{analysis_expr}`: {e}"))
        })?;
        let expiration_schedule = Schedule::from_str("0 0 * * * *")
            .map_err(|e| EarshotError::Config(format!("invalid expiration cron: {e}")))?;

        let jobs = vec![
            Job {
                kind: JobKind::Analysis,
                name: "analysis",
                description: format!("backlog analysis (every {interval_minutes} min)"),
                schedule: analysis_schedule,
            },
            Job {
                kind: JobKind::Expiration,
                name: "expiration",
                description: "expiration sweep (hourly)".to_string(),
                schedule: expiration_schedule,
            },
        ];

        Ok(Self {
            batcher,
            db,
            clock,
            jobs: Arc::new(jobs),
            shutdown,
        })
    }

    /// Spawn one tokio task per job. Tasks exit when the shutdown token
    /// fires.
    pub fn start(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();
        for index in 0..self.jobs.len() {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_job_loop(index).await;
            }));
        }
        handles
    }

    async fn run_job_loop(&self, index: usize) {
        let job = &self.jobs[index];
        info!(job = job.name, description = %job.description, "job loop started");

        loop {
            let now = self.clock.now();
            let Some(next) = job.schedule.after(&now).next() else {
                warn!(job = job.name, "no future occurrence; job loop stopping");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!(job = job.name, "job loop stopped");
                    return;
                }
                _ = tokio::time::sleep(wait) => {
                    self.run_job(job.kind).await;
                }
            }
        }
    }

    async fn run_job(&self, kind: JobKind) {
        match kind {
            JobKind::Analysis => {
                if let Err(e) = self.batcher.run_pass().await {
                    error!(error = %e, "scheduled analysis pass failed");
                }
            }
            JobKind::Expiration => {
                if let Err(e) = run_expiration_sweep(&self.db, self.clock.as_ref()).await {
                    error!(error = %e, "scheduled expiration sweep failed");
                }
            }
        }
    }

    /// Run one analysis pass now, same entry point as the timer.
    pub async fn trigger_analysis(&self) -> Result<PassOutcome, EarshotError> {
        info!("manual analysis trigger");
        self.batcher.run_pass().await
    }

    /// Run one expiration sweep now, same entry point as the timer.
    pub async fn trigger_expiration(&self) -> Result<usize, EarshotError> {
        info!("manual expiration trigger");
        run_expiration_sweep(&self.db, self.clock.as_ref()).await
    }

    /// Status snapshot for every job.
    pub fn status(&self) -> Vec<JobStatus> {
        let now = self.clock.now();
        self.jobs
            .iter()
            .map(|job| JobStatus {
                name: job.name.to_string(),
                description: job.description.clone(),
                next_run: job.schedule.after(&now).next().map(|dt| dt.to_rfc3339()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use earshot_analysis::AnalysisClient;
    use earshot_config::model::{AnalysisConfig, ModelConfig};
    use earshot_core::{FixedClock, clock};
    use earshot_test_utils::TestDb;

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            clock::civil_offset().with_ymd_and_hms(2026, 3, 1, 12, 10, 0).unwrap(),
        ))
    }

    async fn scheduler_with(db: &Database, interval: u32) -> (Arc<Scheduler>, CancellationToken) {
        // No provider: passes run as no-ops, which is all timing tests need.
        let client = Arc::new(AnalysisClient::new(None, fixed_clock(), &ModelConfig::default()));
        let batcher = Arc::new(Batcher::new(
            db.clone(),
            client,
            AnalysisConfig::default(),
            fixed_clock(),
        ));
        let shutdown = CancellationToken::new();
        let scheduler = Arc::new(
            Scheduler::new(batcher, db.clone(), fixed_clock(), interval, shutdown.clone())
                .unwrap(),
        );
        (scheduler, shutdown)
    }

    #[tokio::test]
    async fn status_reports_both_jobs_with_next_runs() {
        let harness = TestDb::new().await;
        let (scheduler, _shutdown) = scheduler_with(&harness.db, 30).await;

        let status = scheduler.status();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].name, "analysis");
        assert_eq!(status[1].name, "expiration");

        // Clock pinned to 12:10 -> next half-hour tick is 12:30, next hourly
        // sweep is 13:00.
        assert!(status[0].next_run.as_deref().unwrap().contains("12:30:00"));
        assert!(status[1].next_run.as_deref().unwrap().contains("13:00:00"));

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn manual_triggers_run_the_same_pass_functions() {
        let harness = TestDb::new().await;
        let (scheduler, _shutdown) = scheduler_with(&harness.db, 30).await;

        let outcome = scheduler.trigger_analysis().await.unwrap();
        assert_eq!(outcome.messages_processed, 0);

        let expired = scheduler.trigger_expiration().await.unwrap();
        assert_eq!(expired, 0);

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn job_loops_stop_on_shutdown() {
        let harness = TestDb::new().await;
        let (scheduler, shutdown) = scheduler_with(&harness.db, 30).await;

        let handles = scheduler.start();
        shutdown.cancel();
        for handle in handles {
            tokio::time::timeout(std::time::Duration::from_secs(2), handle)
                .await
                .expect("job loop exits promptly")
                .unwrap();
        }

        harness.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_interval_is_a_config_error() {
        let harness = TestDb::new().await;
        let client = Arc::new(AnalysisClient::new(None, fixed_clock(), &ModelConfig::default()));
        let batcher = Arc::new(Batcher::new(
            harness.db.clone(),
            client,
            AnalysisConfig::default(),
            fixed_clock(),
        ));
        let result = Scheduler::new(
            batcher,
            harness.db.clone(),
            fixed_clock(),
            0,
            CancellationToken::new(),
        );
        assert!(result.is_err());

        harness.db.close().await.unwrap();
    }
}
