//! Post-dispatch check reporting.
//!
//! A run started for a `pull_request_with_check` subscription gets a check
//! run opened on the pull request head. A detached task then polls the host
//! until the run is complete and closes the check with the mapped conclusion.
//! Transport failures are retried on the poll cadence until shutdown; the
//! check is closed at most once.

use crate::checks::{CHECK_NAME, ChecksReporter};
use gofer_core::ids::SubscriptionKey;
use gofer_core::ports::HostApi;
use gofer_core::run::CheckConclusion;
use gofer_registry::Repository;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a report task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Reported(CheckConclusion),
    Abandoned,
    Cancelled,
}

/// Everything a report task needs; cheap to clone into a spawned task.
#[derive(Clone)]
pub struct RunReport {
    pub host: Arc<dyn HostApi>,
    pub reporter: Arc<dyn ChecksReporter>,
    pub key: SubscriptionKey,
    pub repository: Repository,
    pub head_sha: String,
    pub run_id: u64,
    pub poll_interval: Duration,
}

impl RunReport {
    /// Open the check and follow the run on a detached task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<ReportOutcome> {
        tokio::spawn(async move { self.execute(shutdown).await })
    }

    pub async fn execute(&self, shutdown: CancellationToken) -> ReportOutcome {
        let created = tokio::select! {
            _ = shutdown.cancelled() => return ReportOutcome::Cancelled,
            created = self.reporter.create_check(&self.repository, &self.head_sha, CHECK_NAME) => created,
        };

        match created {
            Ok(check_id) => self.follow(check_id, shutdown).await,
            Err(e) => {
                error!(
                    subscription_id = %self.key.subscription_id,
                    repository = %self.repository,
                    run_id = self.run_id,
                    error = %e,
                    "Could not create check run"
                );
                ReportOutcome::Abandoned
            }
        }
    }

    /// Poll `get_run` until the run completes, then close the check once.
    pub async fn follow(&self, check_id: u64, shutdown: CancellationToken) -> ReportOutcome {
        let mut transport_failures: u64 = 0;

        loop {
            let polled = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(run_id = self.run_id, "Report task cancelled");
                    return ReportOutcome::Cancelled;
                }
                polled = async {
                    tokio::time::sleep(self.poll_interval).await;
                    self.host
                        .get_run(&self.key.namespace_id, &self.key.pipeline_id, self.run_id)
                        .await
                } => polled,
            };

            let run = match polled {
                Ok(run) => run,
                Err(e) if e.is_transport() => {
                    transport_failures += 1;
                    warn!(
                        run_id = self.run_id,
                        attempt = transport_failures,
                        error = %e,
                        "Run poll failed, retrying"
                    );
                    continue;
                }
                Err(e) => {
                    error!(run_id = self.run_id, error = %e, "Run poll rejected by host");
                    return ReportOutcome::Abandoned;
                }
            };
            transport_failures = 0;

            if !run.state.is_terminal() {
                continue;
            }

            let conclusion = CheckConclusion::from(run.status);
            let summary = format!(
                "Run {} of {}/{} finished: {}",
                run.run_id, self.key.namespace_id, self.key.pipeline_id, conclusion
            );

            return match self
                .reporter
                .complete_check(&self.repository, check_id, conclusion, &summary)
                .await
            {
                Ok(()) => {
                    info!(
                        repository = %self.repository,
                        run_id = self.run_id,
                        check_id,
                        %conclusion,
                        "Reported run result"
                    );
                    ReportOutcome::Reported(conclusion)
                }
                Err(e) => {
                    error!(
                        repository = %self.repository,
                        run_id = self.run_id,
                        check_id,
                        error = %e,
                        "Could not report run result"
                    );
                    ReportOutcome::Abandoned
                }
            };
        }
    }
}
