//! Commit and job tracking
//!
//! A commit stages pending configuration changes on the device and returns
//! a job id; the job then runs asynchronously on the management plane.
//! Polling re-queries the device every time — no status is cached locally.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::device::{DeviceApi, JobState, JobStatus};
use crate::error::EngineError;
use crate::sync::dispatch::SyncEngine;

/// Job id reported for commits skipped by dry-run mode
pub const DRY_RUN_JOB_ID: &str = "dry-run-0";

/// A commit job and its last observed status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitJob {
    /// Job identifier assigned by the device
    pub id: String,
    /// Last observed state
    pub state: JobState,
    /// Last observed completion percentage
    pub progress: u8,
    /// Result detail for finished jobs
    pub detail: Option<String>,
}

impl CommitJob {
    /// True once the job can no longer change state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn from_status(job_id: &str, status: JobStatus) -> Self {
        Self {
            id: job_id.to_string(),
            state: status.state,
            progress: status.progress,
            detail: status.detail,
        }
    }

    fn dry_run(job_id: &str) -> Self {
        Self {
            id: job_id.to_string(),
            state: JobState::Succeeded,
            progress: 100,
            detail: None,
        }
    }
}

/// Polling parameters for awaiting a commit job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Seconds between status polls
    pub poll_interval_secs: u64,
    /// Wall-clock budget in seconds
    pub timeout_secs: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            timeout_secs: 600,
        }
    }
}

impl From<&EngineConfig> for WaitOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            poll_interval_secs: config.poll_interval_secs,
            timeout_secs: config.job_timeout_secs,
        }
    }
}

impl<D: DeviceApi + 'static> SyncEngine<D> {
    /// Wait parameters from the engine configuration
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::from(&self.config)
    }

    /// Stage a commit of pending changes
    ///
    /// Returns the new job with its device-assigned id, still pending. In
    /// dry-run mode no remote call is made and a synthetic succeeded job is
    /// returned.
    pub async fn commit(&self) -> Result<CommitJob, EngineError> {
        if self.config.dry_run {
            info!("dry run, reporting synthetic commit job");
            return Ok(CommitJob::dry_run(DRY_RUN_JOB_ID));
        }

        let job_id = self
            .retry
            .execute("commit", || async {
                self.api.commit().await.map_err(EngineError::from)
            })
            .await?;

        info!(job_id = %job_id, "commit initiated");
        Ok(CommitJob {
            id: job_id,
            state: JobState::Pending,
            progress: 0,
            detail: None,
        })
    }

    /// Query the current status of a commit job
    ///
    /// Every call re-queries the device; nothing is cached between calls.
    pub async fn poll_status(&self, job_id: &str) -> Result<CommitJob, EngineError> {
        if self.config.dry_run {
            return Ok(CommitJob::dry_run(job_id));
        }

        let status = self
            .retry
            .execute("job-status", || async {
                self.api.job_status(job_id).await.map_err(EngineError::from)
            })
            .await?;

        Ok(CommitJob::from_status(job_id, status))
    }

    /// Poll a job until it reaches a terminal state or the budget runs out
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        options: WaitOptions,
    ) -> Result<CommitJob, EngineError> {
        self.wait_for_job_with(job_id, options, |_| {}).await
    }

    /// Poll a job to completion, observing every status snapshot
    ///
    /// `on_poll` runs after each poll with the fresh snapshot, so callers
    /// can render progress while the wait blocks.
    pub async fn wait_for_job_with(
        &self,
        job_id: &str,
        options: WaitOptions,
        mut on_poll: impl FnMut(&CommitJob),
    ) -> Result<CommitJob, EngineError> {
        let started = Instant::now();
        let timeout = Duration::from_secs(options.timeout_secs);
        let interval = Duration::from_secs(options.poll_interval_secs);

        loop {
            if started.elapsed() >= timeout {
                warn!(
                    job_id,
                    timeout_secs = options.timeout_secs,
                    "gave up waiting for job"
                );
                return Err(EngineError::JobTimeout {
                    job_id: job_id.to_string(),
                    timeout_secs: options.timeout_secs,
                });
            }

            let job = self.poll_status(job_id).await?;
            on_poll(&job);

            if job.is_terminal() {
                info!(job_id, state = %job.state, "job reached terminal state");
                return Ok(job);
            }

            info!(job_id, progress = job.progress, "job in progress");
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: terminal states
    #[test]
    fn test_commit_job_terminal() {
        let mut job = CommitJob {
            id: "17".to_string(),
            state: JobState::Pending,
            progress: 0,
            detail: None,
        };
        assert!(!job.is_terminal());

        job.state = JobState::Running;
        assert!(!job.is_terminal());

        job.state = JobState::Succeeded;
        assert!(job.is_terminal());

        job.state = JobState::Failed;
        assert!(job.is_terminal());
    }

    // Test 2: snapshot conversion keeps the job id
    #[test]
    fn test_from_status() {
        let job = CommitJob::from_status(
            "42",
            JobStatus {
                state: JobState::Running,
                progress: 60,
                detail: None,
            },
        );
        assert_eq!(job.id, "42");
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.progress, 60);
    }

    // Test 3: wait defaults
    #[test]
    fn test_wait_options_default() {
        let options = WaitOptions::default();
        assert_eq!(options.poll_interval_secs, 5);
        assert_eq!(options.timeout_secs, 600);
    }

    // Test 4: wait parameters derive from the engine configuration
    #[test]
    fn test_wait_options_from_engine_config() {
        let config = EngineConfig {
            poll_interval_secs: 2,
            job_timeout_secs: 1800,
            ..EngineConfig::default()
        };
        let options = WaitOptions::from(&config);
        assert_eq!(options.poll_interval_secs, 2);
        assert_eq!(options.timeout_secs, 1800);
    }

    // Test 5: the synthetic dry-run job is terminal and complete
    #[test]
    fn test_dry_run_job() {
        let job = CommitJob::dry_run(DRY_RUN_JOB_ID);
        assert_eq!(job.id, DRY_RUN_JOB_ID);
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.progress, 100);
        assert!(job.is_terminal());
    }
}
