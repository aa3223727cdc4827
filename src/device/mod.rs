//! Device-API collaborator contract
//!
//! The engine talks to the management plane through the narrow [`DeviceApi`]
//! trait: scope-qualified object operations, a bulk refresh per collection,
//! and commit/job-status calls. [`rest::RestDeviceApi`] is the HTTP
//! implementation; tests substitute their own.

pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::models::{ConfigObject, ObjectKind};
use crate::scope::Scope;

pub use rest::RestDeviceApi;

/// State of a server-side commit job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued, not yet started
    #[default]
    Pending,
    /// In progress
    Running,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    Failed,
}

impl JobState {
    /// True once the job can no longer change state
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Running => write!(f, "running"),
            JobState::Succeeded => write!(f, "succeeded"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Snapshot of a commit job as reported by the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Current state
    pub state: JobState,

    /// Completion percentage, 0-100
    #[serde(default)]
    pub progress: u8,

    /// Result detail for finished jobs
    #[serde(default)]
    pub detail: Option<String>,
}

/// Operations the engine requires from the management plane
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Create an object under the given scope
    async fn create(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError>;

    /// Create or overwrite an object under the given scope
    async fn update(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError>;

    /// Delete an object under the given scope
    async fn delete(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError>;

    /// Refresh every object of one collection under the given scope
    async fn fetch_all(
        &self,
        kind: ObjectKind,
        scope: &Scope,
    ) -> Result<Vec<ConfigObject>, DeviceError>;

    /// Stage a commit of pending changes, returning the job id
    async fn commit(&self) -> Result<String, DeviceError>;

    /// Query the status of a commit job
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, DeviceError>;
}
