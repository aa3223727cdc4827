//! The concurrent configuration-sync engine
//!
//! # Components
//!
//! - [`retry`]: bounded-attempt executor with exponential backoff for
//!   transient device faults
//! - [`dispatch`]: fan-out of object batches across the worker pool
//! - [`jobs`]: commit initiation and job polling to a terminal state

pub mod dispatch;
pub mod jobs;
pub mod retry;

pub use dispatch::{
    BatchReport, OperationOutcome, OperationVerb, PendingOperation, SyncEngine,
};
pub use jobs::{CommitJob, WaitOptions, DRY_RUN_JOB_ID};
pub use retry::RetryExecutor;
