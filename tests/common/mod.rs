//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fwsync::config::EngineConfig;
use fwsync::device::{DeviceApi, JobStatus};
use fwsync::error::DeviceError;
use fwsync::models::{ConfigObject, ObjectKind};
use fwsync::scope::Scope;
use fwsync::sync::SyncEngine;

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub verb: String,
    pub object: String,
    pub scope: String,
}

#[derive(Debug)]
struct FailPlan {
    remaining: u32,
    error: DeviceError,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Mutex<Vec<CallRecord>>,
    failures: Mutex<HashMap<String, FailPlan>>,
    op_delay: Mutex<Option<Duration>>,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,

    commit_calls: AtomicU32,
    commit_failures: Mutex<Option<FailPlan>>,
    commit_job_id: Mutex<String>,

    status_calls: AtomicU32,
    statuses: Mutex<VecDeque<JobStatus>>,

    fetch_objects: Mutex<Vec<ConfigObject>>,
    fetch_error: Mutex<Option<DeviceError>>,
}

/// Scriptable device-API double shared between a test and its engine
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<MockState>,
}

impl MockDevice {
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.state.commit_job_id.lock().unwrap() = "1001".to_string();
        mock
    }

    /// Fail the next `times` operations against the named object
    pub fn fail_times(&self, object: &str, times: u32, error: DeviceError) {
        self.state.failures.lock().unwrap().insert(
            object.to_string(),
            FailPlan {
                remaining: times,
                error,
            },
        );
    }

    /// Fail every operation against the named object
    pub fn always_fail(&self, object: &str, error: DeviceError) {
        self.fail_times(object, u32::MAX, error);
    }

    /// Fail the next `times` commit calls
    pub fn fail_commit_times(&self, times: u32, error: DeviceError) {
        *self.state.commit_failures.lock().unwrap() = Some(FailPlan {
            remaining: times,
            error,
        });
    }

    /// Delay each object operation, for observing pool occupancy
    pub fn set_op_delay(&self, delay: Duration) {
        *self.state.op_delay.lock().unwrap() = Some(delay);
    }

    /// Script the sequence of job statuses; the last entry repeats
    pub fn push_status(&self, status: JobStatus) {
        self.state.statuses.lock().unwrap().push_back(status);
    }

    /// Objects returned by fetch_all
    pub fn set_fetch_objects(&self, objects: Vec<ConfigObject>) {
        *self.state.fetch_objects.lock().unwrap() = objects;
    }

    /// Error returned by fetch_all
    pub fn set_fetch_error(&self, error: DeviceError) {
        *self.state.fetch_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().unwrap().len()
    }

    /// Number of recorded calls against the named object
    pub fn calls_for(&self, object: &str) -> usize {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.object == object)
            .count()
    }

    pub fn commit_calls(&self) -> u32 {
        self.state.commit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.state.status_calls.load(Ordering::SeqCst)
    }

    /// Highest number of object operations observed in flight at once
    pub fn max_in_flight(&self) -> u32 {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    async fn record(&self, verb: &str, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError> {
        self.state.calls.lock().unwrap().push(CallRecord {
            verb: verb.to_string(),
            object: object.name().to_string(),
            scope: scope.name().to_string(),
        });

        let in_flight = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.state.op_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut failures = self.state.failures.lock().unwrap();
        if let Some(plan) = failures.get_mut(object.name()) {
            if plan.remaining > 0 {
                plan.remaining = plan.remaining.saturating_sub(1);
                return Err(plan.error.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceApi for MockDevice {
    async fn create(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError> {
        self.record("create", object, scope).await
    }

    async fn update(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError> {
        self.record("update", object, scope).await
    }

    async fn delete(&self, object: &ConfigObject, scope: &Scope) -> Result<(), DeviceError> {
        self.record("delete", object, scope).await
    }

    async fn fetch_all(
        &self,
        _kind: ObjectKind,
        _scope: &Scope,
    ) -> Result<Vec<ConfigObject>, DeviceError> {
        if let Some(error) = self.state.fetch_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.state.fetch_objects.lock().unwrap().clone())
    }

    async fn commit(&self) -> Result<String, DeviceError> {
        self.state.commit_calls.fetch_add(1, Ordering::SeqCst);

        let mut failures = self.state.commit_failures.lock().unwrap();
        if let Some(plan) = failures.as_mut() {
            if plan.remaining > 0 {
                plan.remaining -= 1;
                return Err(plan.error.clone());
            }
        }
        Ok(self.state.commit_job_id.lock().unwrap().clone())
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobStatus, DeviceError> {
        self.state.status_calls.fetch_add(1, Ordering::SeqCst);

        let mut statuses = self.state.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap_or_default())
        } else {
            Ok(statuses.front().cloned().unwrap_or_default())
        }
    }
}

/// Engine configuration for tests: default pool, standard retries
pub fn test_engine_config() -> EngineConfig {
    EngineConfig::default()
}

/// Build an engine around a fresh mock, returning both
pub fn create_test_engine() -> (SyncEngine<MockDevice>, MockDevice) {
    let mock = MockDevice::new();
    let engine = SyncEngine::new(mock.clone(), test_engine_config());
    (engine, mock)
}

/// Build a dry-run engine around a fresh mock
pub fn create_dry_run_engine() -> (SyncEngine<MockDevice>, MockDevice) {
    let mock = MockDevice::new();
    let mut config = test_engine_config();
    config.dry_run = true;
    let engine = SyncEngine::new(mock.clone(), config);
    (engine, mock)
}
