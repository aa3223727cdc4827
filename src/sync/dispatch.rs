//! Bulk dispatcher
//!
//! Fans a batch of object operations out across the engine's worker pool,
//! one remote operation per object. Scope is resolved once per batch; each
//! worker task runs its operation through the retry executor. Individual
//! failures never abort the batch — every object gets its own outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::device::DeviceApi;
use crate::error::EngineError;
use crate::models::{ConfigObject, ObjectKind};
use crate::scope::{Scope, ScopeResolver};
use crate::sync::retry::RetryExecutor;

/// Which remote operation a batch performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationVerb {
    /// Create new objects
    Create,
    /// Create or overwrite objects
    Update,
    /// Delete objects
    Delete,
}

impl std::fmt::Display for OperationVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationVerb::Create => write!(f, "create"),
            OperationVerb::Update => write!(f, "update"),
            OperationVerb::Delete => write!(f, "delete"),
        }
    }
}

/// Handle on one submitted operation, joinable for its outcome
#[derive(Debug)]
pub struct PendingOperation {
    object_name: String,
    handle: JoinHandle<Result<(), EngineError>>,
}

impl PendingOperation {
    /// Name of the object this operation targets
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Wait for the operation to finish
    pub async fn join(self) -> OperationOutcome {
        let result = match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(EngineError::Worker(join_err.to_string())),
        };
        OperationOutcome {
            object_name: self.object_name,
            result,
        }
    }
}

/// Per-object result of a batch operation
#[derive(Debug)]
pub struct OperationOutcome {
    /// Name of the object the operation targeted
    pub object_name: String,
    /// What happened
    pub result: Result<(), EngineError>,
}

impl OperationOutcome {
    /// True when the operation completed without error
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Joined outcomes for one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Outcomes in submission order
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchReport {
    /// Number of operations in the batch
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True for an empty batch
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of successful operations
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed operations
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Iterate over the failed outcomes
    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// The configuration-sync engine
///
/// Owns the device-API handle, the worker pool and the scope registry.
/// The pool is shared across every dispatch made through this instance.
pub struct SyncEngine<D: DeviceApi> {
    pub(crate) api: Arc<D>,
    pub(crate) retry: RetryExecutor,
    pub(crate) config: EngineConfig,
    permits: Arc<Semaphore>,
    scopes: ScopeResolver,
    skipped_batches: AtomicU64,
}

impl<D: DeviceApi + 'static> SyncEngine<D> {
    /// Create an engine around a device-API collaborator
    pub fn new(api: D, config: EngineConfig) -> Self {
        let pool_size = config.pool_size.max(1);
        Self {
            api: Arc::new(api),
            retry: RetryExecutor::new(config.retry()),
            permits: Arc::new(Semaphore::new(pool_size)),
            scopes: ScopeResolver::new(),
            skipped_batches: AtomicU64::new(0),
            config,
        }
    }

    /// Submit a create for every object in the batch
    pub fn create_objects(
        &self,
        objects: Vec<ConfigObject>,
        scope_name: &str,
    ) -> Vec<PendingOperation> {
        self.dispatch(OperationVerb::Create, objects, scope_name)
    }

    /// Submit an update for every object in the batch
    pub fn update_objects(
        &self,
        objects: Vec<ConfigObject>,
        scope_name: &str,
    ) -> Vec<PendingOperation> {
        self.dispatch(OperationVerb::Update, objects, scope_name)
    }

    /// Submit a delete for every object in the batch
    pub fn delete_objects(
        &self,
        objects: Vec<ConfigObject>,
        scope_name: &str,
    ) -> Vec<PendingOperation> {
        self.dispatch(OperationVerb::Delete, objects, scope_name)
    }

    /// Fan a batch out across the worker pool
    ///
    /// Scope is resolved once for the whole batch. Objects enter the pool in
    /// input order; completion order is unspecified. An empty batch submits
    /// nothing. In dry-run mode the batch is recorded and nothing is
    /// submitted.
    pub fn dispatch(
        &self,
        verb: OperationVerb,
        objects: Vec<ConfigObject>,
        scope_name: &str,
    ) -> Vec<PendingOperation> {
        if objects.is_empty() {
            return Vec::new();
        }

        if self.config.dry_run {
            self.skipped_batches.fetch_add(1, Ordering::SeqCst);
            info!(
                verb = %verb,
                count = objects.len(),
                scope = scope_name,
                "dry run, batch not submitted"
            );
            return Vec::new();
        }

        let scope = self.scopes.resolve(scope_name);
        debug!(
            verb = %verb,
            count = objects.len(),
            scope = %scope,
            "dispatching batch"
        );

        objects
            .into_iter()
            .map(|object| self.submit(verb, object, scope.clone()))
            .collect()
    }

    fn submit(&self, verb: OperationVerb, object: ConfigObject, scope: Scope) -> PendingOperation {
        let api = Arc::clone(&self.api);
        let permits = Arc::clone(&self.permits);
        let retry = self.retry.clone();
        let object_name = object.name().to_string();
        let op_name = format!("{} {}", verb, object_name);

        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| EngineError::Worker("worker pool closed".to_string()))?;

            retry
                .execute(&op_name, || async {
                    match verb {
                        OperationVerb::Create => api.create(&object, &scope).await,
                        OperationVerb::Update => api.update(&object, &scope).await,
                        OperationVerb::Delete => api.delete(&object, &scope).await,
                    }
                    .map_err(EngineError::from)
                })
                .await
        });

        PendingOperation {
            object_name,
            handle,
        }
    }

    /// Join a batch, collecting outcomes in submission order
    pub async fn join_all(pending: Vec<PendingOperation>) -> BatchReport {
        let mut outcomes = Vec::with_capacity(pending.len());
        for operation in pending {
            outcomes.push(operation.join().await);
        }
        BatchReport { outcomes }
    }

    /// Refresh every object of one collection under a scope
    ///
    /// A single bulk read with no per-object parallelism and no retry at
    /// this layer.
    pub async fn fetch_all(
        &self,
        kind: ObjectKind,
        scope_name: &str,
    ) -> Result<Vec<ConfigObject>, EngineError> {
        if self.config.dry_run {
            info!(kind = %kind, scope = scope_name, "dry run, skipping fetch");
            return Ok(Vec::new());
        }

        let scope = self.scopes.resolve(scope_name);
        debug!(kind = %kind, scope = %scope, "fetching objects");

        self.api
            .fetch_all(kind, &scope)
            .await
            .map_err(|source| EngineError::Fetch { kind, source })
    }

    /// Number of device groups the engine has resolved so far
    pub fn registered_scopes(&self) -> usize {
        self.scopes.registered_count()
    }

    /// Operations skipped by dry-run mode
    pub fn skipped_operations(&self) -> u64 {
        self.retry.skipped_operations()
    }

    /// Batches skipped by dry-run mode
    pub fn skipped_batches(&self) -> u64 {
        self.skipped_batches.load(Ordering::SeqCst)
    }
}
