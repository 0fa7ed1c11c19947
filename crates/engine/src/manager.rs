//! The store facade: bootstrap, read path, and submission
//!
//! `Store` wires the pieces together: it opens the durable store (snapshot
//! recovery plus in-place migration), builds the context hierarchy (root
//! scope wired to storage, read scope for the opening thread), owns the
//! context pool and the save executor, and exposes the four caller entry
//! points: `fetch`, `submit`, `is_entity_empty`, `clean_entity`.
//!
//! A global weak registry guarantees one live instance per data directory:
//! opening an already-open directory returns the existing store.

use crate::arena::ContextArena;
use crate::config::{FaultPolicy, OpenOptions};
use crate::context::Confinement;
use crate::executor::{CompletionFn, ExecutorStats, MutationFn, SaveExecutor, SaveTask};
use crate::handle::ContextHandle;
use crate::pool::ContextPool;
use crate::query;
use lamina_core::{EntityKind, Error, FetchRequest, Record, Result, SchemaDescriptor};
use lamina_storage::DurableStore;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Global registry of open stores (canonical data dir → weak reference).
///
/// Ensures the durable store under a directory is owned by at most one live
/// instance per process; a second open returns the first.
static OPEN_STORES: Lazy<Mutex<HashMap<PathBuf, Weak<Store>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// State shared between the facade and the save worker.
pub(crate) struct Shared {
    pub(crate) arena: Arc<ContextArena>,
    pub(crate) pool: ContextPool,
    pub(crate) store: DurableStore,
    /// Serializes save propagation against the read path: the propagation
    /// walk holds the write side end to end, so a fetch (read side) never
    /// observes changes mid-flight between two levels of the chain.
    pub(crate) commit_gate: RwLock<()>,
    policy: FaultPolicy,
    poisoned: AtomicBool,
    fault: Mutex<Option<Error>>,
}

impl Shared {
    pub(crate) fn new(
        arena: Arc<ContextArena>,
        pool: ContextPool,
        store: DurableStore,
        policy: FaultPolicy,
    ) -> Self {
        Shared {
            arena,
            pool,
            store,
            commit_gate: RwLock::new(()),
            policy,
            poisoned: AtomicBool::new(false),
            fault: Mutex::new(None),
        }
    }

    pub(crate) fn check_usable(&self) -> Result<()> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(Error::Poisoned);
        }
        Ok(())
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    /// Fault observed on a caller's own thread (read path): abort, or
    /// poison and hand the error back.
    pub(crate) fn raise_sync(&self, err: Error) -> Error {
        match self.policy {
            FaultPolicy::Abort => {
                error!(error = %err, "unrecoverable fault, aborting");
                std::process::abort();
            }
            FaultPolicy::Surface => {
                self.poison(&err);
                err
            }
        }
    }

    /// Fault observed on the save worker (no caller to hand it to): abort,
    /// or poison and record it for `take_fault`.
    pub(crate) fn raise_async(&self, err: Error) {
        match self.policy {
            FaultPolicy::Abort => {
                error!(error = %err, "unrecoverable fault during save, aborting");
                std::process::abort();
            }
            FaultPolicy::Surface => {
                error!(error = %err, "unrecoverable fault during save, poisoning store");
                self.poison(&err);
                let mut fault = self.fault.lock();
                if fault.is_none() {
                    *fault = Some(err);
                }
            }
        }
    }

    fn poison(&self, err: &Error) {
        if !self.poisoned.swap(true, Ordering::AcqRel) {
            debug!(error = %err, "store poisoned");
        }
    }
}

/// Point-in-time operational counters
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Scopes in the hierarchy (root + read + per-thread)
    pub contexts: usize,
    /// Durable commit generation
    pub generation: u64,
    /// Records currently persisted
    pub records: usize,
    /// Save executor counters
    pub executor: ExecutorStats,
}

/// The layered, thread-aware persistence manager.
///
/// Reads resolve the calling thread's scope and are synchronous; mutations
/// are submitted as closures to a dedicated worker and committed through
/// the scope's parent chain before any completion fires.
///
/// # Example
///
/// ```ignore
/// let store = Store::open(OpenOptions::new(dir, schema))?;
/// store.submit_with_completion(
///     |scope| {
///         let record = Record::new(RecordId::new("a"))
///             .with("title", Value::String("Standup".into()));
///         scope.insert(&EntityKind::new("event"), record)
///     },
///     || println!("durably committed"),
/// )?;
/// ```
pub struct Store {
    shared: Arc<Shared>,
    executor: SaveExecutor,
    data_dir: PathBuf,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open (or join) the store under the options' data directory.
    ///
    /// Must complete before any other call; every failure here is a
    /// bootstrap fault and the store must not be used.
    pub fn open(options: OpenOptions) -> Result<Arc<Store>> {
        let schema = options.resolve_schema()?;
        std::fs::create_dir_all(options.data_dir())?;
        let data_dir = options.data_dir().canonicalize()?;

        let mut registry = OPEN_STORES.lock();
        if let Some(existing) = registry.get(&data_dir).and_then(Weak::upgrade) {
            debug!(path = %data_dir.display(), "store already open, returning existing instance");
            return Ok(existing);
        }

        let durable = DurableStore::open(&data_dir, schema)?;

        let arena = Arc::new(ContextArena::new());
        let root = arena.alloc(None, Confinement::QueueConfined);
        let read = arena.alloc(Some(root.id()), Confinement::ReaderConfined);
        let pool = ContextPool::new(
            Arc::clone(&arena),
            std::thread::current().id(),
            read.id(),
        );

        let shared = Arc::new(Shared::new(arena, pool, durable, options.policy()));
        let executor = SaveExecutor::spawn(Arc::clone(&shared));

        let store = Arc::new(Store {
            shared,
            executor,
            data_dir: data_dir.clone(),
        });
        registry.insert(data_dir.clone(), Arc::downgrade(&store));

        info!(path = %data_dir.display(), "store opened");
        Ok(store)
    }

    /// Execute a fetch against the calling thread's scope.
    pub fn fetch(&self, request: &FetchRequest) -> Result<Vec<Record>> {
        self.shared.check_usable()?;
        let context = self.shared.pool.resolve();
        query::fetch(&self.shared, &context, request).map_err(|e| self.shared.raise_sync(e))
    }

    /// Submit a mutation to the save worker. The mutation runs against the
    /// worker thread's scope; its changes are propagated to durable storage
    /// before the task completes.
    pub fn submit<M>(&self, mutation: M) -> Result<()>
    where
        M: FnOnce(&ContextHandle) -> Result<()> + Send + 'static,
    {
        self.enqueue(Box::new(mutation), None)
    }

    /// Like [`Store::submit`], with a completion that fires strictly after
    /// the durable commit.
    pub fn submit_with_completion<M, C>(&self, mutation: M, completion: C) -> Result<()>
    where
        M: FnOnce(&ContextHandle) -> Result<()> + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(mutation), Some(Box::new(completion)))
    }

    fn enqueue(&self, mutation: MutationFn, completion: Option<CompletionFn>) -> Result<()> {
        self.shared.check_usable()?;
        self.executor.submit(SaveTask {
            mutation,
            completion,
        })
    }

    /// Bounded emptiness check: true iff no record of the kind is visible
    /// to the calling thread's scope. Never materializes records.
    pub fn is_entity_empty(&self, kind: &EntityKind) -> Result<bool> {
        self.shared.check_usable()?;
        let context = self.shared.pool.resolve();
        query::is_entity_empty(&self.shared, &context, kind).map_err(|e| self.shared.raise_sync(e))
    }

    /// Delete every visible record of the kind. Runs as a submitted
    /// mutation; durability comes from the save propagation that follows.
    pub fn clean_entity(&self, kind: &EntityKind) -> Result<()> {
        let kind = kind.clone();
        self.submit(move |scope| {
            let all = scope.fetch(&FetchRequest::new(kind.clone()))?;
            for record in all {
                scope.delete(&kind, record.id())?;
            }
            Ok(())
        })
    }

    /// Block until every submitted task has run to completion.
    pub fn drain(&self) {
        self.executor.drain();
    }

    /// The schema the store was opened with
    pub fn schema(&self) -> &SchemaDescriptor {
        self.shared.store.schema()
    }

    /// Operational counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            contexts: self.shared.pool.context_count(),
            generation: self.shared.store.generation(),
            records: self.shared.store.record_count(),
            executor: self.executor.stats(),
        }
    }

    /// Take the recorded fault, if an unrecoverable fault poisoned the
    /// store under [`FaultPolicy::Surface`].
    pub fn take_fault(&self) -> Option<Error> {
        self.shared.fault.lock().take()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.executor.shutdown();
        let mut registry = OPEN_STORES.lock();
        if let Some(entry) = registry.get(&self.data_dir) {
            if entry.upgrade().is_none() {
                registry.remove(&self.data_dir);
            }
        }
    }
}
