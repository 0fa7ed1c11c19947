//! Save executor: the dedicated background worker for all mutating work
//!
//! Tasks are explicit messages (a boxed mutation plus an optional boxed
//! completion) drained FIFO by a single worker thread, so at most one
//! mutation+save cycle is ever in flight and no two tasks race on scope
//! creation or the save chain. The worker resolves the scope on its own
//! thread (thread identity must be taken where the mutation actually runs),
//! invokes the mutation, propagates the save child→root, then fires the
//! completion.

use crate::handle::ContextHandle;
use crate::manager::Shared;
use crate::propagate;
use lamina_core::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, warn};

pub(crate) type MutationFn = Box<dyn FnOnce(&ContextHandle) -> Result<()> + Send>;
pub(crate) type CompletionFn = Box<dyn FnOnce() + Send>;

/// One unit of mutating work
pub(crate) struct SaveTask {
    pub(crate) mutation: MutationFn,
    pub(crate) completion: Option<CompletionFn>,
}

/// Executor metrics snapshot
#[derive(Debug, Clone)]
pub struct ExecutorStats {
    /// Tasks waiting in the queue
    pub queue_depth: usize,
    /// Whether a task is currently executing
    pub in_flight: bool,
    /// Tasks finished since the store opened (including failed ones)
    pub tasks_completed: u64,
}

struct ExecutorInner {
    queue: Mutex<VecDeque<SaveTask>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    in_flight: AtomicBool,
    tasks_completed: AtomicU64,
}

/// Single-worker serial executor for mutation+save cycles.
pub(crate) struct SaveExecutor {
    inner: Arc<ExecutorInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SaveExecutor {
    /// Spawn the worker thread (named `lamina-save`).
    pub(crate) fn spawn(shared: Arc<Shared>) -> Self {
        let inner = Arc::new(ExecutorInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            tasks_completed: AtomicU64::new(0),
        });

        let worker_inner = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name("lamina-save".to_string())
            .spawn(move || worker_loop(&worker_inner, &shared))
            .expect("failed to spawn save worker thread");

        SaveExecutor {
            inner,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Enqueue a task. Rejected after shutdown: the worker is gone and the
    /// task would never run.
    pub(crate) fn submit(&self, task: SaveTask) -> Result<()> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(Error::ShutDown);
        }

        {
            let mut queue = self.inner.queue.lock();
            queue.push_back(task);
        }
        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until the queue is empty and no task is in flight.
    ///
    /// The worker keeps running; this does NOT signal shutdown.
    pub(crate) fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while !queue.is_empty() || self.inner.in_flight.load(Ordering::Acquire) {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Signal the worker to exit and join it. Queued tasks are drained
    /// before the worker exits.
    pub(crate) fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);

        // Lock the queue before notifying to prevent lost-wakeup: a worker
        // between its shutdown check and the condvar wait holds this lock,
        // so acquiring it guarantees the worker either is already waiting
        // (and the notify wakes it) or will re-check the flag.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    pub(crate) fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            queue_depth: self.inner.queue.lock().len(),
            in_flight: self.inner.in_flight.load(Ordering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(Ordering::Relaxed),
        }
    }
}

/// RAII guard clearing `in_flight` and waking drain waiters on drop, so the
/// bookkeeping stays correct even when a task panics.
struct InFlightGuard<'a> {
    inner: &'a ExecutorInner,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
        self.inner.tasks_completed.fetch_add(1, Ordering::Relaxed);

        // Lock the queue before notifying: drain() checks its condition and
        // waits while holding this lock, so acquiring it first means drain
        // is either already waiting (the notify wakes it) or will re-check.
        let _queue = self.inner.queue.lock();
        self.inner.drain_cond.notify_all();
    }
}

fn worker_loop(inner: &ExecutorInner, shared: &Arc<Shared>) {
    loop {
        let task = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    inner.in_flight.store(true, Ordering::Release);
                    break task;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = InFlightGuard { inner };

        // catch_unwind keeps a panicking mutation from killing the worker;
        // the guard keeps drain() from hanging either way
        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_task(shared, task)
        })) {
            error!(
                "mutation task panicked: {:?}",
                panic
                    .downcast_ref::<&str>()
                    .copied()
                    .unwrap_or("(non-string panic)")
            );
        }
    }
}

/// One mutation+save cycle, entirely on the worker thread.
fn run_task(shared: &Arc<Shared>, task: SaveTask) {
    if shared.is_poisoned() {
        warn!("dropping task, store already poisoned");
        return;
    }

    // Resolve on the executing thread, not the submitting one
    let context = shared.pool.resolve();
    let scope = ContextHandle::new(Arc::clone(shared), Arc::clone(&context));

    let result = (task.mutation)(&scope)
        .and_then(|_| propagate::propagate(shared, context.id()));

    match result {
        Ok(()) => {
            // Completion fires only after the root has persisted
            if let Some(completion) = task.completion {
                completion();
            }
        }
        Err(err) => shared.raise_async(err),
    }
}
