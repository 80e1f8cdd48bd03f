//! Bounded background pool for named jobs with latest-wins coalescing.
//!
//! Each job runs under a name (for example `"sheet_preview"`). While a job of that name is in
//! flight, further submissions do not queue up: the newest one replaces any pending job, and the
//! in-flight job's [`CancelToken`] is tripped. A finished job's value is delivered only if no newer
//! submission for its name exists. A job that panics delivers nothing; its slot is freed and any
//! pending job for the name still runs.

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::{Duration, Instant},
};

use crate::foundation::error::{SheetError, SheetResult};

pub const DEFAULT_THREADS: usize = 2;

/// Cooperative cancellation flag handed to every job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// A delivered job result.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskOutput<T> {
    pub name: String,
    /// Submission counter for `name`, starting at 1.
    pub generation: u64,
    pub value: T,
}

type Job<T> = Box<dyn FnOnce(&CancelToken) -> T + Send + 'static>;

struct Slot<T> {
    latest: u64,
    running: Option<CancelToken>,
    pending: Option<(u64, Job<T>)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            latest: 0,
            running: None,
            pending: None,
        }
    }
}

struct Shared<T> {
    pool: rayon::ThreadPool,
    slots: Mutex<HashMap<String, Slot<T>>>,
    idle: Condvar,
    tx: mpsc::Sender<TaskOutput<T>>,
}

impl<T: Send + 'static> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn(self: &Arc<Self>, name: String, generation: u64, token: CancelToken, job: Job<T>) {
        let shared = Arc::clone(self);
        self.pool.spawn(move || {
            let value = catch_unwind(AssertUnwindSafe(|| job(&token)));
            if value.is_err() {
                tracing::warn!(task = %name, generation, "job panicked");
            }
            shared.finish(name, generation, value.ok());
        });
    }

    fn finish(self: &Arc<Self>, name: String, generation: u64, value: Option<T>) {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(&name) else {
            return;
        };
        slot.running = None;
        let deliver = generation == slot.latest;
        let next = slot.pending.take().map(|(next_gen, job)| {
            let token = CancelToken::default();
            slot.running = Some(token.clone());
            (next_gen, token, job)
        });
        let any_running = slots.values().any(|s| s.running.is_some());
        drop(slots);

        if let Some(value) = value.filter(|_| deliver) {
            let out = TaskOutput {
                name: name.clone(),
                generation,
                value,
            };
            if self.tx.send(out).is_err() {
                tracing::debug!(task = %name, "result receiver gone");
            }
        } else if !deliver {
            tracing::debug!(task = %name, generation, "discarding superseded result");
        }

        match next {
            Some((next_gen, token, job)) => self.spawn(name, next_gen, token, job),
            None if !any_running => self.idle.notify_all(),
            None => {}
        }
    }
}

pub struct WorkerPool<T> {
    shared: Arc<Shared<T>>,
    rx: mpsc::Receiver<TaskOutput<T>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(threads: usize) -> SheetResult<Self> {
        if threads == 0 {
            return Err(SheetError::validation("worker pool needs at least one thread"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gifsheet-worker-{i}"))
            .build()
            .map_err(|e| SheetError::validation(format!("failed to build worker pool: {e}")))?;
        let (tx, rx) = mpsc::channel();
        tracing::debug!(threads, "worker pool started");
        Ok(Self {
            shared: Arc::new(Shared {
                pool,
                slots: Mutex::new(HashMap::new()),
                idle: Condvar::new(),
                tx,
            }),
            rx,
        })
    }

    pub fn with_default_threads() -> SheetResult<Self> {
        Self::new(DEFAULT_THREADS)
    }

    /// Submit `job` under `name` and return its generation.
    pub fn submit<F>(&self, name: &str, job: F) -> u64
    where
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        let mut slots = self.shared.lock();
        let slot = slots.entry(name.to_owned()).or_default();
        slot.latest += 1;
        let generation = slot.latest;

        if let Some(token) = &slot.running {
            token.cancel();
            if slot.pending.replace((generation, Box::new(job))).is_some() {
                tracing::debug!(task = name, "replaced pending job");
            }
            return generation;
        }

        let token = CancelToken::default();
        slot.running = Some(token.clone());
        drop(slots);
        self.shared
            .spawn(name.to_owned(), generation, token, Box::new(job));
        generation
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.shared
            .lock()
            .get(name)
            .is_some_and(|s| s.running.is_some())
    }

    /// Latest generation submitted for `name`, 0 if none.
    pub fn latest_generation(&self, name: &str) -> u64 {
        self.shared.lock().get(name).map_or(0, |s| s.latest)
    }

    /// Next delivered result, without blocking.
    pub fn poll(&self) -> Option<TaskOutput<T>> {
        self.rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<TaskOutput<T>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Block until no job is running or pending. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.shared.lock();
        loop {
            if slots.values().all(|s| s.running.is_none()) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            slots = self
                .shared
                .idle
                .wait_timeout(slots, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
