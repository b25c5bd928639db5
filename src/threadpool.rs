//! A fixed worker pool with a mutex-guarded FIFO task queue.
//!
//! Condvar-gated work queue, threads spawned once at construction, and a
//! blocking wait for drain: `wait()` blocks until the queue is empty *and*
//! no worker is mid-task, and `Drop` joins every worker after a broadcast
//! shutdown.
//!
//! Task priority is not modeled, only plain FIFO-per-single-worker
//! ordering, satisfied by a plain `VecDeque`.
//!
//! The task queue and the active-worker counter live under one `Mutex`
//! rather than two, so `wait()` and the worker loop can never take the two
//! locks in different orders.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct State {
    queue: VecDeque<Task>,
    active_threads: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    queue_cond: Condvar,
    idle_cond: Condvar,
}

/// A fixed-size worker pool. `num_threads` is resolved by the caller
/// (typically via `EngineOptions::resolve_threads`); this type takes a
/// concrete count and never auto-detects on its own.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawns `num_threads` workers, each looping: wait for a task or
    /// shutdown, dequeue, run it outside the lock, decrement
    /// `active_threads`, and signal `idle_cond` when the pool has drained.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                active_threads: 0,
                shutdown: false,
            }),
            queue_cond: Condvar::new(),
            idle_cond: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for _ in 0..num_threads {
            let shared = shared.clone();
            workers.push(thread::spawn(move || worker_loop(shared)));
        }

        ThreadPool { shared, workers }
    }

    /// Appends `task` to the FIFO and wakes one waiting worker.
    pub fn add_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock().unwrap();
        state.queue.push_back(Box::new(task));
        self.shared.queue_cond.notify_one();
    }

    /// Blocks until the task queue is empty and every worker has returned
    /// to idle. Returns no earlier than the completion of every task added
    /// before the call.
    pub fn wait(&self) {
        let state = self.shared.state.lock().unwrap();
        let _guard = self
            .shared
            .idle_cond
            .wait_while(state, |state| state.active_threads > 0 || !state.queue.is_empty())
            .unwrap();
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if state.shutdown {
                    return;
                }
                if let Some(task) = state.queue.pop_front() {
                    state.active_threads += 1;
                    break task;
                }
                state = shared.queue_cond.wait(state).unwrap();
            }
        };

        task();

        let mut state = shared.state.lock().unwrap();
        state.active_threads -= 1;
        if state.active_threads == 0 && state.queue.is_empty() {
            shared.idle_cond.notify_all();
        }
    }
}

impl Drop for ThreadPool {
    /// Sets the shutdown flag, broadcasts `queue_cond`, and joins every
    /// worker. Blocks until all in-flight work completes.
    fn drop(&mut self) {
        self.shared.state.lock().unwrap().shutdown = true;
        self.shared.queue_cond.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Runs `f` once per `item`, in parallel across a freshly created pool of
/// `num_threads` workers, and returns results in the original index order.
/// Each worker writes into its own indexed slot, so no two workers ever
/// touch the same slot.
pub fn parallel_map<T, R, F>(items: Vec<T>, num_threads: usize, f: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    let pool = ThreadPool::new(num_threads);
    let f = Arc::new(f);
    let len = items.len();
    let slots: Arc<Mutex<Vec<Option<R>>>> =
        Arc::new(Mutex::new((0..len).map(|_| None).collect()));

    for (index, item) in items.into_iter().enumerate() {
        let f = f.clone();
        let slots = slots.clone();
        pool.add_task(move || {
            let result = f(item);
            slots.lock().unwrap()[index] = Some(result);
        });
    }
    pool.wait();
    drop(pool);

    Arc::try_unwrap(slots)
        .unwrap_or_else(|arc| Mutex::new(std::mem::take(&mut *arc.lock().unwrap())))
        .into_inner()
        .unwrap()
        .into_iter()
        .map(|slot| slot.expect("every slot is populated before wait() returns"))
        .collect()
}
