//! Deferred execution for debounced notifications.
//!
//! A [`Scheduler`] runs a task after a delay, always on a later turn than
//! the call that scheduled it. [`TokioScheduler`] uses the ambient tokio
//! runtime; [`ManualScheduler`] keeps a virtual clock that the owner
//! advances, for hosts that drive their own loop and for tests.

use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` once `delay` has elapsed. Must not run it synchronously.
    fn schedule(&self, delay: Duration, task: Task);
}

/// Spawns tasks on a tokio runtime.
///
/// The runtime is the one current at construction, or else the one
/// current at scheduling time. Without any runtime the task runs on a
/// short-lived thread.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    handle: Option<Handle>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            handle: Handle::try_current().ok(),
        }
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("bound", &self.handle.is_some())
            .finish()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let handle = self.handle.clone().or_else(|| Handle::try_current().ok());
        match handle {
            Some(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task();
                });
            }
            None => {
                polyglot_log::debug!(
                    target: "polyglot::scheduler",
                    "no tokio runtime, deferring on a thread"
                );
                std::thread::spawn(move || {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    task();
                });
            }
        }
    }
}

struct Entry {
    due: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    seq: u64,
    queue: Vec<Entry>,
}

impl ManualState {
    fn pop_due(&mut self, limit: Duration) -> Option<Entry> {
        let index = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= limit)
            .min_by_key(|(_, e)| (e.due, e.seq))
            .map(|(i, _)| i)?;
        Some(self.queue.swap_remove(index))
    }
}

/// A scheduler driven by hand.
///
/// Tasks run only inside [`advance`](Self::advance) or
/// [`run_pending`](Self::run_pending), in due-time order, on the calling
/// thread.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Move the clock forward by `by` and run every task that falls due,
    /// including tasks scheduled by those tasks. Returns the number run.
    pub fn advance(&self, by: Duration) -> usize {
        let limit = self.state.lock().now + by;
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                let entry = state.pop_due(limit);
                if let Some(ref entry) = entry {
                    state.now = state.now.max(entry.due);
                }
                entry
            };
            match next {
                Some(entry) => {
                    (entry.task)();
                    ran += 1;
                }
                None => break,
            }
        }
        self.state.lock().now = limit;
        ran
    }

    /// Run tasks until the queue is empty, moving the clock to each due
    /// time. Returns the number run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                let entry = state.pop_due(Duration::MAX);
                if let Some(ref entry) = entry {
                    state.now = state.now.max(entry.due);
                }
                entry
            };
            match next {
                Some(entry) => {
                    (entry.task)();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut state = self.state.lock();
        state.seq += 1;
        let entry = Entry {
            due: state.now.saturating_add(delay),
            seq: state.seq,
            task,
        };
        state.queue.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |name: &'static str| -> Task {
            let sink = Arc::clone(&sink);
            Box::new(move || sink.lock().push(name))
        };
        (log, make)
    }

    #[test]
    fn test_manual_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();

        scheduler.schedule(Duration::from_millis(20), task("late"));
        scheduler.schedule(Duration::ZERO, task("first"));
        scheduler.schedule(Duration::ZERO, task("second"));
        assert!(log.lock().is_empty());

        assert_eq!(scheduler.advance(Duration::from_millis(10)), 2);
        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.advance(Duration::from_millis(10)), 1);
        assert_eq!(*log.lock(), vec!["first", "second", "late"]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));
    }

    #[test]
    fn test_manual_run_pending_follows_nested_tasks() {
        let scheduler = Arc::new(ManualScheduler::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = Arc::clone(&scheduler);
        let inner_count = Arc::clone(&count);
        scheduler.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                inner_count.fetch_add(1, Ordering::SeqCst);
                let again = Arc::clone(&inner_count);
                inner_scheduler.schedule(
                    Duration::from_millis(5),
                    Box::new(move || {
                        again.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.now(), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_defers() {
        let scheduler = TokioScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);

        scheduler.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tokio_scheduler_without_runtime_uses_thread() {
        let scheduler = TokioScheduler::new();
        let (tx, rx) = std::sync::mpsc::channel();

        scheduler.schedule(
            Duration::ZERO,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
