//! Debounced delivery of the latest value to a sink.
//!
//! # Modes
//!
//! - **Trailing** (default): every [`Debouncer::schedule`] call restarts the
//!   wait window; when the window elapses without a new call, the sink
//!   receives the last value passed in. A zero wait collapses every call
//!   made before the scheduler's next turn.
//! - **Immediate**: the first call of a window reaches the sink at once;
//!   later calls inside the window are dropped, and each of them extends
//!   the window.
//!
//! The sink runs at most once per window.

use crate::scheduler::{Scheduler, Task};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Wait window and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceOptions {
    pub wait: Duration,
    pub immediate: bool,
}

impl DebounceOptions {
    pub fn trailing(wait: Duration) -> Self {
        Self {
            wait,
            immediate: false,
        }
    }

    pub fn immediate(wait: Duration) -> Self {
        Self {
            wait,
            immediate: true,
        }
    }
}

type Sink<T> = Box<dyn Fn(T) + Send + Sync>;

struct State<T> {
    /// Bumped by every call; a timer only acts if it still matches.
    generation: u64,
    pending: Option<T>,
    locked: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    sink: Sink<T>,
    options: DebounceOptions,
    scheduler: Arc<dyn Scheduler>,
}

/// Collapses bursts of values into single sink calls.
pub struct Debouncer<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(
        options: DebounceOptions,
        scheduler: Arc<dyn Scheduler>,
        sink: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    generation: 0,
                    pending: None,
                    locked: false,
                }),
                sink: Box::new(sink),
                options,
                scheduler,
            }),
        }
    }

    pub fn options(&self) -> DebounceOptions {
        self.shared.options
    }

    pub fn schedule(&self, value: T) {
        if self.shared.options.immediate {
            self.schedule_leading(value);
        } else {
            self.schedule_trailing(value);
        }
    }

    fn schedule_trailing(&self, value: T) {
        let generation = {
            let mut state = self.shared.state.lock();
            state.pending = Some(value);
            state.generation += 1;
            state.generation
        };

        let weak = Arc::downgrade(&self.shared);
        self.arm(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                let value = {
                    let mut state = shared.state.lock();
                    if state.generation != generation {
                        return;
                    }
                    state.pending.take()
                };
                if let Some(value) = value {
                    (shared.sink)(value);
                }
            }
        }));
    }

    fn schedule_leading(&self, value: T) {
        let (fire, generation) = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            let fire = !state.locked;
            state.locked = true;
            (fire, state.generation)
        };

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        self.arm(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                let mut state = shared.state.lock();
                if state.generation == generation {
                    state.locked = false;
                }
            }
        }));

        if fire {
            (self.shared.sink)(value);
        }
    }

    fn arm(&self, task: Task) {
        self.shared.scheduler.schedule(self.shared.options.wait, task);
    }

    /// Deliver the pending value now instead of at the end of the window.
    /// Returns false when nothing was pending.
    pub fn flush(&self) -> bool {
        let value = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            state.pending.take()
        };
        match value {
            Some(value) => {
                (self.shared.sink)(value);
                true
            }
            None => false,
        }
    }

    /// Drop the pending value, if any, without delivering it.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.generation += 1;
        state.pending = None;
        state.locked = false;
    }

    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualScheduler, TokioScheduler};

    fn collecting(
        options: DebounceOptions,
        scheduler: Arc<dyn Scheduler>,
    ) -> (Debouncer<u32>, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debouncer = Debouncer::new(options, scheduler, move |v| sink.lock().push(v));
        (debouncer, seen)
    }

    #[test]
    fn test_trailing_delivers_latest_once() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (debouncer, seen) = collecting(DebounceOptions::default(), scheduler.clone());

        debouncer.schedule(1);
        debouncer.schedule(2);
        debouncer.schedule(3);
        assert!(seen.lock().is_empty());
        assert!(debouncer.is_pending());

        scheduler.run_pending();
        assert_eq!(*seen.lock(), vec![3]);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_trailing_window_restarts() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (debouncer, seen) = collecting(
            DebounceOptions::trailing(Duration::from_millis(100)),
            scheduler.clone(),
        );

        debouncer.schedule(1);
        scheduler.advance(Duration::from_millis(60));
        debouncer.schedule(2);
        scheduler.advance(Duration::from_millis(60));
        assert!(seen.lock().is_empty());

        scheduler.advance(Duration::from_millis(40));
        assert_eq!(*seen.lock(), vec![2]);

        debouncer.schedule(3);
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*seen.lock(), vec![2, 3]);
    }

    #[test]
    fn test_immediate_fires_first_and_suppresses_rest() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (debouncer, seen) = collecting(
            DebounceOptions::immediate(Duration::from_millis(50)),
            scheduler.clone(),
        );

        debouncer.schedule(1);
        debouncer.schedule(2);
        assert_eq!(*seen.lock(), vec![1]);

        scheduler.advance(Duration::from_millis(30));
        debouncer.schedule(3);
        // The third call extended the window to t=80.
        scheduler.advance(Duration::from_millis(30));
        debouncer.schedule(4);
        assert_eq!(*seen.lock(), vec![1]);

        scheduler.advance(Duration::from_millis(50));
        debouncer.schedule(5);
        assert_eq!(*seen.lock(), vec![1, 5]);
    }

    #[test]
    fn test_flush_and_cancel() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (debouncer, seen) = collecting(DebounceOptions::default(), scheduler.clone());

        debouncer.schedule(7);
        assert!(debouncer.flush());
        assert!(!debouncer.flush());
        scheduler.run_pending();
        assert_eq!(*seen.lock(), vec![7]);

        debouncer.schedule(8);
        debouncer.cancel();
        scheduler.run_pending();
        assert_eq!(*seen.lock(), vec![7]);
    }

    #[test]
    fn test_dropped_debouncer_never_delivers() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (debouncer, seen) = collecting(DebounceOptions::default(), scheduler.clone());

        debouncer.schedule(1);
        drop(debouncer);
        scheduler.run_pending();
        assert!(seen.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_wait_defers_to_next_turn() {
        let (debouncer, seen) = collecting(DebounceOptions::default(), Arc::new(TokioScheduler::new()));

        debouncer.schedule(1);
        debouncer.schedule(2);
        assert!(seen.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*seen.lock(), vec![2]);
    }
}
