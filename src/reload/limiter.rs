//! Token-bucket limiter with one coalesced deferred call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

type Task<T> = Box<dyn FnMut() -> T + Send>;

/// What happened to a [`Limiter::trigger`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The task ran during this call.
    Executed(T),
    /// No tokens left; the task will run at the next tick. Carries the
    /// result of the most recent execution, if any.
    Scheduled(Option<T>),
}

struct Inner<T> {
    tokens: usize,
    pending: bool,
    last: Option<T>,
    task: Task<T>,
}

impl<T: Clone> Inner<T> {
    fn execute(&mut self) -> T {
        self.tokens = self.tokens.saturating_sub(1);
        let result = (self.task)();
        self.last = Some(result.clone());
        result
    }
}

/// Runs a task at most `capacity` times per interval.
///
/// Calls beyond that are coalesced into a single execution at the next
/// tick. Executions are serialized: the lock is held while the task runs,
/// so `trigger` blocks and must be called from a blocking context.
pub struct Limiter<T> {
    interval: Duration,
    capacity: usize,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + Send + 'static> Limiter<T> {
    pub fn new<F>(interval: Duration, capacity: usize, task: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self {
            interval,
            capacity,
            inner: Mutex::new(Inner {
                tokens: capacity,
                pending: false,
                last: None,
                task: Box::new(task),
            }),
        }
    }

    /// Run the task now if a token is left, otherwise schedule it.
    pub fn trigger(&self) -> Outcome<T> {
        let mut inner = self.inner.lock();
        if inner.tokens > 0 {
            Outcome::Executed(inner.execute())
        } else {
            inner.pending = true;
            Outcome::Scheduled(inner.last.clone())
        }
    }

    /// Refill the tokens and run a scheduled call, if any.
    pub fn tick(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        inner.tokens = self.capacity;
        if !inner.pending {
            return None;
        }
        inner.pending = false;
        Some(inner.execute())
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending
    }

    /// Tick every interval on the runtime until `shutdown` fires.
    ///
    /// Ticks run on the blocking pool since the task may do I/O.
    pub fn spawn_ticker(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // the first tick completes immediately and the bucket starts full
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let limiter = self.clone();
                        if let Err(e) = tokio::task::spawn_blocking(move || limiter.tick()).await {
                            tracing::error!(error = %e, "Limiter tick panicked");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Limiter ticker stopped");
        })
    }
}

impl<T> fmt::Debug for Limiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Limiter")
            .field("interval", &self.interval)
            .field("capacity", &self.capacity)
            .field("tokens", &inner.tokens)
            .field("pending", &inner.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(capacity: usize) -> (Limiter<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let limiter = Limiter::new(Duration::from_secs(60), capacity, move || {
            counter.fetch_add(1, Ordering::SeqCst) + 1
        });
        (limiter, calls)
    }

    #[test]
    fn test_burst_collapses() {
        let (limiter, calls) = counting(2);

        assert_eq!(limiter.trigger(), Outcome::Executed(1));
        assert_eq!(limiter.trigger(), Outcome::Executed(2));
        for _ in 0..10 {
            assert_eq!(limiter.trigger(), Outcome::Scheduled(Some(2)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // one deferred execution for the whole burst
        assert_eq!(limiter.tick(), Some(3));
        assert_eq!(limiter.tick(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deferred_call_uses_a_token() {
        let (limiter, _) = counting(2);
        limiter.trigger();
        limiter.trigger();
        limiter.trigger();

        limiter.tick();
        assert_eq!(limiter.trigger(), Outcome::Executed(4));
        assert!(matches!(limiter.trigger(), Outcome::Scheduled(_)));
    }

    #[test]
    fn test_zero_capacity_only_runs_on_tick() {
        let (limiter, calls) = counting(0);
        assert_eq!(limiter.trigger(), Outcome::Scheduled(None));
        assert!(limiter.is_pending());
        assert_eq!(limiter.tick(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ticker_runs_pending_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let limiter = Arc::new(Limiter::new(Duration::from_millis(50), 1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let (tx, rx) = broadcast::channel(1);
        let handle = limiter.clone().spawn_ticker(rx);

        limiter.trigger();
        limiter.trigger();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        for _ in 0..200 {
            if calls.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
