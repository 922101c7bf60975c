//! Bounded work queue
//!
//! Caps how many submitted futures run at once. Excess submissions wait in a
//! FIFO and start in submission order as running work finishes.
//!
//! Each running job holds a [`RunningSlot`]; dropping it (on completion,
//! panic, or runtime shutdown) frees the slot and drains the queue again, so
//! one job's failure never stalls the others.

use crate::error::QueueError;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

type Job = BoxFuture<'static, ()>;

/// Queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs currently executing
    pub running: usize,
    /// Jobs waiting for a slot
    pub pending: usize,
    /// Jobs finished, including failed ones
    pub completed: u64,
}

#[derive(Default)]
struct QueueState {
    running: usize,
    pending: VecDeque<Job>,
    completed: u64,
}

struct Inner {
    max: usize,
    state: Mutex<QueueState>,
}

/// FIFO queue with a concurrency cap
///
/// Cloning is cheap and shares the same queue.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    /// Create queue running at most `max` jobs at once (0 is treated as 1)
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                max: max.max(1),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Concurrency cap
    #[inline]
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.inner.max
    }

    /// Enqueue `fut` and wait for its output
    ///
    /// The job is enqueued on the first poll. If the returned future is
    /// dropped afterwards the job still runs; only its output is discarded.
    ///
    /// # Errors
    /// [`QueueError::NoRuntime`] if called outside a tokio runtime, and
    /// [`QueueError::TaskAborted`] if the job panicked or was dropped by a
    /// shutting-down runtime before completing.
    pub async fn submit<F, T>(&self, fut: F) -> Result<T, QueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(QueueError::NoRuntime);
        }

        let (tx, rx) = oneshot::channel();
        let job = async move {
            let _ = tx.send(fut.await);
        }
        .boxed();

        self.inner.state.lock().pending.push_back(job);
        self.inner.drain();

        rx.await.map_err(|_| QueueError::TaskAborted)
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        QueueStats {
            running: state.running,
            pending: state.pending.len(),
            completed: state.completed,
        }
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("max", &self.inner.max)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Inner {
    /// Start pending jobs while slots are free
    ///
    /// Without a runtime nothing can start, so pending jobs are dropped and
    /// their submitters see [`QueueError::TaskAborted`].
    fn drain(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            let orphaned = std::mem::take(&mut self.state.lock().pending);
            drop(orphaned);
            return;
        };

        loop {
            let job = {
                let mut state = self.state.lock();
                if state.running >= self.max {
                    return;
                }
                let Some(job) = state.pending.pop_front() else {
                    return;
                };
                state.running += 1;
                job
            };

            let slot = RunningSlot {
                inner: Arc::clone(self),
            };
            runtime.spawn(async move {
                let _slot = slot;
                job.await;
            });
        }
    }
}

struct RunningSlot {
    inner: Arc<Inner>,
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            state.running -= 1;
            state.completed += 1;
        }
        self.inner.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn returns_task_output() {
        let queue = WorkQueue::new(2);
        let out = queue.submit(async { 40 + 2 }).await.unwrap();
        assert_eq!(out, 42);
        assert_eq!(queue.stats().completed, 1);
    }

    #[test]
    fn submit_outside_runtime_fails_fast() {
        let queue = WorkQueue::new(1);
        let result = futures::executor::block_on(queue.submit(async { 1 }));
        assert!(matches!(result, Err(QueueError::NoRuntime)));
        assert_eq!(queue.stats(), QueueStats::default());
    }

    #[test]
    fn zero_is_clamped_to_one() {
        assert_eq!(WorkQueue::new(0).max_concurrency(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_cap() {
        let queue = WorkQueue::new(2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..8).map(|_| {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            queue.submit(async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            })
        });
        let results = join_all(jobs).await;

        assert!(results.iter().all(Result::is_ok));
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        let stats = queue.stats();
        assert_eq!((stats.running, stats.pending, stats.completed), (0, 0, 8));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn excess_runs_in_submission_order() {
        let queue = WorkQueue::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let jobs = (0..6).map(|i| {
            let order = Arc::clone(&order);
            queue.submit(async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                order.lock().push(i);
            })
        });
        join_all(jobs).await;

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn panicking_job_does_not_stall_queue() {
        let queue = WorkQueue::new(1);

        let failed = queue
            .submit(async {
                panic!("job failed");
            })
            .await;
        assert!(matches!(failed, Err(QueueError::TaskAborted)));

        let ok = queue.submit(async { "next" }).await.unwrap();
        assert_eq!(ok, "next");
        assert_eq!(queue.stats().running, 0);
    }

    #[tokio::test]
    async fn pending_is_visible_while_saturated() {
        let queue = WorkQueue::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .submit(async move {
                        let _ = release_rx.await;
                    })
                    .await
            }
        });
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.submit(async { 1 }).await }
        });

        while queue.stats().pending < 1 {
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.stats().running, 1);

        release_tx.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), 1);
    }
}
