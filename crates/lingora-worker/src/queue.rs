//! Cleanup task queue: bounded submission, worker pool, drain on shutdown.
//!
//! Submission never blocks. When the queue is saturated the task is dropped
//! with a warning and the superseded blob stays behind as an orphan.
//! [`CleanupQueue::shutdown`] stops intake, drains tasks already accepted and
//! waits for in-flight handlers before returning.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Semaphore};

/// A superseded storage blob scheduled for deletion.
#[derive(Debug, Clone)]
pub struct CleanupTask {
    pub owner_id: String,
    pub previous_key: String,
}

/// Executes one cleanup task.
///
/// Implemented by the service layer. The queue makes exactly one attempt per
/// task; failures are logged and never retried.
#[async_trait]
pub trait CleanupHandler: Send + Sync {
    async fn handle(&self, task: &CleanupTask) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct CleanupQueueConfig {
    pub max_workers: usize,
    pub queue_capacity: usize,
}

impl Default for CleanupQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_capacity: 256,
        }
    }
}

#[derive(Clone)]
pub struct CleanupQueue {
    task_tx: mpsc::Sender<CleanupTask>,
    shutdown_tx: mpsc::Sender<oneshot::Sender<()>>,
}

impl CleanupQueue {
    /// Starts the worker pool and returns a submission handle.
    pub fn start(config: CleanupQueueConfig, handler: Arc<dyn CleanupHandler>) -> Self {
        let (task_tx, task_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let max_workers = config.max_workers.max(1);
        tokio::spawn(async move {
            Self::worker_pool(max_workers, handler, task_rx, shutdown_rx).await;
        });

        Self {
            task_tx,
            shutdown_tx,
        }
    }

    /// Submits a task without blocking. Returns `false` when the queue is
    /// saturated or stopped and the task was dropped.
    pub fn submit(&self, task: CleanupTask) -> bool {
        match self.task_tx.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                tracing::warn!(
                    owner_id = %task.owner_id,
                    key = %task.previous_key,
                    "Cleanup queue saturated, dropping task"
                );
                false
            }
            Err(TrySendError::Closed(task)) => {
                tracing::warn!(
                    owner_id = %task.owner_id,
                    key = %task.previous_key,
                    "Cleanup queue stopped, dropping task"
                );
                false
            }
        }
    }

    /// Stops intake, drains tasks already accepted and waits for in-flight
    /// handlers to finish. Safe to call more than once; later calls return
    /// immediately.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating cleanup queue shutdown");
        let (done_tx, done_rx) = oneshot::channel();
        if self.shutdown_tx.send(done_tx).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    async fn worker_pool(
        max_workers: usize,
        handler: Arc<dyn CleanupHandler>,
        mut task_rx: mpsc::Receiver<CleanupTask>,
        mut shutdown_rx: mpsc::Receiver<oneshot::Sender<()>>,
    ) {
        tracing::info!(max_workers, "Cleanup worker pool started");
        let semaphore = Arc::new(Semaphore::new(max_workers));

        loop {
            tokio::select! {
                signal = shutdown_rx.recv() => {
                    tracing::info!("Cleanup worker pool draining before shutdown");
                    task_rx.close();
                    while let Some(task) = task_rx.recv().await {
                        Self::dispatch(&semaphore, &handler, task).await;
                    }
                    // All permits back means every in-flight handler returned.
                    let _ = semaphore.clone().acquire_many_owned(max_workers as u32).await;
                    if let Some(done_tx) = signal {
                        let _ = done_tx.send(());
                    }
                    break;
                }
                maybe_task = task_rx.recv() => {
                    match maybe_task {
                        Some(task) => Self::dispatch(&semaphore, &handler, task).await,
                        None => break,
                    }
                }
            }
        }

        tracing::info!("Cleanup worker pool stopped");
    }

    async fn dispatch(
        semaphore: &Arc<Semaphore>,
        handler: &Arc<dyn CleanupHandler>,
        task: CleanupTask,
    ) {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        let handler = Arc::clone(handler);
        tokio::spawn(async move {
            let _permit = permit;
            Self::run_task(handler, task).await;
        });
    }

    #[tracing::instrument(skip(handler, task), fields(owner_id = %task.owner_id, key = %task.previous_key))]
    async fn run_task(handler: Arc<dyn CleanupHandler>, task: CleanupTask) {
        let started = Instant::now();
        match handler.handle(&task).await {
            Ok(()) => {
                tracing::debug!(
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Cleanup task finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    owner_id = %task.owner_id,
                    key = %task.previous_key,
                    "Cleanup task failed, blob may be orphaned"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn task(key: &str) -> CleanupTask {
        CleanupTask {
            owner_id: "user-1".to_string(),
            previous_key: key.to_string(),
        }
    }

    struct RecordingHandler {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CleanupHandler for RecordingHandler {
        async fn handle(&self, task: &CleanupTask) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(task.previous_key.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn accepted_tasks_reach_the_handler() {
        let handler = Arc::new(RecordingHandler {
            seen: Mutex::new(Vec::new()),
        });
        let queue = CleanupQueue::start(CleanupQueueConfig::default(), handler.clone());

        assert!(queue.submit(task("avatars/a/1.webp")));
        assert!(queue.submit(task("avatars/a/2.webp")));
        assert!(queue.submit(task("avatars/a/3.webp")));
        queue.shutdown().await;

        let mut seen = handler.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(
            seen,
            vec!["avatars/a/1.webp", "avatars/a/2.webp", "avatars/a/3.webp"]
        );
    }

    struct FailingHandler {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl CleanupHandler for FailingHandler {
        async fn handle(&self, _task: &CleanupTask) -> anyhow::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("backend unavailable"))
        }
    }

    #[tokio::test]
    async fn failed_tasks_are_not_retried() {
        let handler = Arc::new(FailingHandler {
            attempts: AtomicUsize::new(0),
        });
        let queue = CleanupQueue::start(CleanupQueueConfig::default(), handler.clone());

        assert!(queue.submit(task("avatars/a/1.webp")));
        queue.shutdown().await;

        assert_eq!(handler.attempts.load(Ordering::SeqCst), 1);
    }

    struct ConcurrencyProbe {
        running: AtomicUsize,
        high_water: AtomicUsize,
        executed: AtomicUsize,
    }

    #[async_trait]
    impl CleanupHandler for ConcurrencyProbe {
        async fn handle(&self, _task: &CleanupTask) -> anyhow::Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.executed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn in_flight_tasks_capped_at_max_workers() {
        let handler = Arc::new(ConcurrencyProbe {
            running: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            executed: AtomicUsize::new(0),
        });
        let config = CleanupQueueConfig {
            max_workers: 2,
            queue_capacity: 16,
        };
        let queue = CleanupQueue::start(config, handler.clone());

        for n in 0..6 {
            assert!(queue.submit(task(&format!("avatars/a/{n}.webp"))));
        }
        queue.shutdown().await;

        assert_eq!(handler.executed.load(Ordering::SeqCst), 6);
        assert!(handler.high_water.load(Ordering::SeqCst) <= 2);
    }

    struct GatedHandler {
        entered: mpsc::Sender<()>,
        gate: Semaphore,
        executed: AtomicUsize,
    }

    #[async_trait]
    impl CleanupHandler for GatedHandler {
        async fn handle(&self, _task: &CleanupTask) -> anyhow::Result<()> {
            let _ = self.entered.send(()).await;
            let _permit = self.gate.acquire().await;
            self.executed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn saturated_queue_drops_tasks() {
        let (entered_tx, mut entered_rx) = mpsc::channel(8);
        let handler = Arc::new(GatedHandler {
            entered: entered_tx,
            gate: Semaphore::new(0),
            executed: AtomicUsize::new(0),
        });
        let config = CleanupQueueConfig {
            max_workers: 1,
            queue_capacity: 1,
        };
        let queue = CleanupQueue::start(config, handler.clone());

        // Occupy the only worker before the burst arrives.
        assert!(queue.submit(task("avatars/a/0.webp")));
        entered_rx.recv().await.expect("first task should start");

        // The channel slot plus the task held by the dispatch loop can still
        // be absorbed; everything beyond that is dropped.
        let accepted = (1..=4)
            .filter(|n| queue.submit(task(&format!("avatars/a/{n}.webp"))))
            .count();
        assert!((1..=2).contains(&accepted));

        handler.gate.add_permits(16);
        queue.shutdown().await;
        assert_eq!(handler.executed.load(Ordering::SeqCst), 1 + accepted);
    }
}
