//! Cooperative periodic task queues.
//!
//! A [`TaskQueue`] is a named set of `(period, job)` entries driven by a
//! single scheduler task with one-second ticks. Jobs within a queue are
//! serialized with respect to each other; separate queues run
//! concurrently. The proxy uses three: `admin` (cache expiry and
//! configuration reloads), `upstream` (registration push) and
//! `downstream` (load-balancer refresh).
//!
//! [`TaskQueue::fire`] runs every job once, immediately, whatever its
//! period; it is called at startup so caches and snapshots are populated
//! before the first request is served. A period of `0` registers a job
//! that only runs on explicit fire.
//!
//! [`QueueHandle::stop`] is honored at the next tick boundary: a job
//! that is already running finishes first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;

type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct Task {
    period: u64,
    job: Job,
}

/// A named set of periodic jobs.
pub struct TaskQueue {
    name: String,
    tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registers a job running every `period` seconds.
    /// `period = 0` means the job only runs on [`TaskQueue::fire`].
    pub fn register<F, Fut>(&mut self, period: u64, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(Task {
            period,
            job: Arc::new(move || Box::pin(job())),
        });
    }

    /// Runs every registered job once, back to back.
    pub async fn fire(&self) {
        for task in &self.tasks {
            (task.job)().await;
        }
    }

    /// Starts the scheduler on a background task and consumes the queue.
    pub fn run(self) -> QueueHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let name = self.name.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(
                tokio::time::Instant::now() + Duration::from_secs(1),
                Duration::from_secs(1),
            );
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut tick: u64 = 0;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        tick += 1;
                        for task in &self.tasks {
                            if task.period > 0 && tick % task.period == 0 {
                                (task.job)().await;
                            }
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            tracing::debug!(queue = %self.name, "task queue stopped");
        });
        QueueHandle {
            name,
            stop: stop_tx,
            handle,
        }
    }
}

/// Handle on a running queue.
pub struct QueueHandle {
    name: String,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl QueueHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the scheduler to exit at the next tick boundary.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Waits for the scheduler task to finish.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}
