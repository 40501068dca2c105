//! Bounded job queue and worker pool.
//!
//! Requests are accepted into a fixed-capacity channel; a fixed number of
//! workers take one job at a time. A full queue is reported back to the
//! caller instead of buffering without bound. Dropping every [`JobQueue`]
//! handle closes the channel; workers finish what is queued and exit.

use crate::job::JobKey;
use crate::notify::{JobNotification, Notifier};
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is full")]
    Full,

    #[error("Job queue is closed")]
    Closed,
}

/// A job waiting for a worker.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub key: JobKey,
    pub notification_url: Option<String>,
    pub accepted_at: Instant,
}

impl JobRequest {
    pub fn new(key: JobKey, notification_url: Option<String>) -> Self {
        Self {
            key,
            notification_url,
            accepted_at: Instant::now(),
        }
    }
}

/// Sending half of the job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<JobRequest>,
}

impl JobQueue {
    /// Enqueue without waiting.
    pub fn submit(&self, request: JobRequest) -> Result<(), QueueError> {
        match self.sender.try_send(request) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(QueueError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }
}

/// Handles of the running workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `num_workers` workers reading from a queue of `queue_size`.
    pub fn start(
        orchestrator: Arc<Orchestrator>,
        notifier: Option<Notifier>,
        num_workers: usize,
        queue_size: usize,
    ) -> (JobQueue, WorkerPool) {
        let (sender, receiver) = mpsc::channel(queue_size);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..num_workers)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    orchestrator: orchestrator.clone(),
                    notifier: notifier.clone(),
                };
                tokio::spawn(worker.run(receiver.clone()))
            })
            .collect();

        info!(num_workers, queue_size, "Worker pool started");

        (JobQueue { sender }, WorkerPool { handles })
    }

    /// Wait until every worker has exited.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task panicked");
            }
        }
        info!("Worker pool stopped");
    }
}

struct Worker {
    id: usize,
    orchestrator: Arc<Orchestrator>,
    notifier: Option<Notifier>,
}

impl Worker {
    async fn run(self, receiver: Arc<Mutex<mpsc::Receiver<JobRequest>>>) {
        debug!(worker_id = self.id, "Worker started");

        loop {
            let request = { receiver.lock().await.recv().await };
            match request {
                Some(request) => self.handle(request).await,
                None => break,
            }
        }

        debug!(worker_id = self.id, "Worker stopped");
    }

    async fn handle(&self, request: JobRequest) {
        let queued_ms = request.accepted_at.elapsed().as_millis() as u64;
        info!(
            worker_id = self.id,
            folder_id = %request.key,
            queued_ms,
            "Job started"
        );

        let start = Instant::now();
        let result = self.orchestrator.process_job(&request.key).await;
        metrics::histogram!("pose.job.duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => {
                metrics::counter!("pose.jobs.succeeded").increment(1);
                info!(
                    worker_id = self.id,
                    folder_id = %request.key,
                    video_key = %outcome.video_key,
                    angles_key = %outcome.angles_key,
                    "Job succeeded"
                );
            }
            Err(e) => {
                metrics::counter!("pose.jobs.failed").increment(1);
                error!(
                    worker_id = self.id,
                    folder_id = %request.key,
                    error = %e,
                    "Job failed"
                );
            }
        }

        if let (Some(notifier), Some(url)) = (&self.notifier, &request.notification_url) {
            let notification = JobNotification::from_result(&request.key, &result);
            if let Err(e) = notifier.send(url, &notification).await {
                warn!(folder_id = %request.key, url = %url, error = %e, "Notification failed");
            }
        }
    }
}
