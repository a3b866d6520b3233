//! Bounded job queue and the fixed pool of workers draining it
//!
//! Producers call [`JobQueue::enqueue`], which waits while the queue is at
//! capacity. That wait is the only backpressure in the system: there is no
//! rejection path for a full queue. Workers share one receiver and each
//! takes whichever job is next, so completion order follows no particular
//! order once more than one worker is running.

use crate::crawler::worker::JobProcessor;
use crate::SentinelError;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A persisted job waiting for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: i64,
    pub url: String,
    pub batch_key: String,
}

/// Producer side of the job queue
///
/// Cloning is cheap; every clone feeds the same queue and sees the same
/// closed state.
#[derive(Clone)]
pub struct JobQueue {
    sender: Arc<Mutex<Option<mpsc::Sender<QueuedJob>>>>,
}

impl JobQueue {
    fn new(sender: mpsc::Sender<QueuedJob>) -> Self {
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Adds a job, waiting for a free slot while the queue is full
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The job is queued
    /// * `Err(SentinelError::QueueClosed)` - The pool is shutting down
    pub async fn enqueue(&self, job: QueuedJob) -> Result<(), SentinelError> {
        let sender = self.current_sender().ok_or(SentinelError::QueueClosed)?;
        sender.send(job).await.map_err(|_| SentinelError::QueueClosed)
    }

    /// Returns false once shutdown has begun
    pub fn is_open(&self) -> bool {
        self.current_sender().is_some()
    }

    /// Stops accepting new jobs; queued jobs are still processed
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }

    fn current_sender(&self) -> Option<mpsc::Sender<QueuedJob>> {
        self.sender.lock().ok().and_then(|sender| sender.clone())
    }
}

/// Fixed-size pool of long-lived workers
pub struct WorkerPool {
    queue: JobQueue,
    workers: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    /// Spawns `workers` tasks sharing a queue of `capacity` slots
    ///
    /// Must be called from within a tokio runtime. Zero values are raised
    /// to one.
    pub fn start(workers: usize, capacity: usize, processor: Arc<JobProcessor>) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let processor = Arc::clone(&processor);
                tokio::spawn(run_worker(worker_id, receiver, processor))
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "Started {} workers (queue capacity {})",
            handles.len(),
            capacity.max(1)
        );

        Self {
            queue: JobQueue::new(sender),
            workers: handles,
        }
    }

    /// Handle for producers
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue, lets the workers drain it, and waits for them
    ///
    /// Returns the number of jobs taken off the queue.
    pub async fn shutdown(self) -> usize {
        self.queue.close();

        let mut processed = 0;
        for handle in self.workers {
            match handle.await {
                Ok(count) => processed += count,
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }

        tracing::info!("Worker pool stopped after {} jobs", processed);
        processed
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    processor: Arc<JobProcessor>,
) -> usize {
    let mut processed = 0;

    loop {
        // Only the receive is under the lock; processing runs unlocked
        let next = { receiver.lock().await.recv().await };
        let Some(job) = next else {
            break;
        };

        tracing::trace!("Worker {} picked job {}", worker_id, job.id);
        processor.process(&job).await;
        processed += 1;
    }

    tracing::debug!("Worker {} exiting after {} jobs", worker_id, processed);
    processed
}
