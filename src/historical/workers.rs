use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A fixed number of workers draining a bounded job queue.
///
/// The producer waits whenever the queue is full. Each worker runs one job
/// to completion before taking the next. Once `cancel` fires no further jobs
/// are taken, but jobs already running finish.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    queue_capacity: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(workers: usize, queue_capacity: usize, cancel: CancellationToken) -> Self {
        Self {
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
            cancel,
        }
    }

    /// Feeds `jobs` to the workers and waits for all of them to stop.
    /// Returns the number of jobs that ran.
    pub async fn run<J, I, F, Fut>(&self, jobs: I, handler: F) -> Result<usize, WorkerError>
    where
        J: Send + 'static,
        I: IntoIterator<Item = J>,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<J>(self.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);
        let completed = Arc::new(AtomicUsize::new(0));

        let mut join_set = JoinSet::new();
        for worker in 0..self.workers {
            let rx = rx.clone();
            let handler = handler.clone();
            let completed = completed.clone();
            let cancel = self.cancel.clone();

            join_set.spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            job = rx.recv() => job,
                        }
                    };
                    let Some(job) = job else {
                        break;
                    };
                    (*handler)(job).await;
                    completed.fetch_add(1, Ordering::Relaxed);
                }
                tracing::debug!("Worker {} stopped", worker);
            });
        }
        drop(rx);

        for job in jobs {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("Cancellation requested, no further jobs will be dispatched");
                    break;
                }
                sent = tx.send(job) => {
                    if sent.is_err() {
                        // Every worker is gone
                        break;
                    }
                }
            }
        }
        drop(tx);

        let mut first_error = None;
        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(completed.load(Ordering::Relaxed)),
        }
    }
}
