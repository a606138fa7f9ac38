// THEORY:
// The diff engine itself is synchronous. Hosts with a UI or a server loop, however,
// should not block their main task on a comparison. The `ComparisonWorkerPool` is
// that host-side bridge: a fixed set of tokio workers, each fed by its own channel,
// with a dispatcher handing out jobs round-robin. Each job carries a oneshot sender
// for its answer, and the CPU-heavy part runs on the blocking thread pool.
//
// Ownership is simple: the input frames move into the job, the result moves back out
// through the oneshot. Nothing is shared mutably across the boundary.

use crate::config::ComparisonConfig;
use crate::core_modules::frame::RgbFrame;
use crate::error::{DiffError, Result};
use crate::pipeline::{CancelFlag, ComparisonResult, compare_with_cancel};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};

/// One comparison request.
#[derive(Debug, Clone)]
pub struct ComparisonJob {
    pub baseline: RgbFrame,
    pub candidate: RgbFrame,
    pub config: ComparisonConfig,
}

struct ComparisonTask {
    job: ComparisonJob,
    cancel: CancelFlag,
    result_sender: oneshot::Sender<Result<ComparisonResult>>,
}

pub struct ComparisonWorkerPool {
    task_sender: mpsc::UnboundedSender<ComparisonTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
    size: usize,
}

impl ComparisonWorkerPool {
    /// A pool with one worker per logical CPU. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_workers(num_cpus::get())
    }

    pub fn with_workers(size: usize) -> Self {
        let size = size.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ComparisonTask>();
        let mut workers = Vec::with_capacity(size + 1);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..size)
            .map(|_| mpsc::unbounded_channel::<ComparisonTask>())
            .unzip();

        // Dispatcher
        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    let _ = task
                        .result_sender
                        .send(Err(DiffError::Worker("worker stopped".to_string())));
                }
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        }));

        for (id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let ComparisonTask {
                        job,
                        cancel,
                        result_sender,
                    } = task;
                    log::debug!("worker {id}: comparison started");
                    let outcome = tokio::task::spawn_blocking(move || {
                        compare_with_cancel(job.baseline, job.candidate, job.config, &cancel)
                    })
                    .await
                    .unwrap_or_else(|e| Err(DiffError::Worker(format!("comparison task failed: {e}"))));
                    let _ = result_sender.send(outcome);
                }
            }));
        }

        log::debug!("comparison pool started with {size} worker(s)");
        Self {
            task_sender,
            workers,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn compare(&self, job: ComparisonJob) -> Result<ComparisonResult> {
        self.compare_with_cancel(job, CancelFlag::new()).await
    }

    pub async fn compare_with_cancel(
        &self,
        job: ComparisonJob,
        cancel: CancelFlag,
    ) -> Result<ComparisonResult> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(ComparisonTask {
                job,
                cancel,
                result_sender,
            })
            .map_err(|_| DiffError::Worker("failed to send job to worker pool".to_string()))?;

        result_receiver
            .await
            .map_err(|_| DiffError::Worker("failed to receive result from worker".to_string()))?
    }

    /// Runs every job concurrently. Results come back in job order.
    pub async fn compare_many(&self, jobs: Vec<ComparisonJob>) -> Vec<Result<ComparisonResult>> {
        join_all(jobs.into_iter().map(|job| self.compare(job))).await
    }

    /// Stops every worker. Jobs submitted afterwards fail with `DiffError::Worker`.
    pub fn shutdown(&mut self) {
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}

impl Default for ComparisonWorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ComparisonWorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
