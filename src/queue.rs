use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::status::{JobState, SharedStatus, Update};
use crate::{loge, logi};

/// Something the worker can execute. Implementations report their own
/// outcome through the shared status.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSource {
    Manual,
    Scheduled,
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSource::Manual => write!(f, "manual"),
            JobSource::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// FIFO of pending jobs drained by a single worker task, so at most one job
/// runs at a time.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<JobSource>,
    depth: Arc<AtomicUsize>,
    status: SharedStatus,
}

impl JobQueue {
    /// Spawns the worker and returns the producer handle.
    pub fn start(runner: Arc<dyn JobRunner>, status: SharedStatus) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<JobSource>();
        let depth = Arc::new(AtomicUsize::new(0));

        let worker_depth = depth.clone();
        let worker_status = status.clone();
        let handle = tokio::spawn(async move {
            logi("[QUEUE] Worker started");
            while let Some(source) = rx.recv().await {
                let remaining = worker_depth.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
                worker_status.set_queue_size(remaining);
                logi(format!("[QUEUE] Running {} job ({} waiting)", source, remaining));

                let job = runner.clone();
                if let Err(err) = tokio::spawn(async move { job.run().await }).await {
                    loge(format!("[QUEUE] Job aborted: {}", err));
                    worker_status.update(
                        Update::working("❌ Worker error")
                            .state(JobState::Error)
                            .progress(0),
                    );
                    worker_status.update(Update::working("🤖 Bot waiting...").state(JobState::Idle));
                }

                worker_status.set_queue_size(worker_depth.load(Ordering::SeqCst));
            }
            logi("[QUEUE] Worker stopped");
        });

        (Self { tx, depth, status }, handle)
    }

    /// Appends one job. Returns the number of jobs now waiting.
    pub fn enqueue(&self, source: JobSource) -> Result<usize> {
        let waiting = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(source).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("job worker is not running");
        }
        self.status.set_queue_size(waiting);
        logi(format!("[QUEUE] Enqueued {} job ({} waiting)", source, waiting));
        Ok(waiting)
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
