//! Bounded background pool for resume scoring.
//!
//! Submissions push a job onto an `mpsc` queue and return; N worker tasks share the
//! receiver and run the scoring pipeline one job at a time each.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::errors::AppError;
use crate::fusion::FusionEngine;
use crate::ids::RecordId;
use crate::lifecycle::run_resume_scoring;
use crate::store::RecordStore;

#[derive(Debug)]
struct ScoringJob {
    application_id: RecordId,
}

/// Handle for enqueueing scoring jobs. Cheap to clone.
#[derive(Clone)]
pub struct ScoringQueue {
    sender: mpsc::Sender<ScoringJob>,
}

impl ScoringQueue {
    /// Waits for queue capacity when the pool is saturated; never waits for scoring.
    pub async fn enqueue(&self, application_id: RecordId) -> Result<(), AppError> {
        self.sender
            .send(ScoringJob { application_id })
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "scoring queue closed; job for {} dropped",
                    e.0.application_id
                ))
            })
    }

    /// A queue whose workers are gone.
    #[cfg(test)]
    pub fn closed() -> Self {
        let (sender, _) = mpsc::channel(1);
        Self { sender }
    }
}

/// Spawns `workers` scoring tasks on the current runtime.
pub fn spawn_scoring_workers(
    store: Arc<dyn RecordStore>,
    fusion: FusionEngine,
    workers: usize,
    capacity: usize,
) -> ScoringQueue {
    let workers = workers.max(1);
    let (sender, receiver) = mpsc::channel::<ScoringJob>(capacity.max(1));
    let receiver = Arc::new(Mutex::new(receiver));

    info!(workers, capacity, "Starting resume scoring workers");

    for worker_id in 0..workers {
        let receiver = Arc::clone(&receiver);
        let store = Arc::clone(&store);
        let fusion = fusion.clone();
        tokio::spawn(async move {
            scoring_worker(worker_id, receiver, store, fusion).await;
        });
    }

    ScoringQueue { sender }
}

async fn scoring_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<ScoringJob>>>,
    store: Arc<dyn RecordStore>,
    fusion: FusionEngine,
) {
    loop {
        let job = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };

        let Some(job) = job else {
            info!(worker_id, "Scoring worker shutting down");
            break;
        };

        match run_resume_scoring(store.as_ref(), &fusion, &job.application_id).await {
            Ok(status) => info!(
                worker_id,
                application_id = %job.application_id,
                %status,
                "Resume scoring finished"
            ),
            Err(e) => error!(
                worker_id,
                application_id = %job.application_id,
                code = e.code(),
                error = %e,
                "Resume scoring job could not record an outcome"
            ),
        }
    }
}
