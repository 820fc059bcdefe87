use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{PaymentError, PaymentReconciler};

/// One queued request to cancel a payment at the gateway.
#[derive(Debug)]
pub struct CancellationJob {
    pub payment_uid: Uuid,
    pub reason: String,
    receipt: Option<oneshot::Sender<CancellationOutcome>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
}

/// What happened to a cancellation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancellationOutcome {
    pub payment_uid: String,
    pub status: JobStatus,
    pub message: String,
    pub attempts: u32,
}

/// Sending half of the cancellation queue.
#[derive(Clone)]
pub struct CancellationQueue {
    sender: mpsc::Sender<CancellationJob>,
}

impl CancellationQueue {
    pub(crate) fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<CancellationJob>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { sender }, receiver)
    }

    async fn push(&self, job: CancellationJob) -> Result<(), PaymentError> {
        self.sender
            .send(job)
            .await
            .map_err(|_| PaymentError::ActorCommunicationError("Cancellation queue closed".to_string()))
    }

    /// Queues a cancellation and returns without waiting for it.
    #[instrument(skip(self))]
    pub async fn enqueue(&self, payment_uid: Uuid, reason: String) -> Result<(), PaymentError> {
        debug!("Queueing cancellation");
        self.push(CancellationJob {
            payment_uid,
            reason,
            receipt: None,
        })
        .await
    }

    /// Queues a cancellation; the outcome arrives on the returned receiver.
    #[instrument(skip(self))]
    pub async fn enqueue_with_receipt(
        &self,
        payment_uid: Uuid,
        reason: String,
    ) -> Result<oneshot::Receiver<CancellationOutcome>, PaymentError> {
        let (receipt, outcome) = oneshot::channel();
        self.push(CancellationJob {
            payment_uid,
            reason,
            receipt: Some(receipt),
        })
        .await?;
        Ok(outcome)
    }
}

/// Drains the cancellation queue, running each job as its own task.
pub struct CancellationWorker {
    receiver: mpsc::Receiver<CancellationJob>,
    reconciler: PaymentReconciler,
    max_attempts: u32,
    backoff: Duration,
}

impl CancellationWorker {
    pub fn new(
        receiver: mpsc::Receiver<CancellationJob>,
        reconciler: PaymentReconciler,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            receiver,
            reconciler,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    #[instrument(name = "cancellation_worker", skip(self))]
    pub async fn run(mut self) {
        info!("Worker starting");
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                job = self.receiver.recv() => match job {
                    Some(job) => {
                        let reconciler = self.reconciler.clone();
                        tasks.spawn(process_job(reconciler, job, self.max_attempts, self.backoff));
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Cancellation task panicked");
                    }
                }
            }
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Cancellation task panicked");
            }
        }
        info!("Worker stopped");
    }
}

#[instrument(skip(reconciler, job, backoff), fields(payment_uid = %job.payment_uid))]
async fn process_job(reconciler: PaymentReconciler, job: CancellationJob, max_attempts: u32, backoff: Duration) {
    let CancellationJob {
        payment_uid,
        reason,
        receipt,
    } = job;

    let mut attempts = 0;
    let outcome = loop {
        attempts += 1;
        match reconciler.cancel_payment(payment_uid, &reason).await {
            Ok(()) => {
                break CancellationOutcome {
                    payment_uid: payment_uid.to_string(),
                    status: JobStatus::Success,
                    message: "Payment cancelled".to_string(),
                    attempts,
                }
            }
            Err(PaymentError::Gateway(e)) if e.is_retryable() && attempts < max_attempts => {
                warn!(attempt = attempts, error = %e, "Retrying cancellation");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                break CancellationOutcome {
                    payment_uid: payment_uid.to_string(),
                    status: JobStatus::Failed,
                    message: e.to_string(),
                    attempts,
                }
            }
        }
    };

    let report = serde_json::to_string(&outcome).unwrap_or_default();
    match outcome.status {
        JobStatus::Success => info!(outcome = %report, "Cancellation finished"),
        JobStatus::Failed => warn!(outcome = %report, "Cancellation failed"),
    }
    if let Some(receipt) = receipt {
        let _ = receipt.send(outcome);
    }
}
