//! Bounded-concurrency submission pool.
//!
//! Spawns `min(parallelism, requests)` workers over a shared queue. Each
//! worker drains requests one at a time, retrying every submission up to the
//! retry limit before declaring it failed. One exhausted request never aborts
//! the batch; failures are collected alongside the accepted entries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::api::JobClient;
use crate::ledger::entry::PendingEntry;
use crate::runtime::telemetry::Telemetry;
use crate::submit::request::{BatchOutcome, JobOutcome, JobRequest, SubmissionFailure};

#[derive(Debug, Clone)]
pub struct WorkerPool {
    parallelism: usize,
    retry_limit: usize,
    telemetry: Arc<Telemetry>,
}

impl WorkerPool {
    pub fn new(parallelism: usize, retry_limit: usize, telemetry: Arc<Telemetry>) -> Self {
        Self {
            parallelism: parallelism.max(1),
            retry_limit: retry_limit.max(1),
            telemetry,
        }
    }

    /// Submits every request in the batch and returns the aggregate outcome.
    ///
    /// Cancellation stops workers from picking up further requests; the
    /// submission already in flight on each worker runs to completion.
    pub async fn run(
        &self,
        client: Arc<dyn JobClient>,
        requests: Vec<JobRequest>,
        shutdown: CancellationToken,
    ) -> BatchOutcome {
        let total = requests.len();
        if total == 0 {
            return BatchOutcome::default();
        }

        let worker_count = self.parallelism.min(total);
        let queue = Arc::new(Mutex::new(VecDeque::from(requests)));
        let (tx, mut rx) = mpsc::unbounded_channel::<JobOutcome>();

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let client = Arc::clone(&client);
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let shutdown = shutdown.clone();
            let retry_limit = self.retry_limit;

            handles.push(tokio::spawn(async move {
                loop {
                    if shutdown.is_cancelled() {
                        info!(worker_id, "shutdown requested; worker stopping");
                        break;
                    }
                    let request = {
                        let mut queue = queue
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        queue.pop_front()
                    };
                    let Some(request) = request else {
                        break;
                    };
                    let outcome =
                        submit_with_retry(client.as_ref(), request, retry_limit, worker_id).await;
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        let mut outcome = BatchOutcome {
            total,
            ..Default::default()
        };
        while let Some(job_outcome) = rx.recv().await {
            match job_outcome {
                JobOutcome::Submitted(entry) => {
                    self.telemetry.record_submitted_job();
                    outcome.entries.insert(entry);
                    outcome.submitted += 1;
                }
                JobOutcome::Failed {
                    output_target,
                    cause,
                } => {
                    self.telemetry.record_failed_submission();
                    outcome.failures.push(SubmissionFailure {
                        output_target,
                        cause,
                    });
                }
                // Submission never produces Finished.
                JobOutcome::Finished { .. } => {}
            }
        }

        for result in join_all(handles).await {
            if let Err(err) = result {
                warn!(error = %err, "submission worker task failed to join");
            }
        }

        info!(summary = %outcome.summary(), "submission batch drained");
        outcome
    }
}

/// Runs one submission with up to `retry_limit` sequential attempts.
async fn submit_with_retry(
    client: &dyn JobClient,
    request: JobRequest,
    retry_limit: usize,
    worker_id: usize,
) -> JobOutcome {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.submit(&request.payload).await {
            Ok(job_id) => match PendingEntry::new(&request.output_target, &job_id) {
                Ok(entry) => {
                    debug!(
                        worker_id,
                        output_target = %request.output_target,
                        job_id = %job_id,
                        attempt,
                        "job submitted"
                    );
                    return JobOutcome::Submitted(entry);
                }
                Err(err) => {
                    // The service accepted the job but handed back an id the
                    // ledger cannot record. Retrying would resubmit, not fix
                    // the id, so give up immediately.
                    error!(
                        worker_id,
                        output_target = %request.output_target,
                        error = %err,
                        "dispatcher returned an unrecordable job id"
                    );
                    return JobOutcome::Failed {
                        output_target: request.output_target,
                        cause: format!("unrecordable job id: {err:#}"),
                    };
                }
            },
            Err(err) if attempt < retry_limit => {
                warn!(
                    worker_id,
                    output_target = %request.output_target,
                    attempt,
                    retry_limit,
                    error = %err,
                    "submission failed; retrying"
                );
            }
            Err(err) => {
                error!(
                    worker_id,
                    output_target = %request.output_target,
                    attempts = attempt,
                    error = %err,
                    "submission exhausted retries"
                );
                return JobOutcome::Failed {
                    output_target: request.output_target,
                    cause: format!("{err:#}"),
                };
            }
        }
    }
}
