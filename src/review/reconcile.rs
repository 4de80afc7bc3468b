//! Reconciliation of pending ledgers against the external service.
//!
//! One pass polls every recorded job, downloads and writes the results that
//! finished, drops the entries the service reported as terminally errored,
//! and persists whatever is still outstanding. A pass that crashes or loses
//! the network midway can simply run again: results are rewritten and the
//! ledger only ever shrinks by entries that were actually resolved.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::client::api::{JobClient, JobStatus};
use crate::ledger::entry::PendingEntry;
use crate::ledger::store::FileLedger;
use crate::review::sink::ResultSink;
use crate::runtime::telemetry::Telemetry;
use crate::submit::request::JobOutcome;

/// What one reconciliation pass did to a single group.
#[derive(Debug)]
pub struct GroupReport {
    pub group: String,
    /// Entries removed because their result was written.
    pub resolved: usize,
    /// Entries still pending after the pass.
    pub remaining: usize,
    /// Entries removed because the service reported a terminal failure.
    pub errored: usize,
}

impl GroupReport {
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

impl std::fmt::Display for GroupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} resolved, {} errored, {} remaining",
            self.group, self.resolved, self.errored, self.remaining
        )
    }
}

pub struct ReconciliationLoop {
    client: Arc<dyn JobClient>,
    ledger: Arc<FileLedger>,
    sink: Arc<dyn ResultSink>,
    telemetry: Arc<Telemetry>,
}

impl ReconciliationLoop {
    pub fn new(
        client: Arc<dyn JobClient>,
        ledger: Arc<FileLedger>,
        sink: Arc<dyn ResultSink>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            client,
            ledger,
            sink,
            telemetry,
        }
    }

    /// Runs one reconciliation pass over a group's pending ledger.
    pub async fn reconcile_group(&self, group: &str) -> Result<GroupReport> {
        let _guard = self.ledger.lock_group(group).await;
        let pending = self.ledger.load(group)?;
        if pending.is_empty() {
            info!(group, "no pending jobs to review");
            return Ok(GroupReport {
                group: group.to_string(),
                resolved: 0,
                remaining: 0,
                errored: 0,
            });
        }

        let mut resolved = BTreeSet::new();
        let mut errored = 0usize;
        for entry in &pending {
            match self.resolve_entry(group, entry).await {
                Some(JobOutcome::Finished {
                    output_target,
                    blob,
                }) => match self.sink.write(group, &output_target, &blob) {
                    Ok(()) => {
                        self.telemetry.record_resolved_entries(1);
                        resolved.insert(entry.clone());
                    }
                    Err(err) => {
                        error!(
                            group,
                            output_target = %output_target,
                            error = %format!("{err:#}"),
                            "failed to write result; entry stays pending"
                        );
                    }
                },
                Some(JobOutcome::Failed { .. }) => {
                    resolved.insert(entry.clone());
                    errored += 1;
                }
                // Reconciliation never re-submits.
                Some(JobOutcome::Submitted(_)) => {}
                None => {}
            }
        }

        let remaining: BTreeSet<PendingEntry> =
            pending.difference(&resolved).cloned().collect();
        if remaining.is_empty() {
            self.ledger.clear(group)?;
            info!(group, resolved = resolved.len(), "all jobs completed for group");
        } else {
            self.ledger.save(group, &remaining)?;
            info!(
                group,
                resolved = resolved.len(),
                remaining = remaining.len(),
                "updated pending job count"
            );
        }

        Ok(GroupReport {
            group: group.to_string(),
            resolved: resolved.len() - errored,
            remaining: remaining.len(),
            errored,
        })
    }

    /// Decides the fate of one ledger entry. `None` means the entry stays
    /// pending for a later pass.
    async fn resolve_entry(&self, group: &str, entry: &PendingEntry) -> Option<JobOutcome> {
        let status = match self.client.poll_status(entry.job_id()).await {
            Ok(status) => status,
            Err(err) => {
                self.telemetry.record_client_error();
                warn!(
                    group,
                    job_id = %entry.job_id(),
                    error = %format!("{err:#}"),
                    "status poll failed; entry stays pending"
                );
                return None;
            }
        };

        match status {
            JobStatus::Finished => match self.client.fetch_result(entry.job_id()).await {
                Ok(blob) => Some(JobOutcome::Finished {
                    output_target: entry.output_target().to_string(),
                    blob,
                }),
                Err(err) => {
                    self.telemetry.record_client_error();
                    error!(
                        group,
                        job_id = %entry.job_id(),
                        error = %format!("{err:#}"),
                        "result download failed; entry stays pending"
                    );
                    None
                }
            },
            JobStatus::Errored => {
                self.telemetry.record_external_failure();
                error!(
                    group,
                    job_id = %entry.job_id(),
                    output_target = %entry.output_target(),
                    "job failed on the service; resubmit manually if the output is still needed"
                );
                Some(JobOutcome::Failed {
                    output_target: entry.output_target().to_string(),
                    cause: "service reported a terminal failure".to_string(),
                })
            }
            JobStatus::Pending | JobStatus::Running => {
                info!(
                    group,
                    job_id = %entry.job_id(),
                    status = ?status,
                    "job still in progress"
                );
                None
            }
        }
    }
}
