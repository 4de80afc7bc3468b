//! Submission requests and the per-batch outcome types produced by the
//! worker pool.

use std::collections::BTreeSet;

use crate::client::api::SequencePayload;
use crate::ledger::entry::PendingEntry;

/// One unit of submission work: a payload, the group whose ledger records it,
/// and the output file its result should eventually land in.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub group: String,
    pub output_target: String,
    pub payload: SequencePayload,
}

impl JobRequest {
    pub fn new(
        group: impl Into<String>,
        output_target: impl Into<String>,
        payload: SequencePayload,
    ) -> Self {
        Self {
            group: group.into(),
            output_target: output_target.into(),
            payload,
        }
    }
}

/// Terminal state of one job as seen by the subsystem.
#[derive(Debug)]
pub enum JobOutcome {
    /// Accepted by the service; the entry belongs in the pending ledger.
    Submitted(PendingEntry),
    /// Gave up on this job. The cause is a rendered error chain.
    Failed { output_target: String, cause: String },
    /// Result downloaded during reconciliation.
    Finished { output_target: String, blob: String },
}

/// One submission that exhausted its retries.
#[derive(Debug)]
pub struct SubmissionFailure {
    pub output_target: String,
    pub cause: String,
}

/// Aggregate result of running one batch through the worker pool.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub entries: BTreeSet<PendingEntry>,
    pub failures: Vec<SubmissionFailure>,
    pub submitted: usize,
    pub total: usize,
}

impl BatchOutcome {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            submitted: self.submitted,
            failed: self.failures.len(),
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub submitted: usize,
    pub failed: usize,
    pub total: usize,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} submitted, {} failed",
            self.submitted, self.total, self.failed
        )
    }
}
