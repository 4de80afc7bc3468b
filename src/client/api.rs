//! Client-facing abstractions for remote job-submission services. Houses the
//! `JobClient` trait consumed by the worker pool and the reconciliation loop,
//! the payload/status types, and the `ClientError` kinds callers branch on.

use anyhow::Result;
use futures::future::BoxFuture;

/// Sequence alphabet of a submission payload. Selects the submission variant
/// on the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Protein,
    NucleicAcid,
}

impl SequenceKind {
    /// Value of the dispatcher's `stype` form parameter.
    pub fn stype(&self) -> &'static str {
        match self {
            SequenceKind::Protein => "protein",
            SequenceKind::NucleicAcid => "dna",
        }
    }
}

/// Opaque sequence blob plus the discriminator the client needs to pick a
/// submission variant. The orchestration core never inspects `text`.
#[derive(Debug, Clone)]
pub struct SequencePayload {
    pub kind: SequenceKind,
    pub text: String,
}

impl SequencePayload {
    pub fn new(kind: SequenceKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Lifecycle state reported by the external service for a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
    Errored,
}

impl JobStatus {
    /// Maps the dispatcher's plain-text status to a [`JobStatus`].
    ///
    /// Unknown status strings are reported as `Pending` so reconciliation
    /// never drops a ledger entry it cannot classify.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "FINISHED" => JobStatus::Finished,
            "RUNNING" => JobStatus::Running,
            "PENDING" | "QUEUED" => JobStatus::Pending,
            "ERROR" | "FAILURE" | "NOT_FOUND" => JobStatus::Errored,
            other => {
                tracing::warn!(status = other, "unknown job status; treating as still pending");
                JobStatus::Pending
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Errored)
    }
}

#[derive(Debug)]
pub enum ClientError {
    /// The service answered with a non-success HTTP status.
    Rejected { op: &'static str, status: u16 },
    /// The request exceeded the configured per-request timeout.
    Timeout { op: &'static str },
    /// A result was requested for a job the service has not finished.
    NotReady { job_id: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Rejected { op, status } => {
                write!(f, "dispatcher {op} request rejected with HTTP {status}")
            }
            ClientError::Timeout { op } => write!(f, "dispatcher {op} request timed out"),
            ClientError::NotReady { job_id } => {
                write!(f, "result for job {job_id} is not ready yet")
            }
        }
    }
}

impl std::error::Error for ClientError {}

/// Capability injected into the worker pool and the reconciliation loop.
///
/// `poll_status` must be safely callable repeatedly, and `fetch_result` must
/// be repeatable for a finished job: reconciliation re-fetches after an
/// interrupted pass.
pub trait JobClient: Send + Sync {
    /// Submits one payload and returns the job id assigned by the service.
    /// Submission failures of any kind are retryable from the caller's view.
    fn submit<'a>(&'a self, payload: &'a SequencePayload) -> BoxFuture<'a, Result<String>>;

    /// Polls the current lifecycle state of a submitted job. Side-effect free.
    fn poll_status<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<JobStatus>>;

    /// Fetches the result blob of a job. Only meaningful once `poll_status`
    /// reported [`JobStatus::Finished`].
    fn fetch_result<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<String>>;
}
