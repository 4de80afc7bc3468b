pub mod client;
pub mod ledger;
pub mod review;
pub mod runtime;
pub mod submit;

pub use client::clustal::ClustalOmegaClient;
pub use client::metrics::{ClientMetricsSnapshot, OpMetricsSnapshot};
pub use client::{ClientError, JobClient, JobStatus, SequenceKind, SequencePayload};
pub use ledger::entry::PendingEntry;
pub use ledger::store::{FileLedger, PENDING_FILE_NAME};
pub use review::reconcile::{GroupReport, ReconciliationLoop};
pub use review::sink::{DirResultSink, ResultSink};
pub use runtime::config::{
    OrchestratorConfig, OrchestratorConfigBuilder, OrchestratorConfigParams,
};
pub use runtime::orchestrator::{Orchestrator, OrchestratorParams, ReviewReport};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use submit::pool::WorkerPool;
pub use submit::request::{BatchOutcome, BatchSummary, JobOutcome, JobRequest, SubmissionFailure};
