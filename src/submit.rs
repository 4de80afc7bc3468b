pub mod pool;
pub mod request;

pub use pool::WorkerPool;
pub use request::{BatchOutcome, BatchSummary, JobOutcome, JobRequest, SubmissionFailure};
