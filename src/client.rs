pub mod api;
pub mod clustal;
pub mod metrics;

pub use api::{ClientError, JobClient, JobStatus, SequenceKind, SequencePayload};
