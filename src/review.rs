pub mod reconcile;
pub mod sink;

pub use reconcile::{GroupReport, ReconciliationLoop};
pub use sink::{DirResultSink, ResultSink};
