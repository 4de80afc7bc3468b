//! Process-wide tracing setup and coarse orchestration counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global tracing subscriber once. Safe to call from every
/// entry point and from tests; later calls are no-ops.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init();
    });
}

/// Coarse counters for a whole orchestrator run.
#[derive(Debug, Default)]
pub struct Telemetry {
    submitted_jobs: AtomicU64,
    failed_submissions: AtomicU64,
    resolved_entries: AtomicU64,
    external_failures: AtomicU64,
    client_errors: AtomicU64,
}

impl Telemetry {
    pub fn record_submitted_job(&self) {
        self.submitted_jobs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_submission(&self) {
        self.failed_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolved_entries(&self, count: u64) {
        self.resolved_entries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_external_failure(&self) {
        self.external_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_client_error(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted_jobs(&self) -> u64 {
        self.submitted_jobs.load(Ordering::Relaxed)
    }

    pub fn failed_submissions(&self) -> u64 {
        self.failed_submissions.load(Ordering::Relaxed)
    }

    pub fn resolved_entries(&self) -> u64 {
        self.resolved_entries.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            submitted_jobs: self.submitted_jobs.load(Ordering::Relaxed),
            failed_submissions: self.failed_submissions.load(Ordering::Relaxed),
            resolved_entries: self.resolved_entries.load(Ordering::Relaxed),
            external_failures: self.external_failures.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub submitted_jobs: u64,
    pub failed_submissions: u64,
    pub resolved_entries: u64,
    pub external_failures: u64,
    pub client_errors: u64,
}
