//! Per-operation dispatcher counters. The three endpoints have very
//! different latency profiles (submissions upload whole sequence sets,
//! status polls are tiny), so successes, failures, timeouts, and latency
//! are tracked separately for submit, status, and result calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// The dispatcher call being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatcherOp {
    Submit,
    Status,
    Result,
}

impl DispatcherOp {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            DispatcherOp::Submit => "submit",
            DispatcherOp::Status => "status",
            DispatcherOp::Result => "result",
        }
    }
}

#[derive(Debug, Default)]
struct OpCounters {
    requests: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    latency_ns: AtomicU64,
}

impl OpCounters {
    fn record(&self, latency: Duration, failed: bool, timed_out: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        if timed_out {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> OpMetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let latency_ns = self.latency_ns.load(Ordering::Relaxed);
        let average_latency_ms = if requests == 0 {
            0.0
        } else {
            (latency_ns as f64 / requests as f64) / 1_000_000.0
        };
        OpMetricsSnapshot {
            requests,
            errors: self.errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            average_latency_ms,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ClientMetrics {
    submit: OpCounters,
    status: OpCounters,
    result: OpCounters,
}

impl ClientMetrics {
    fn op(&self, op: DispatcherOp) -> &OpCounters {
        match op {
            DispatcherOp::Submit => &self.submit,
            DispatcherOp::Status => &self.status,
            DispatcherOp::Result => &self.result,
        }
    }

    pub(crate) fn record_success(&self, op: DispatcherOp, latency: Duration) {
        self.op(op).record(latency, false, false);
    }

    pub(crate) fn record_failure(&self, op: DispatcherOp, latency: Duration) {
        self.op(op).record(latency, true, false);
    }

    pub(crate) fn record_timeout(&self, op: DispatcherOp, latency: Duration) {
        self.op(op).record(latency, true, true);
    }

    pub(crate) fn snapshot(&self) -> ClientMetricsSnapshot {
        ClientMetricsSnapshot {
            submit: self.submit.snapshot(),
            status: self.status.snapshot(),
            result: self.result.snapshot(),
        }
    }
}

/// Counters for one dispatcher endpoint.
#[derive(Debug, Copy, Clone)]
pub struct OpMetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub average_latency_ms: f64,
}

/// Point-in-time view of the client's dispatcher traffic, broken down by
/// endpoint.
#[derive(Debug, Copy, Clone)]
pub struct ClientMetricsSnapshot {
    pub submit: OpMetricsSnapshot,
    pub status: OpMetricsSnapshot,
    pub result: OpMetricsSnapshot,
}

impl ClientMetricsSnapshot {
    pub fn total_requests(&self) -> u64 {
        self.submit.requests + self.status.requests + self.result.requests
    }

    pub fn total_errors(&self) -> u64 {
        self.submit.errors + self.status.errors + self.result.errors
    }
}
