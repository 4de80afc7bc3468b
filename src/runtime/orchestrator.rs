//! Top-level facade tying the worker pool, the ledger, and the
//! reconciliation loop together behind two entry points: submit a batch,
//! review what is still pending.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::api::JobClient;
use crate::client::clustal::ClustalOmegaClient;
use crate::ledger::store::FileLedger;
use crate::review::reconcile::{GroupReport, ReconciliationLoop};
use crate::review::sink::{DirResultSink, ResultSink};
use crate::runtime::config::OrchestratorConfig;
use crate::runtime::telemetry::Telemetry;
use crate::submit::pool::WorkerPool;
use crate::submit::request::{BatchSummary, JobRequest};

/// Dependency bundle for [`Orchestrator::new`]. Lets tests wire in scripted
/// clients and sinks without touching the network or a real output tree.
pub struct OrchestratorParams {
    pub config: OrchestratorConfig,
    pub client: Arc<dyn JobClient>,
    pub ledger: Arc<FileLedger>,
    pub sink: Arc<dyn ResultSink>,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    client: Arc<dyn JobClient>,
    ledger: Arc<FileLedger>,
    sink: Arc<dyn ResultSink>,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
}

/// Result of reviewing a set of groups.
#[derive(Debug)]
pub struct ReviewReport {
    pub groups: Vec<GroupReport>,
}

impl ReviewReport {
    pub fn all_complete(&self) -> bool {
        self.groups.iter().all(GroupReport::is_complete)
    }

    pub fn remaining(&self) -> usize {
        self.groups.iter().map(|g| g.remaining).sum()
    }

    pub fn resolved(&self) -> usize {
        self.groups.iter().map(|g| g.resolved).sum()
    }
}

impl Orchestrator {
    pub fn new(params: OrchestratorParams) -> Self {
        Self {
            config: params.config,
            client: params.client,
            ledger: params.ledger,
            sink: params.sink,
            telemetry: Arc::new(Telemetry::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Builds a production orchestrator: HTTP client from the config, ledger
    /// and result files rooted at `output_root`.
    pub fn with_output_root(
        config: OrchestratorConfig,
        output_root: impl Into<std::path::PathBuf>,
    ) -> Result<Self> {
        let output_root = output_root.into();
        let client = ClustalOmegaClient::from_config(&config)
            .context("failed to build the job dispatcher client")?;
        Ok(Self::new(OrchestratorParams {
            config,
            client: Arc::new(client),
            ledger: Arc::new(FileLedger::new(&output_root)),
            sink: Arc::new(DirResultSink::new(output_root)),
        }))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Token observed by in-flight worker pools. Cancelling it stops workers
    /// from picking up queued submissions.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Submits a batch for one group and merges the accepted jobs into the
    /// group's pending ledger.
    pub async fn submit_batch(
        &self,
        group: &str,
        requests: Vec<JobRequest>,
    ) -> Result<BatchSummary> {
        // A request carrying a different group would land in the wrong ledger.
        if let Some(stray) = requests.iter().find(|request| request.group != group) {
            bail!(
                "request for {:?} belongs to group {:?}, not {group:?}",
                stray.output_target,
                stray.group
            );
        }

        let pool = WorkerPool::new(
            self.config.parallelism(),
            self.config.submit_retry_limit(),
            Arc::clone(&self.telemetry),
        );
        let outcome = pool
            .run(
                Arc::clone(&self.client),
                requests,
                self.shutdown.clone(),
            )
            .await;

        // Merge with whatever an earlier batch left pending; never clobber.
        // A batch with no accepted jobs must not create an empty ledger file.
        if !outcome.entries.is_empty() {
            let _guard = self.ledger.lock_group(group).await;
            let mut entries = self.ledger.load(group)?;
            entries.extend(outcome.entries.iter().cloned());
            self.ledger.save(group, &entries)?;
        }

        let summary = outcome.summary();
        info!(group, %summary, "batch submitted and noted for review");
        Ok(summary)
    }

    /// Partitions requests by group and submits one batch per group.
    pub async fn submit_grouped(
        &self,
        requests: Vec<JobRequest>,
    ) -> Result<Vec<(String, BatchSummary)>> {
        let mut by_group: BTreeMap<String, Vec<JobRequest>> = BTreeMap::new();
        for request in requests {
            by_group.entry(request.group.clone()).or_default().push(request);
        }

        let mut summaries = Vec::with_capacity(by_group.len());
        for (group, batch) in by_group {
            let summary = self.submit_batch(&group, batch).await?;
            summaries.push((group, summary));
        }
        Ok(summaries)
    }

    /// Runs one reconciliation pass over each named group.
    pub async fn review_pending<S: AsRef<str>>(&self, groups: &[S]) -> Result<ReviewReport> {
        let reviewer = ReconciliationLoop::new(
            Arc::clone(&self.client),
            Arc::clone(&self.ledger),
            Arc::clone(&self.sink),
            Arc::clone(&self.telemetry),
        );

        let mut reports = Vec::with_capacity(groups.len());
        for group in groups {
            reports.push(reviewer.reconcile_group(group.as_ref()).await?);
        }
        Ok(ReviewReport { groups: reports })
    }

    /// Cancels in-flight work and releases the job client.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        drop(self.client);
        info!("orchestrator shut down; job client released");
    }
}
