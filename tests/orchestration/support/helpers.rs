use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use seqjob::{
    ClustalOmegaClient, DirResultSink, FileLedger, JobClient, JobRequest, Orchestrator,
    OrchestratorConfig, OrchestratorParams, SequenceKind, SequencePayload,
};
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub fn test_config(service_url: &str, parallelism: usize) -> OrchestratorConfig {
    OrchestratorConfig::builder()
        .service_url(service_url)
        .contact_email("ops@example.org")
        .parallelism(parallelism)
        .request_timeout(Duration::from_secs(5))
        .build()
        .expect("test config must validate")
}

/// Orchestrator wired to a real HTTP client against the given dispatcher URL,
/// with ledger and results rooted under `root`.
pub fn http_orchestrator(
    service_url: &str,
    parallelism: usize,
    root: &std::path::Path,
) -> Orchestrator {
    let config = test_config(service_url, parallelism);
    let client =
        ClustalOmegaClient::from_config(&config).expect("client must build from test config");
    Orchestrator::new(OrchestratorParams {
        config,
        client: Arc::new(client) as Arc<dyn JobClient>,
        ledger: Arc::new(FileLedger::new(root.join("ledger"))),
        sink: Arc::new(DirResultSink::new(root.join("results"))),
    })
}

pub fn protein_request(group: &str, target: &str) -> JobRequest {
    JobRequest::new(
        group,
        target,
        SequencePayload::new(SequenceKind::Protein, ">s1\nMKVLAT\n>s2\nMKVIAT\n"),
    )
}
