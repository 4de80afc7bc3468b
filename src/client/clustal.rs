//! REST adapter for the EBI Clustal Omega dispatcher. Implements [`JobClient`]
//! over the dispatcher's three plain-text endpoints: `POST {base}/run`,
//! `GET {base}/status/{id}`, and `GET {base}/result/{id}/{format}`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;

use crate::client::api::{ClientError, JobClient, JobStatus, SequencePayload};
use crate::client::metrics::{ClientMetrics, ClientMetricsSnapshot, DispatcherOp};
use crate::runtime::config::OrchestratorConfig;

/// Result format requested when downloading a finished alignment.
const RESULT_FORMAT: &str = "aln-clustal_num";
/// Output format requested at submission time.
const OUTPUT_FORMAT: &str = "clustal_num";

/// HTTP client for the Clustal Omega job dispatcher.
///
/// Cheap to clone; the underlying connection pool is shared between clones,
/// so every worker in the pool reuses the same keep-alive connections.
#[derive(Debug, Clone)]
pub struct ClustalOmegaClient {
    http: reqwest::Client,
    base_url: Arc<String>,
    contact_email: Arc<String>,
    job_title: Arc<String>,
    metrics: Arc<ClientMetrics>,
}

impl ClustalOmegaClient {
    pub fn new(
        base_url: &str,
        contact_email: &str,
        job_title: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client for the job dispatcher")?;

        Ok(Self {
            http,
            base_url: Arc::new(base_url.trim_end_matches('/').to_string()),
            contact_email: Arc::new(contact_email.to_string()),
            job_title: Arc::new(job_title.to_string()),
            metrics: Arc::new(ClientMetrics::default()),
        })
    }

    pub fn from_config(config: &OrchestratorConfig) -> Result<Self> {
        Self::new(
            config.service_url(),
            config.contact_email(),
            config.job_title(),
            config.request_timeout(),
        )
    }

    /// Base URL this client submits against, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> ClientMetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn perform_submit(&self, payload: &SequencePayload) -> Result<String> {
        let url = format!("{}/run", self.base_url);
        let form = [
            ("email", self.contact_email.as_str()),
            ("title", self.job_title.as_str()),
            ("outfmt", OUTPUT_FORMAT),
            ("stype", payload.kind.stype()),
            ("sequence", payload.text.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|err| classify_transport_error(err, DispatcherOp::Submit))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Rejected {
                op: DispatcherOp::Submit.name(),
                status: status.as_u16(),
            }
            .into());
        }

        let job_id = response
            .text()
            .await
            .context("failed to read job id from submit response")?;
        let job_id = job_id.trim();
        if job_id.is_empty() {
            bail!("dispatcher accepted the submission but returned an empty job id");
        }
        Ok(job_id.to_string())
    }

    async fn perform_poll(&self, job_id: &str) -> Result<JobStatus> {
        let url = format!("{}/status/{}", self.base_url, job_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| classify_transport_error(err, DispatcherOp::Status))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Rejected {
                op: DispatcherOp::Status.name(),
                status: status.as_u16(),
            }
            .into());
        }

        let raw = response
            .text()
            .await
            .context("failed to read status response body")?;
        Ok(JobStatus::parse(&raw))
    }

    async fn perform_fetch(&self, job_id: &str) -> Result<String> {
        let url = format!("{}/result/{}/{}", self.base_url, job_id, RESULT_FORMAT);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| classify_transport_error(err, DispatcherOp::Result))?;

        let status = response.status();
        // The dispatcher answers 400 for jobs still running and 404 for ids it
        // has already expired; both mean "nothing to download right now".
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::NOT_FOUND
        {
            return Err(ClientError::NotReady {
                job_id: job_id.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(ClientError::Rejected {
                op: DispatcherOp::Result.name(),
                status: status.as_u16(),
            }
            .into());
        }

        response
            .text()
            .await
            .context("failed to read result blob from response")
    }

    async fn timed<T, F>(&self, op: DispatcherOp, operation: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = operation.await;
        let elapsed = started.elapsed();
        match &result {
            Ok(_) => self.metrics.record_success(op, elapsed),
            Err(err) => {
                if matches!(
                    err.downcast_ref::<ClientError>(),
                    Some(ClientError::Timeout { .. })
                ) {
                    self.metrics.record_timeout(op, elapsed);
                } else {
                    self.metrics.record_failure(op, elapsed);
                }
            }
        }
        result
    }
}

fn classify_transport_error(err: reqwest::Error, op: DispatcherOp) -> anyhow::Error {
    if err.is_timeout() {
        ClientError::Timeout { op: op.name() }.into()
    } else {
        anyhow::Error::new(err).context(format!("dispatcher {} request failed", op.name()))
    }
}

impl JobClient for ClustalOmegaClient {
    fn submit<'a>(&'a self, payload: &'a SequencePayload) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.timed(DispatcherOp::Submit, self.perform_submit(payload)))
    }

    fn poll_status<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<JobStatus>> {
        Box::pin(self.timed(DispatcherOp::Status, self.perform_poll(job_id)))
    }

    fn fetch_result<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.timed(DispatcherOp::Result, self.perform_fetch(job_id)))
    }
}
