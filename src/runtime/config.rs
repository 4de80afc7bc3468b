//! Orchestrator configuration with validation.

use std::time::Duration;

use anyhow::{bail, Result};

pub const DEFAULT_PARALLELISM: usize = 1;
pub const MIN_PARALLELISM: usize = 1;
pub const MAX_PARALLELISM: usize = 10;
pub const DEFAULT_SUBMIT_RETRY_LIMIT: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_JOB_TITLE: &str = "seqjob-run";

/// Validated configuration for the orchestrator and its job client.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    service_url: String,
    contact_email: String,
    parallelism: usize,
    submit_retry_limit: usize,
    request_timeout: Duration,
    job_title: String,
}

/// All-field parameter struct for [`OrchestratorConfig::new`]. Prefer the
/// builder unless every field is already at hand.
#[derive(Debug, Clone)]
pub struct OrchestratorConfigParams {
    pub service_url: String,
    pub contact_email: String,
    pub parallelism: usize,
    pub submit_retry_limit: usize,
    pub request_timeout: Duration,
    pub job_title: String,
}

impl OrchestratorConfig {
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    pub fn new(params: OrchestratorConfigParams) -> Result<Self> {
        let config = Self {
            service_url: params.service_url.trim().to_string(),
            contact_email: params.contact_email.trim().to_string(),
            parallelism: params.parallelism,
            submit_retry_limit: params.submit_retry_limit,
            request_timeout: params.request_timeout,
            job_title: params.job_title.trim().to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.service_url.starts_with("http://") && !self.service_url.starts_with("https://") {
            bail!("service URL must start with http:// or https://");
        }
        if self.contact_email.is_empty() || !self.contact_email.contains('@') {
            bail!("contact email must be a plausible address");
        }
        if self.parallelism < MIN_PARALLELISM || self.parallelism > MAX_PARALLELISM {
            bail!(
                "parallelism must be in range [{MIN_PARALLELISM}, {MAX_PARALLELISM}], got {}",
                self.parallelism
            );
        }
        if self.submit_retry_limit == 0 {
            bail!("submit retry limit must be at least 1");
        }
        if self.request_timeout.is_zero() {
            bail!("request timeout must be non-zero");
        }
        if self.job_title.is_empty() {
            bail!("job title must not be empty");
        }
        Ok(())
    }

    /// Base URL of the job dispatcher.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Email the dispatcher requires with every submission.
    pub fn contact_email(&self) -> &str {
        &self.contact_email
    }

    /// Maximum number of concurrent submissions.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Attempts per submission before it counts as failed.
    pub fn submit_retry_limit(&self) -> usize {
        self.submit_retry_limit
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Title attached to submitted jobs, visible in the service's UI.
    pub fn job_title(&self) -> &str {
        &self.job_title
    }
}

#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    service_url: Option<String>,
    contact_email: Option<String>,
    parallelism: Option<usize>,
    submit_retry_limit: Option<usize>,
    request_timeout: Option<Duration>,
    job_title: Option<String>,
}

impl OrchestratorConfigBuilder {
    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn submit_retry_limit(mut self, limit: usize) -> Self {
        self.submit_retry_limit = Some(limit);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn job_title(mut self, title: impl Into<String>) -> Self {
        self.job_title = Some(title.into());
        self
    }

    pub fn build(self) -> Result<OrchestratorConfig> {
        let Some(service_url) = self.service_url else {
            bail!("service URL is required");
        };
        let Some(contact_email) = self.contact_email else {
            bail!("contact email is required");
        };
        OrchestratorConfig::new(OrchestratorConfigParams {
            service_url,
            contact_email,
            parallelism: self.parallelism.unwrap_or(DEFAULT_PARALLELISM),
            submit_retry_limit: self.submit_retry_limit.unwrap_or(DEFAULT_SUBMIT_RETRY_LIMIT),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            job_title: self.job_title.unwrap_or_else(|| DEFAULT_JOB_TITLE.to_string()),
        })
    }
}
