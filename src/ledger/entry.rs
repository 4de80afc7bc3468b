//! A single pending-job record: which output file is waiting on which remote
//! job id. Entries are serialized one per line as `outputTarget,jobId`.

use anyhow::{bail, Context, Result};

/// One row of the pending-job ledger.
///
/// Ordered by output target first, so persisted files list entries in a
/// stable, diff-friendly order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingEntry {
    output_target: String,
    job_id: String,
}

impl PendingEntry {
    pub fn new(output_target: impl Into<String>, job_id: impl Into<String>) -> Result<Self> {
        let output_target = output_target.into();
        let job_id = job_id.into();
        validate_field("output target", &output_target)?;
        validate_field("job id", &job_id)?;
        Ok(Self {
            output_target,
            job_id,
        })
    }

    /// Parses one ledger line of the form `outputTarget,jobId`.
    pub fn parse(line: &str) -> Result<Self> {
        let (output_target, job_id) = line
            .split_once(',')
            .with_context(|| format!("ledger line has no separator: {line:?}"))?;
        Self::new(output_target.trim(), job_id.trim())
    }

    pub fn to_line(&self) -> String {
        format!("{},{}", self.output_target, self.job_id)
    }

    pub fn output_target(&self) -> &str {
        &self.output_target
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

fn validate_field(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{name} must not be empty");
    }
    if value.contains(',') {
        bail!("{name} must not contain a comma: {value:?}");
    }
    Ok(())
}
