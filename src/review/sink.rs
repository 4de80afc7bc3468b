//! Destination for downloaded result blobs.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Where finished alignments land.
///
/// Writes must be last-write-wins: reconciliation may download and write the
/// same result again after an interrupted pass, and the rewrite has to be
/// harmless.
pub trait ResultSink: Send + Sync {
    fn write(&self, group: &str, output_target: &str, blob: &str) -> Result<()>;
}

/// Writes results to `<root>/<group>/<output_target>` on the local
/// filesystem.
#[derive(Debug)]
pub struct DirResultSink {
    root: PathBuf,
}

impl DirResultSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResultSink for DirResultSink {
    fn write(&self, group: &str, output_target: &str, blob: &str) -> Result<()> {
        let dir = self.root.join(group);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create result directory {}", dir.display()))?;
        let path = dir.join(output_target);
        fs::write(&path, blob)
            .with_context(|| format!("failed to write result to {}", path.display()))
    }
}
