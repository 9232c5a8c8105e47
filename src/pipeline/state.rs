//! Per-run mutable state and the scratch-file guard.

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

/// Owning guard for the temporary on-disk copy of the email's attachment.
///
/// The extraction stage releases it explicitly on every exit path; `Drop` is
/// the backstop for runs that unwind early (collaborator errors, run-level
/// timeout), so an abandoned run never leaks its file.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Persist attachment bytes to a uniquely-named file in the OS temp
    /// directory. `suffix` is the content subtype ("pdf", "png", "jpg").
    pub async fn write(bytes: &[u8], suffix: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("{}.{suffix}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "Scratch file already gone");
        }
    }
}

/// Run-scoped state threaded through every stage.
///
/// One instance per email processed, exclusively owned by the run — concurrent
/// runs never share it.
#[derive(Debug, Default)]
pub struct RunState {
    pub sender: String,
    pub subject: String,
    /// Email body HTML ("No body" when the provider returns none).
    pub body: String,
    scratch: Option<ScratchFile>,
}

impl RunState {
    /// Record the stored attachment. Present only between intake success and
    /// the extraction stage's cleanup.
    pub fn set_scratch(&mut self, scratch: ScratchFile) {
        self.scratch = Some(scratch);
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(ScratchFile::path)
    }

    /// Remove the scratch file now. Idempotent — later calls are no-ops.
    pub fn discard_scratch(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            debug!(path = %scratch.path().display(), "Removing scratch file");
        }
    }
}
