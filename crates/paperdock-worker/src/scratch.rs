//! Per-job scratch directory with Drop-based cleanup.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// A directory for one job's temp files (downloaded blob, rendered
/// thumbnail). Removed on drop, so cleanup happens on every exit path of the
/// pipeline, including early error returns.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(root: &Path, document_id: Uuid) -> std::io::Result<Self> {
        let path = root.join(format!("ingest-{document_id}"));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "scratch cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_scratch_dir_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let path = {
            let scratch = ScratchDir::create(root.path(), id).unwrap();
            std::fs::write(scratch.file("blob.pdf"), b"data").unwrap();
            assert!(scratch.path().exists());
            scratch.path().to_owned()
        };
        assert!(!path.exists());
    }

    #[test]
    fn create_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let first = ScratchDir::create(root.path(), id).unwrap();
        drop(first);
        let second = ScratchDir::create(root.path(), id).unwrap();
        assert!(second.path().exists());
    }
}
