//! OCR over page images, backed by the tesseract CLI.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an encoded image (JPEG or PNG bytes).
    async fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// Shells out to the `tesseract` binary. The binary path and language are
/// configurable so deployments can pin a specific build and traineddata.
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    /// Probe whether the configured binary can run at all. Called once at
    /// startup so a missing install is logged instead of failing every job.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let dir = tempfile::tempdir().context("failed to create OCR scratch dir")?;
        let input = dir.path().join("page.jpg");
        tokio::fs::write(&input, image)
            .await
            .context("failed to stage OCR input image")?;

        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", self.binary.display()))?;

        if !output.status.success() {
            bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
