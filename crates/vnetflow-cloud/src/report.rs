//! Output file sink

use crate::error::Result;
use crate::result::ApplyResult;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File name the run report is written to
pub const OUTPUT_FILE: &str = "output.json";

/// Writes the collected records as a pretty-printed JSON array
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writer targeting `output.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(OUTPUT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, results: &[ApplyResult]) -> Result<()> {
        let content = serde_json::to_string_pretty(results)?;
        fs::write(&self.path, content).await?;

        tracing::debug!("Wrote {} records to {}", results.len(), self.path.display());
        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new(OUTPUT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Confirmed, UnitOfWork};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_report() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ReportWriter::in_dir(temp_dir.path());

        let results = vec![
            UnitOfWork::new("virtual network", "rg-a")
                .with_name("vnet_name", "vnet-1")
                .succeeded(Confirmed::new().detail("location", "eastus")),
            UnitOfWork::new("virtual network", "rg-b")
                .with_name("vnet_name", "vnet-2")
                .failed("Resource group does not exist"),
        ];
        writer.write(&results).await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert!(content.contains("\n  {\n    \"vnet_name\": \"vnet-1\""));

        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let records = parsed.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["status"], "success");
        assert_eq!(records[1]["reason"], "Resource group does not exist");
    }

    #[tokio::test]
    async fn test_empty_run_writes_empty_array() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ReportWriter::in_dir(temp_dir.path());
        writer.write(&[]).await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content, "[]");
    }

    #[test]
    fn test_default_path() {
        assert_eq!(ReportWriter::default().path(), Path::new("output.json"));
    }
}
