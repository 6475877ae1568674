use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use crate::config::OutputConfig;
use crate::models::ReportOutput;

use super::ReportWriter;

pub const REPORT_FILE: &str = "report.html";
pub const METADATA_FILE: &str = "metadata.json";

/// Writes `<reports_dir>/<slug>/report.html` and `metadata.json`
pub struct FileReportWriter {
    config: OutputConfig,
}

impl FileReportWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn report_dir(&self, slug: &str) -> PathBuf {
        self.config.reports_dir.join(slug)
    }
}

#[async_trait]
impl ReportWriter for FileReportWriter {
    async fn write_report(&self, output: &ReportOutput, slug: &str) -> Result<PathBuf> {
        let dir = self.report_dir(slug);
        fs::create_dir_all(&dir)
            .await
            .context(format!("Failed to create report directory {:?}", dir))?;

        let report_path = dir.join(REPORT_FILE);
        fs::write(&report_path, &output.document)
            .await
            .context("Failed to write report document")?;
        info!("Wrote {:?}", report_path);

        let metadata_path = dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(&output.metadata)
            .context("Failed to serialize report metadata")?;
        fs::write(&metadata_path, json)
            .await
            .context("Failed to write report metadata")?;
        info!("Wrote {:?}", metadata_path);

        Ok(dir)
    }
}
