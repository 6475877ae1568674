pub mod files;

pub use files::*;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ReportOutput;

/// Trait for delivering finished reports
#[async_trait]
pub trait ReportWriter: Send + Sync {
    /// Write the document and its metadata under `slug`. Returns the
    /// directory the report was written to.
    async fn write_report(&self, output: &ReportOutput, slug: &str) -> Result<PathBuf>;
}
