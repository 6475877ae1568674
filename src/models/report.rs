use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::result::{WorkerResult, WorkerStatus};

/// Raw inputs for one report request, in whatever shape the callers supply
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportRequest {
    /// Scan results (aggregated, flat or legacy shape)
    pub scan_data: Value,
    /// Company metadata (`name`, `url`, `contact_email`, `locale`)
    #[serde(default)]
    pub company: Value,
    /// Requirements (`audience`, `language`)
    #[serde(default)]
    pub requirements: Value,
}

impl ReportRequest {
    pub fn new(scan_data: Value, company: Value, requirements: Value) -> Self {
        Self {
            scan_data,
            company,
            requirements,
        }
    }
}

/// Top-level outcome of a report run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// The worker pipeline produced the document (possibly with per-section fallbacks)
    Success,
    /// The pipeline failed and the safety-net document was returned
    Fallback,
}

/// Per-worker line in the report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerMetric {
    pub name: String,
    pub status: WorkerStatus,
    pub quality: f64,
    pub time_ms: u64,
    pub error_count: usize,
    pub warning_count: usize,
    pub fallback_used: bool,
}

impl From<&WorkerResult> for WorkerMetric {
    fn from(result: &WorkerResult) -> Self {
        Self {
            name: result.worker.clone(),
            status: result.status,
            quality: result.quality_score,
            time_ms: result.execution_time.as_millis() as u64,
            error_count: result.errors.len(),
            warning_count: result.warnings.len(),
            fallback_used: result.is_fallback(),
        }
    }
}

/// Scores of the five document-level heuristics, each in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QualityBreakdown {
    pub completeness: f64,
    pub accuracy: f64,
    pub readability: f64,
    pub standards_compliance: f64,
    pub professionalism: f64,
}

/// Metadata delivered alongside the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub status: ReportStatus,
    /// Weighted overall quality in [0, 1]
    pub quality_score: f64,
    #[serde(default)]
    pub quality_breakdown: QualityBreakdown,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub workers: Vec<WorkerMetric>,
    /// Compliance score estimated from raw counts (safety net only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_score: Option<f64>,
    /// Why the safety net was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ReportMetadata {
    pub fn fallback_count(&self) -> usize {
        self.workers.iter().filter(|w| w.fallback_used).count()
    }
}

/// Composed document plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    pub document: String,
    pub metadata: ReportMetadata,
}

impl ReportOutput {
    pub fn is_fallback(&self) -> bool {
        self.metadata.status == ReportStatus::Fallback
    }
}
