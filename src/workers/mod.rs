//! Section workers.
//!
//! A worker turns the shared [`ReportContext`] into one section of the report.
//! Workers only implement [`SectionWorker`]; every execution goes through
//! [`WorkerRunner::execute`], which owns timeouts, scoring and failure
//! containment.

mod compliance_assessment;
mod executive_summary;
mod recommendations;
mod remediation_plan;
mod runner;
mod technical_analysis;
mod values;

pub use compliance_assessment::ComplianceAssessmentWorker;
pub use executive_summary::ExecutiveSummaryWorker;
pub use recommendations::RecommendationsWorker;
pub use remediation_plan::RemediationPlanWorker;
pub use runner::{WorkerRunner, WorkerStats, score_content};
pub use technical_analysis::TechnicalAnalysisWorker;
pub use values::context_values;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{GenerationRequest, TextBackend};
use crate::error::WorkerError;
use crate::models::{ReportContext, SectionKind, WorkerPriority};

/// Capability interface implemented by every section worker
#[async_trait]
pub trait SectionWorker: Send + Sync {
    /// Stable identifier, used for config overrides and findings
    fn id(&self) -> &str;

    /// Section this worker produces
    fn section(&self) -> SectionKind;

    fn priority(&self) -> WorkerPriority;

    /// Whether the context is usable by this worker
    fn validate_input(&self, ctx: &ReportContext) -> bool {
        ctx.check_consistency().is_ok()
    }

    /// Produce the section content
    async fn generate_section(&self, ctx: &ReportContext) -> Result<String, WorkerError>;
}

/// The five standard workers, all backed by `backend`
pub fn default_workers(backend: Arc<dyn TextBackend>) -> Vec<Arc<dyn SectionWorker>> {
    vec![
        Arc::new(ExecutiveSummaryWorker::new(backend.clone())),
        Arc::new(ComplianceAssessmentWorker::new(backend.clone())),
        Arc::new(TechnicalAnalysisWorker::new(backend.clone())),
        Arc::new(RemediationPlanWorker::new(backend.clone())),
        Arc::new(RecommendationsWorker::new(backend)),
    ]
}

/// Single backend call shared by the concrete workers
async fn render(
    backend: &dyn TextBackend,
    role: &str,
    section: SectionKind,
    values: Value,
) -> Result<String, WorkerError> {
    let request = GenerationRequest::new(role, section, values);
    let response = backend.generate(&request).await?;
    if response.content.trim().is_empty() {
        return Err(WorkerError::Generation(format!(
            "backend '{}' returned empty content",
            backend.name()
        )));
    }
    Ok(response.content)
}
