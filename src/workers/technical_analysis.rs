use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::backend::TextBackend;
use crate::error::WorkerError;
use crate::models::{ReportContext, SectionKind, Severity, WorkerPriority};

use super::values::{context_values, one_decimal, with_extra};
use super::{SectionWorker, render};

const ROLE: &str = "technical analysis of accessibility violations for developers";

/// Severity distribution, tool coverage and, for technical readers, the
/// individual violations
pub struct TechnicalAnalysisWorker {
    backend: Arc<dyn TextBackend>,
}

impl TechnicalAnalysisWorker {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }

    fn values(&self, ctx: &ReportContext) -> Value {
        let severity_rows: Vec<Value> = Severity::ALL
            .iter()
            .map(|severity| {
                let counts = ctx.metrics.by_severity.get(severity);
                json!({
                    "label": severity.label(),
                    "count": counts.map(|c| c.count).unwrap_or(0),
                    "percentage": one_decimal(counts.map(|c| c.percentage).unwrap_or(0.0)),
                })
            })
            .collect();

        let limit = ctx.requirements.format.max_listed_violations;
        let violations: Vec<Value> = ctx
            .analysis
            .violations
            .iter()
            .take(limit)
            .map(|v| {
                json!({
                    "code": v.code,
                    "criterion": v.criterion.as_deref().unwrap_or("n/a"),
                    "severity": v.severity.label(),
                    "selector": if v.selector.is_empty() { "n/a" } else { v.selector.as_str() },
                    "message": v.message,
                })
            })
            .collect();

        let sources: Vec<Value> = ctx
            .metrics
            .source_coverage
            .iter()
            .map(|(name, count)| json!({"name": name, "count": count}))
            .collect();

        with_extra(
            context_values(ctx),
            json!({
                "severity_rows": severity_rows,
                "violations": violations,
                "sources": sources,
            }),
        )
    }
}

#[async_trait]
impl SectionWorker for TechnicalAnalysisWorker {
    fn id(&self) -> &str {
        "technical_analysis"
    }

    fn section(&self) -> SectionKind {
        SectionKind::TechnicalAnalysis
    }

    fn priority(&self) -> WorkerPriority {
        WorkerPriority::High
    }

    /// Severity rows must account for every violation
    fn validate_input(&self, ctx: &ReportContext) -> bool {
        let counted: usize = Severity::ALL.iter().map(|s| ctx.metrics.count(*s)).sum();
        ctx.check_consistency().is_ok() && counted == ctx.metrics.total_violations
    }

    async fn generate_section(&self, ctx: &ReportContext) -> Result<String, WorkerError> {
        render(self.backend.as_ref(), ROLE, self.section(), self.values(ctx)).await
    }
}
