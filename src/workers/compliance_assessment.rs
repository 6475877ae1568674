use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::backend::TextBackend;
use crate::error::WorkerError;
use crate::models::{ReportContext, SectionKind, WorkerPriority};

use super::values::{context_values, one_decimal, with_extra};
use super::{SectionWorker, render};

const ROLE: &str = "formal WCAG compliance assessment by principle";

/// Standard the assessment is measured against
const STANDARD: &str = "the Web Content Accessibility Guidelines (WCAG) 2.1 Level AA";

/// Per-principle scores and the list of failed success criteria
pub struct ComplianceAssessmentWorker {
    backend: Arc<dyn TextBackend>,
}

impl ComplianceAssessmentWorker {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }

    fn values(&self, ctx: &ReportContext) -> Value {
        let breakdown: Vec<Value> = ctx
            .analysis
            .compliance
            .breakdown
            .dimensions()
            .iter()
            .map(|(name, score)| {
                json!({
                    "name": name,
                    "score": one_decimal(*score),
                    "status": principle_status(*score),
                })
            })
            .collect();

        with_extra(
            context_values(ctx),
            json!({
                "standard": STANDARD,
                "breakdown": breakdown,
                "criteria": ctx.metrics.criteria_violated,
            }),
        )
    }
}

fn principle_status(score: f64) -> &'static str {
    if score >= 95.0 {
        "Meets requirements"
    } else if score >= 80.0 {
        "Minor issues"
    } else if score >= 50.0 {
        "Needs improvement"
    } else {
        "Failing"
    }
}

#[async_trait]
impl SectionWorker for ComplianceAssessmentWorker {
    fn id(&self) -> &str {
        "compliance_assessment"
    }

    fn section(&self) -> SectionKind {
        SectionKind::ComplianceAssessment
    }

    fn priority(&self) -> WorkerPriority {
        WorkerPriority::High
    }

    fn validate_input(&self, ctx: &ReportContext) -> bool {
        ctx.check_consistency().is_ok()
            && ctx
                .analysis
                .compliance
                .breakdown
                .dimensions()
                .iter()
                .all(|(_, score)| score.is_finite() && (0.0..=100.0).contains(score))
    }

    async fn generate_section(&self, ctx: &ReportContext) -> Result<String, WorkerError> {
        render(self.backend.as_ref(), ROLE, self.section(), self.values(ctx)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TemplateBackend;
    use crate::context::ContextPreparer;
    use crate::models::{ContentMetadata, StructuralMarker};

    #[test]
    fn test_principle_status() {
        assert_eq!(principle_status(100.0), "Meets requirements");
        assert_eq!(principle_status(85.0), "Minor issues");
        assert_eq!(principle_status(10.0), "Failing");
    }

    #[test]
    fn test_rejects_broken_principle_scores() {
        let worker = ComplianceAssessmentWorker::new(Arc::new(TemplateBackend::new()));
        let mut ctx = ContextPreparer::new().prepare(&json!([]), &json!("Acme"), &json!({}));
        assert!(worker.validate_input(&ctx));

        ctx.analysis.compliance.breakdown.perceivable = f64::NAN;
        assert!(!worker.validate_input(&ctx));

        ctx.analysis.compliance.breakdown.perceivable = 80.0;
        ctx.analysis.compliance.breakdown.robust = 140.0;
        assert!(!worker.validate_input(&ctx));
    }

    #[tokio::test]
    async fn test_assessment_lists_criteria_in_table_layout() {
        let ctx = ContextPreparer::new().prepare(
            &json!({"violations": [
                {"code": "color-contrast", "impact": "serious", "selector": "p", "wcag": "1.4.3"},
                {"code": "label", "impact": "critical", "selector": "#q", "wcag": "3.3.2"}
            ]}),
            &json!({"name": "Acme"}),
            &json!({}),
        );
        let worker = ComplianceAssessmentWorker::new(Arc::new(TemplateBackend::new()));
        let content = worker.generate_section(&ctx).await.unwrap();

        let meta = ContentMetadata::extract(&content);
        for marker in SectionKind::ComplianceAssessment.required_markers() {
            assert!(meta.has(*marker), "missing {:?}", marker);
        }
        assert!(meta.has(StructuralMarker::List));
        assert!(content.contains("WCAG 1.4.3"));
        assert!(content.contains("WCAG 3.3.2"));
        assert!(content.contains("<caption>"));
    }
}
