use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::backend::TextBackend;
use crate::error::WorkerError;
use crate::models::{ComplianceLevel, ReportContext, SectionKind, WorkerPriority};

use super::values::{context_values, with_extra};
use super::{SectionWorker, render};

const ROLE: &str = "executive summary of accessibility compliance for business stakeholders";

/// Opening overview: score, level and the most frequent issues
pub struct ExecutiveSummaryWorker {
    backend: Arc<dyn TextBackend>,
}

impl ExecutiveSummaryWorker {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }

    fn values(&self, ctx: &ReportContext) -> Value {
        let top_issues: Vec<Value> = ctx
            .metrics
            .top_issues
            .iter()
            .take(ctx.requirements.format.max_recommendations.min(5))
            .map(|issue| {
                let message = if issue.message.is_empty() {
                    &issue.code
                } else {
                    &issue.message
                };
                json!({
                    "severity_label": issue.severity.label(),
                    "message": message,
                    "count": issue.count,
                })
            })
            .collect();

        with_extra(
            context_values(ctx),
            json!({
                "key_message": key_message(ctx.analysis.compliance.level),
                "top_issues": top_issues,
            }),
        )
    }
}

fn key_message(level: ComplianceLevel) -> &'static str {
    match level {
        ComplianceLevel::FullyCompliant => {
            "The site meets the tested requirements and should stay under regular monitoring."
        }
        ComplianceLevel::SubstantiallyCompliant => {
            "Most content is accessible, but the remaining issues should be fixed to reach full conformance."
        }
        ComplianceLevel::PartiallyCompliant => {
            "Significant barriers remain that prevent some users from completing key tasks."
        }
        ComplianceLevel::NonCompliant => {
            "Serious barriers block many users with disabilities, and remediation should start immediately."
        }
    }
}

#[async_trait]
impl SectionWorker for ExecutiveSummaryWorker {
    fn id(&self) -> &str {
        "executive_summary"
    }

    fn section(&self) -> SectionKind {
        SectionKind::ExecutiveSummary
    }

    fn priority(&self) -> WorkerPriority {
        WorkerPriority::Critical
    }

    /// The summary quotes the error and warning split, so it must add up
    fn validate_input(&self, ctx: &ReportContext) -> bool {
        ctx.check_consistency().is_ok()
            && ctx.metrics.error_count + ctx.metrics.warning_count == ctx.metrics.total_violations
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
    use crate::models::mentions;

    #[test]
    fn test_rejects_unbalanced_issue_split() {
        let worker = ExecutiveSummaryWorker::new(Arc::new(TemplateBackend::new()));
        let mut ctx = ContextPreparer::new().prepare(
            &json!({"violations": [{"code": "image-alt", "impact": "critical", "selector": "img"}]}),
            &json!("Acme"),
            &json!({}),
        );
        assert!(worker.validate_input(&ctx));

        ctx.metrics.warning_count += 3;
        assert!(!worker.validate_input(&ctx));
    }

    #[tokio::test]
    async fn test_summary_mentions_company_score_and_counts() {
        let ctx = ContextPreparer::new().prepare(
            &json!({"violations": [
                {"code": "image-alt", "impact": "critical", "selector": "img", "message": "Images must have alternate text"},
                {"code": "label", "impact": "serious", "selector": "#q"}
            ]}),
            &json!({"name": "Acme & Sons", "url": "https://acme.test/home"}),
            &json!({}),
        );
        let worker = ExecutiveSummaryWorker::new(Arc::new(TemplateBackend::new()));
        let content = worker.generate_section(&ctx).await.unwrap();

        assert!(mentions(&content, "Acme & Sons"));
        assert!(mentions(&content, "https://acme.test/home"));
        assert!(content.contains(&format!("compliance score of {:.1} out of 100", ctx.score())));
        assert!(content.contains("2 errors and 0 warnings"));
        assert!(content.contains("Images must have alternate text"));
    }

    #[tokio::test]
    async fn test_clean_scan_summary() {
        let ctx = ContextPreparer::new().prepare(&json!({"violations": []}), &json!("Acme"), &json!({}));
        let worker = ExecutiveSummaryWorker::new(Arc::new(TemplateBackend::new()));
        let content = worker.generate_section(&ctx).await.unwrap();
        assert!(content.contains("No accessibility violations were detected"));
        assert!(content.contains("Fully Compliant"));
    }
}
