use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use crate::backend::TextBackend;
use crate::error::WorkerError;
use crate::models::{ComplianceLevel, ReportContext, SectionKind, WorkerPriority};

use super::values::{context_values, with_extra};
use super::{SectionWorker, render};

const ROLE: &str = "strategic accessibility recommendations";

const PRACTICES: [&str; 4] = [
    "Include accessibility acceptance criteria in every user story.",
    "Train designers and content authors on accessible patterns.",
    "Test new features with a screen reader and keyboard only.",
    "Publish an accessibility statement with a way to report barriers.",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Recommendation {
    title: String,
    detail: String,
}

impl Recommendation {
    fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
        }
    }
}

/// Closing recommendations; in sequential runs they also reflect how the
/// earlier sections turned out.
pub struct RecommendationsWorker {
    backend: Arc<dyn TextBackend>,
}

impl RecommendationsWorker {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }

    fn values(&self, ctx: &ReportContext) -> Value {
        with_extra(
            context_values(ctx),
            json!({
                "recommendations": build_recommendations(ctx),
                "practices": PRACTICES,
            }),
        )
    }
}

fn build_recommendations(ctx: &ReportContext) -> Vec<Recommendation> {
    let metrics = &ctx.metrics;
    let mut recs = Vec::new();

    if metrics.critical() > 0 {
        recs.push(Recommendation::new(
            "Remove critical barriers first",
            "Critical issues stop some visitors from using the site at all and carry the highest legal risk.",
        ));
    }

    for issue in metrics.top_issues.iter().take(3) {
        recs.push(Recommendation::new(
            format!("Fix {}", issue.code),
            format!(
                "{} ({} {} occurrence{}).",
                issue.message,
                issue.count,
                issue.severity.as_str(),
                if issue.count == 1 { "" } else { "s" }
            ),
        ));
    }

    match ctx.analysis.compliance.level {
        ComplianceLevel::FullyCompliant => recs.push(Recommendation::new(
            "Maintain the current standard",
            "Keep automated scans in the release process and audit manually once a year.",
        )),
        ComplianceLevel::SubstantiallyCompliant => recs.push(Recommendation::new(
            "Close the remaining gaps",
            "The site is close to full conformance; a short, focused sprint should cover the remaining work.",
        )),
        ComplianceLevel::PartiallyCompliant | ComplianceLevel::NonCompliant => {
            recs.push(Recommendation::new(
                "Appoint an accessibility owner",
                "A named owner with budget and authority keeps remediation on schedule.",
            ))
        }
    }

    let needs_review: Vec<&str> = ctx
        .findings()
        .iter()
        .filter(|(_, finding)| finding["fallback"].as_bool().unwrap_or(false))
        .map(|(worker, _)| worker.as_str())
        .collect();
    if !needs_review.is_empty() {
        recs.push(Recommendation::new(
            "Review incomplete sections",
            format!(
                "The following sections were produced from fallback content and should be reviewed by hand: {}.",
                needs_review.join(", ")
            ),
        ));
    }

    recs.push(Recommendation::new(
        "Automate regression testing",
        "Run the accessibility scanners in continuous integration so new issues are caught before release.",
    ));

    recs.truncate(ctx.requirements.format.max_recommendations.max(1));
    recs
}

#[async_trait]
impl SectionWorker for RecommendationsWorker {
    fn id(&self) -> &str {
        "recommendations"
    }

    fn section(&self) -> SectionKind {
        SectionKind::Recommendations
    }

    fn priority(&self) -> WorkerPriority {
        WorkerPriority::Low
    }

    fn validate_input(&self, ctx: &ReportContext) -> bool {
        ctx.check_consistency().is_ok() && ctx.requirements.format.max_recommendations > 0
    }

    async fn generate_section(&self, ctx: &ReportContext) -> Result<String, WorkerError> {
        render(self.backend.as_ref(), ROLE, self.section(), self.values(ctx)).await
    }
}
