use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use crate::backend::TextBackend;
use crate::error::WorkerError;
use crate::models::{Audience, ReportContext, SectionKind, Severity, Violation, WorkerPriority};

use super::values::{context_values, with_extra};
use super::{SectionWorker, render};

const ROLE: &str = "phased remediation plan ordered by severity";

/// One phase of the remediation plan
#[derive(Debug, Clone, Serialize)]
struct Phase {
    title: &'static str,
    timeframe: &'static str,
    summary: String,
    items: Vec<String>,
}

/// Groups violations into severity-ordered work phases
pub struct RemediationPlanWorker {
    backend: Arc<dyn TextBackend>,
}

impl RemediationPlanWorker {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }

    fn values(&self, ctx: &ReportContext) -> Value {
        with_extra(context_values(ctx), json!({ "phases": build_phases(ctx) }))
    }
}

fn build_phases(ctx: &ReportContext) -> Vec<Phase> {
    let violations = &ctx.analysis.violations;
    if violations.is_empty() {
        return Vec::new();
    }

    let limit = ctx.requirements.format.max_recommendations;
    let audience = ctx.requirements.audience;
    let mut phases = Vec::new();

    let plan = [
        (
            &[Severity::Critical][..],
            "Phase 1: Critical barriers",
            "1-2 weeks",
            "that block access for assistive technology users",
        ),
        (
            &[Severity::High][..],
            "Phase 2: High-impact issues",
            "2-6 weeks",
            "that make key tasks difficult",
        ),
        (
            &[Severity::Medium, Severity::Low][..],
            "Phase 3: Remaining issues",
            "1-3 months",
            "that affect comfort and consistency",
        ),
    ];

    for (severities, title, timeframe, impact) in plan {
        let matching: Vec<&Violation> = violations
            .iter()
            .filter(|v| severities.contains(&v.severity))
            .collect();
        if matching.is_empty() {
            continue;
        }
        let noun = if matching.len() == 1 { "issue" } else { "issues" };
        phases.push(Phase {
            title,
            timeframe,
            summary: format!("Address the {} {} {}.", matching.len(), noun, impact),
            items: work_items(&matching, audience, limit),
        });
    }

    phases.push(Phase {
        title: "Ongoing: Prevent regressions",
        timeframe: "continuous",
        summary: format!(
            "Keep {} accessible as the site changes.",
            ctx.company_name()
        ),
        items: vec![
            "Add automated accessibility checks to the release pipeline.".to_string(),
            "Include keyboard and screen reader checks in manual QA.".to_string(),
            "Re-run this assessment after each major release.".to_string(),
        ],
    });

    phases
}

/// One item per rule code, most frequent first
fn work_items(violations: &[&Violation], audience: Audience, limit: usize) -> Vec<String> {
    let mut by_code: BTreeMap<&str, (usize, &Violation)> = BTreeMap::new();
    for &violation in violations {
        by_code
            .entry(violation.code.as_str())
            .or_insert((0, violation))
            .0 += 1;
    }

    let mut grouped: Vec<(usize, &Violation)> = by_code.into_values().collect();
    grouped.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.code.cmp(&b.1.code)));

    grouped
        .into_iter()
        .take(limit.max(1))
        .map(|(count, violation)| {
            let instances = if count == 1 {
                "1 instance".to_string()
            } else {
                format!("{} instances", count)
            };
            match audience {
                Audience::Executive => format!("{} ({})", violation.message, instances),
                Audience::Technical | Audience::Mixed => {
                    let criterion = violation
                        .criterion
                        .as_deref()
                        .map(|c| format!(", WCAG {}", c))
                        .unwrap_or_default();
                    format!(
                        "{}: {} ({}{})",
                        violation.code, violation.message, instances, criterion
                    )
                }
            }
        })
        .collect()
}

#[async_trait]
impl SectionWorker for RemediationPlanWorker {
    fn id(&self) -> &str {
        "remediation_plan"
    }

    fn section(&self) -> SectionKind {
        SectionKind::RemediationPlan
    }

    fn priority(&self) -> WorkerPriority {
        WorkerPriority::Normal
    }

    /// Phases are grouped by severity, so the per-severity counts must
    /// match the violation list
    fn validate_input(&self, ctx: &ReportContext) -> bool {
        ctx.check_consistency().is_ok()
            && Severity::ALL.iter().all(|severity| {
                let listed = ctx
                    .analysis
                    .violations
                    .iter()
                    .filter(|v| v.severity == *severity)
                    .count();
                listed == ctx.metrics.count(*severity)
            })
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

    fn context(audience: &str) -> ReportContext {
        ContextPreparer::new().prepare(
            &json!({"violations": [
                {"code": "image-alt", "impact": "critical", "selector": "img.a", "wcag": "1.1.1", "message": "Missing alt text"},
                {"code": "image-alt", "impact": "critical", "selector": "img.b", "wcag": "1.1.1", "message": "Missing alt text"},
                {"code": "region", "impact": "minor", "selector": "div", "message": "Content outside landmarks"}
            ]}),
            &json!({"name": "Acme"}),
            &json!({"audience": audience}),
        )
    }

    #[test]
    fn test_rejects_stale_severity_counts() {
        let worker = RemediationPlanWorker::new(Arc::new(TemplateBackend::new()));
        let mut ctx = context("mixed");
        assert!(worker.validate_input(&ctx));

        let minor = ctx
            .analysis
            .violations
            .iter_mut()
            .find(|v| v.severity != Severity::Critical)
            .unwrap();
        minor.severity = Severity::Critical;
        assert!(!worker.validate_input(&ctx));
    }

    #[test]
    fn test_rejects_mismatched_totals() {
        let worker = RemediationPlanWorker::new(Arc::new(TemplateBackend::new()));
        let mut ctx = context("mixed");
        ctx.metrics.total_violations = 99;
        assert!(!worker.validate_input(&ctx));
    }

    #[test]
    fn test_phases_follow_severity() {
        let phases = build_phases(&context("technical"));
        let titles: Vec<&str> = phases.iter().map(|p| p.title).collect();
        assert_eq!(
            titles,
            vec![
                "Phase 1: Critical barriers",
                "Phase 3: Remaining issues",
                "Ongoing: Prevent regressions"
            ]
        );
        assert_eq!(
            phases[0].items,
            vec!["image-alt: Missing alt text (2 instances, WCAG 1.1.1)".to_string()]
        );
    }

    #[test]
    fn test_executive_items_omit_codes() {
        let phases = build_phases(&context("executive"));
        assert_eq!(phases[0].items, vec!["Missing alt text (2 instances)".to_string()]);
    }

    #[test]
    fn test_no_violations_no_phases() {
        let ctx = ContextPreparer::new().prepare(&json!([]), &json!("Acme"), &json!({}));
        assert!(build_phases(&ctx).is_empty());
    }
}
