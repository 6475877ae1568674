//! Cross-reference validation (QC-011 to QC-013).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ReportContext, SectionKind, WorkerResult, mentions};

use super::numeric::plain_text;
use super::{QualityController, QualityIssue};

// WCAG version numbers between "score" and the value are skipped as a unit
static SCORE_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:overall|compliance|accessibility)\s+score\b(?:wcag\s*\d+(?:\.\d+)*|[^0-9]){0,60}?(\d{1,3}(?:\.\d+)?)",
    )
    .expect("invalid SCORE_MENTION regex")
});

/// Score-like numbers mentioned in a section
pub fn score_mentions(content: &str) -> Vec<f64> {
    SCORE_MENTION
        .captures_iter(&plain_text(content))
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .collect()
}

impl QualityController {
    /// QC-011: the company name must appear in every content section
    pub fn check_company_name(&self, result: &WorkerResult, ctx: &ReportContext) -> Option<QualityIssue> {
        if result.section.is_infrastructure() || mentions(&result.content, ctx.company_name()) {
            return None;
        }
        Some(QualityIssue::warning(
            "QC-011",
            &result.worker,
            format!("section does not mention '{}'", ctx.company_name()),
        ))
    }

    /// QC-012: any mentioned score must be within tolerance of the authoritative score
    pub fn check_score_mentions(&self, result: &WorkerResult, ctx: &ReportContext) -> Vec<QualityIssue> {
        let expected = ctx.score();
        score_mentions(&result.content)
            .into_iter()
            .filter(|found| (found - expected).abs() > self.config.score_tolerance)
            .map(|found| {
                QualityIssue::warning(
                    "QC-012",
                    &result.worker,
                    format!(
                        "score {} differs from the authoritative score {:.1} by more than {}",
                        found, expected, self.config.score_tolerance
                    ),
                )
            })
            .collect()
    }

    /// QC-013: the subject URL must appear somewhere in the generated sections.
    ///
    /// The finding is attributed to the executive summary, or to the first
    /// result when there is none.
    pub fn check_url(&self, results: &[WorkerResult], ctx: &ReportContext) -> Option<QualityIssue> {
        let url = ctx.company.url.trim();
        if url.is_empty() || results.iter().any(|r| mentions(&r.content, url)) {
            return None;
        }
        let owner = results
            .iter()
            .find(|r| r.section == SectionKind::ExecutiveSummary)
            .or_else(|| results.first())?;
        Some(QualityIssue::warning(
            "QC-013",
            &owner.worker,
            format!("report never mentions the site URL {}", url),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPreparer;
    use crate::models::WorkerStatus;
    use serde_json::json;
    use std::time::Duration;

    fn result(section: SectionKind, content: &str) -> WorkerResult {
        WorkerResult::new(
            section.id(),
            section,
            content.to_string(),
            WorkerStatus::Completed,
            1.0,
            Duration::ZERO,
        )
    }

    fn context() -> ReportContext {
        ContextPreparer::new().prepare(
            &json!({"violations": [{"code": "a", "impact": "serious", "selector": "p"}]}),
            &json!({"name": "Acme", "url": "https://acme.test"}),
            &json!({}),
        )
    }

    #[test]
    fn test_score_mentions() {
        assert_eq!(
            score_mentions("<p>The overall compliance score of <b>72.5</b> out of 100</p>"),
            vec![72.5]
        );
        assert_eq!(score_mentions("Accessibility score: 40"), vec![40.0]);
        assert!(score_mentions("<th>Score</th><td>90</td>").is_empty());
    }

    #[test]
    fn test_score_mentions_skip_wcag_version() {
        assert_eq!(
            score_mentions("<p>The overall compliance score under WCAG 2.1 is 72.5.</p>"),
            vec![72.5]
        );
        assert_eq!(
            score_mentions("<p>Accessibility score against WCAG2.2 AA: 64 out of 100</p>"),
            vec![64.0]
        );
    }

    #[test]
    fn test_wcag_version_does_not_trigger_mismatch() {
        let ctx = context();
        let content = format!(
            "<p>Acme has an overall compliance score under WCAG 2.1 of {:.1} out of 100.</p>",
            ctx.score()
        );
        let result = result(SectionKind::ExecutiveSummary, &content);
        assert!(QualityController::default().check_score_mentions(&result, &ctx).is_empty());
    }

    #[test]
    fn test_score_mismatch_warns() {
        let ctx = context();
        let qc = QualityController::default();
        let wrong = result(SectionKind::ExecutiveSummary, "Acme has an overall score of 20 out of 100.");
        let issues = qc.check_score_mentions(&wrong, &ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id, "QC-012");

        let right = result(
            SectionKind::ExecutiveSummary,
            &format!("Acme has an overall score of {:.1}.", ctx.score() - 3.0),
        );
        assert!(qc.check_score_mentions(&right, &ctx).is_empty());
    }

    #[test]
    fn test_company_name_and_url() {
        let ctx = context();
        let qc = QualityController::default();
        let missing = result(SectionKind::Recommendations, "<p>Nothing about the company</p>");
        assert_eq!(qc.check_company_name(&missing, &ctx).unwrap().rule_id, "QC-011");

        let results = vec![result(SectionKind::ExecutiveSummary, "Acme")];
        let issue = qc.check_url(&results, &ctx).unwrap();
        assert_eq!(issue.worker, "executive_summary");

        let results = vec![result(SectionKind::ExecutiveSummary, "Acme at https://acme.test")];
        assert!(qc.check_url(&results, &ctx).is_none());
    }
}
