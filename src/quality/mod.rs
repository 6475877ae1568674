//! Deterministic quality control over a batch of worker results.
//!
//! Runs once per batch, after dispatch and before the failure-handling pass.
//! Findings never fail the pipeline: each one becomes an annotation on the
//! owning result, and errors reduce that result's quality score.
//!
//! # Module Structure
//!
//! - `types`: Core types (QualityIssue, QualityReport)
//! - `numeric`: QC-001 - Error/warning count consistency
//! - `identifiers`: QC-002, QC-003 - Success-criterion identifiers
//! - `content`: QC-004 to QC-007 - Length, structural markers, own quality
//! - `structure`: QC-008 to QC-010 - Tag balance, table captions and scope
//! - `cross_reference`: QC-011 to QC-013 - Company name, score, URL
//! - `scoring`: Document-level heuristics for the overall quality score

mod content;
mod cross_reference;
mod identifiers;
mod numeric;
pub mod scoring;
mod structure;
mod types;

pub use cross_reference::score_mentions;
pub use identifiers::is_known_criterion;
pub use numeric::count_mentions;
pub use structure::unbalanced_tags;
pub use types::*;

use tracing::{debug, info, warn};

use crate::config::QualityConfig;
use crate::models::{ReportContext, WorkerResult};

// ============================================================================
// Quality Controller
// ============================================================================

/// Cross-checks worker output against the context and against each other
#[derive(Debug, Clone)]
pub struct QualityController {
    config: QualityConfig,
    /// Results below this score are flagged (QC-007)
    quality_threshold: f64,
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(QualityConfig::default(), 0.5)
    }
}

impl QualityController {
    pub fn new(config: QualityConfig, quality_threshold: f64) -> Self {
        Self {
            config,
            quality_threshold,
        }
    }

    /// Run every check without modifying the results
    pub fn check_all(&self, results: &[WorkerResult], ctx: &ReportContext) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        // QC-001: Count consistency across sections
        issues.extend(self.check_numeric_consistency(results, ctx));

        for result in results {
            // QC-002, QC-003: Identifiers
            issues.extend(self.check_identifiers(result));
            // QC-004, QC-005: Length
            issues.extend(self.check_length(result));
            // QC-006: Structural markers
            issues.extend(self.check_markers(result));
            // QC-007: Own quality
            issues.extend(self.check_own_quality(result));
            // QC-008: Tag balance
            issues.extend(self.check_balance(result));
            // QC-009, QC-010: Tables
            issues.extend(self.check_tables(result));
            // QC-011: Company name
            issues.extend(self.check_company_name(result, ctx));
            // QC-012: Score mentions
            issues.extend(self.check_score_mentions(result, ctx));
        }

        // QC-013: URL anywhere in the output
        issues.extend(self.check_url(results, ctx));

        issues
    }

    /// Check the batch, attach findings to their results and apply the
    /// error penalty: `quality *= max(min_retained, 1 - errors * penalty)`.
    pub fn review(&self, results: &mut [WorkerResult], ctx: &ReportContext) -> QualityReport {
        let issues = self.check_all(results, ctx);

        for issue in &issues {
            match results.iter_mut().find(|r| r.worker == issue.worker) {
                Some(result) => match issue.severity {
                    IssueSeverity::Error => result.add_error(issue.annotation()),
                    IssueSeverity::Warning => result.add_warning(issue.annotation()),
                },
                None => warn!("Quality issue for unknown worker '{}'", issue.worker),
            }
            debug!("[{}] {}: {}", issue.rule_id, issue.worker, issue.message);
        }

        let mut corrected = 0;
        for result in results.iter_mut() {
            if result.errors.is_empty() {
                continue;
            }
            let factor = (1.0 - result.errors.len() as f64 * self.config.error_penalty)
                .max(self.config.min_retained_quality);
            let before = result.quality_score;
            result.set_quality(before * factor);
            if result.quality_score < before {
                corrected += 1;
            }
        }

        let report = QualityReport { issues, corrected };
        info!(
            "Quality control: {} errors, {} warnings, {} results corrected",
            report.error_count(),
            report.warning_count(),
            report.corrected
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPreparer;
    use crate::models::{SectionKind, WorkerStatus};
    use serde_json::json;
    use std::time::Duration;

    fn context() -> ReportContext {
        ContextPreparer::new().prepare(
            &json!({"violations": [
                {"code": "a", "impact": "serious", "selector": "p"},
                {"code": "b", "impact": "serious", "selector": "q"},
                {"code": "c", "impact": "minor", "selector": "r", "type": "warning"}
            ]}),
            &json!({"name": "Acme", "url": "https://acme.test"}),
            &json!({}),
        )
    }

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

    fn padded(body: &str) -> String {
        format!(
            "<h2>Section</h2><p>{} Acme at https://acme.test has been evaluated in detail by the automated tools.</p><ul><li>x</li></ul>",
            body
        )
    }

    #[test]
    fn test_count_mismatch_flags_deviating_section() {
        let ctx = context();
        let results = vec![
            result(SectionKind::ExecutiveSummary, &padded("We found 2 errors and 1 warning.")),
            result(SectionKind::Recommendations, &padded("Fix the 9 errors.")),
        ];
        let issues = QualityController::default().check_numeric_consistency(&results, &ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].worker, "recommendations");
        assert_eq!(issues[0].rule_id, "QC-001");
    }

    #[test]
    fn test_consistent_counts_pass() {
        let ctx = context();
        let results = vec![
            result(SectionKind::ExecutiveSummary, &padded("We found 2 errors and 1 warning.")),
            result(SectionKind::TechnicalAnalysis, &padded("Tools reported 2 errors.")),
        ];
        assert!(QualityController::default()
            .check_numeric_consistency(&results, &ctx)
            .is_empty());
    }

    #[test]
    fn test_review_attaches_and_penalizes() {
        let ctx = context();
        let mut results = vec![
            result(SectionKind::ExecutiveSummary, &padded("Overall score of 10.")),
            result(SectionKind::Recommendations, "<p>Unclosed <b>markup and 7.9.9</p>"),
        ];
        let report = QualityController::default().review(&mut results, &ctx);

        // Score mismatch is a warning only
        assert!(report.has_rule("executive_summary", "QC-012"));
        assert_eq!(results[0].quality_score, 1.0);
        assert!(results[0].warnings.iter().any(|w| w.rule == "QC-012"));

        // Length, balance and identifier errors: 3 errors -> factor 0.7
        let errors: Vec<&str> = results[1].errors.iter().map(|e| e.rule.as_str()).collect();
        assert!(errors.contains(&"QC-002"));
        assert!(errors.contains(&"QC-004"));
        assert!(errors.contains(&"QC-008"));
        assert_eq!(errors.len(), 3);
        assert!((results[1].quality_score - 0.7).abs() < 1e-9);
        assert_eq!(report.corrected, 1);
    }

    #[test]
    fn test_penalty_floor() {
        let ctx = context();
        let mut results = vec![result(SectionKind::Recommendations, "<p>short</p>")];
        for i in 0..9 {
            results[0].add_error(crate::models::Annotation::error("X", format!("e{}", i)));
        }
        QualityController::default().review(&mut results, &ctx);
        assert!((results[0].quality_score - 0.5).abs() < 1e-9);
    }
}
