//! Compliance scoring and shared aggregates.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use crate::models::{
    CodeFrequency, ComplianceBreakdown, ComplianceLevel, ComplianceMetrics, IssueKind, Severity,
    SeverityCount, SharedMetrics, Violation,
};

/// Number of codes kept in `SharedMetrics::top_issues`
const TOP_ISSUE_COUNT: usize = 5;

/// Score deducted per violation of the given severity
fn severity_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 10.0,
        Severity::High => 5.0,
        Severity::Medium => 2.0,
        Severity::Low => 0.5,
    }
}

fn bounded_score(penalty: f64) -> f64 {
    round1((100.0 - penalty).clamp(0.0, 100.0))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Monotonic score from violation counts: fewer and less severe violations
/// score higher, critical violations dominate.
pub fn score_from_violations(violations: &[Violation]) -> f64 {
    bounded_score(violations.iter().map(|v| severity_penalty(v.severity)).sum())
}

/// Per-principle scores. Violations without a criterion count half
/// toward every principle.
pub fn breakdown_from_violations(violations: &[Violation]) -> ComplianceBreakdown {
    let mut penalties = [0.0_f64; 4];
    for violation in violations {
        let penalty = severity_penalty(violation.severity);
        match violation.principle() {
            Some(p) => penalties[usize::from(p - 1)] += penalty,
            None => penalties.iter_mut().for_each(|slot| *slot += penalty / 2.0),
        }
    }

    ComplianceBreakdown {
        perceivable: bounded_score(penalties[0]),
        operable: bounded_score(penalties[1]),
        understandable: bounded_score(penalties[2]),
        robust: bounded_score(penalties[3]),
    }
}

/// Build compliance metrics when the scanner supplied none
pub fn synthesize_compliance(violations: &[Violation]) -> ComplianceMetrics {
    let overall_score = score_from_violations(violations);
    let critical = count_severity(violations, Severity::Critical);
    ComplianceMetrics {
        overall_score,
        level: ComplianceLevel::classify(overall_score, violations.len(), critical),
        breakdown: breakdown_from_violations(violations),
        synthesized: true,
    }
}

/// Read scanner-supplied compliance metrics, filling gaps from the violations.
///
/// Returns `None` when the object carries no usable score.
pub fn parse_compliance(raw: &Value, violations: &[Violation]) -> Option<ComplianceMetrics> {
    let score = ["overall_score", "score", "compliance_score"]
        .iter()
        .filter_map(|k| raw.get(*k))
        .find_map(Value::as_f64)
        .filter(|s| s.is_finite())?
        .clamp(0.0, 100.0);

    let fallback = breakdown_from_violations(violations);
    let breakdown = match raw.get("breakdown") {
        Some(b) if b.is_object() => {
            let dim = |name: &str, default: f64| {
                b.get(name)
                    .and_then(Value::as_f64)
                    .filter(|v| v.is_finite())
                    .map(|v| v.clamp(0.0, 100.0))
                    .unwrap_or(default)
            };
            ComplianceBreakdown {
                perceivable: dim("perceivable", fallback.perceivable),
                operable: dim("operable", fallback.operable),
                understandable: dim("understandable", fallback.understandable),
                robust: dim("robust", fallback.robust),
            }
        }
        _ => fallback,
    };

    let critical = count_severity(violations, Severity::Critical);
    Some(ComplianceMetrics {
        overall_score: round1(score),
        level: ComplianceLevel::classify(score, violations.len(), critical),
        breakdown,
        synthesized: false,
    })
}

/// Estimated share of users affected, in percent
pub fn affected_users_pct(violations: &[Violation]) -> f64 {
    if violations.is_empty() {
        return 0.0;
    }
    let weighted: f64 = violations
        .iter()
        .map(|v| match v.severity {
            Severity::Critical => 3.0,
            Severity::High => 1.5,
            Severity::Medium => 0.5,
            Severity::Low => 0.1,
        })
        .sum();
    round1((5.0 + weighted).clamp(0.0, 95.0))
}

fn count_severity(violations: &[Violation], severity: Severity) -> usize {
    violations.iter().filter(|v| v.severity == severity).count()
}

/// Compute all shared aggregates for a deduplicated violation list
pub fn compute_shared_metrics(violations: &[Violation]) -> SharedMetrics {
    let total = violations.len();

    let by_severity: BTreeMap<Severity, SeverityCount> = Severity::ALL
        .iter()
        .map(|&severity| {
            let count = count_severity(violations, severity);
            let percentage = if total == 0 {
                0.0
            } else {
                round1(count as f64 / total as f64 * 100.0)
            };
            (severity, SeverityCount { count, percentage })
        })
        .collect();

    let mut source_coverage: BTreeMap<String, usize> = BTreeMap::new();
    for violation in violations {
        *source_coverage.entry(violation.source.clone()).or_insert(0) += 1;
    }

    let criteria_violated: Vec<String> = violations
        .iter()
        .filter_map(|v| v.criterion.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    SharedMetrics {
        total_violations: total,
        error_count: violations
            .iter()
            .filter(|v| v.kind == IssueKind::Error)
            .count(),
        warning_count: violations
            .iter()
            .filter(|v| v.kind == IssueKind::Warning)
            .count(),
        by_severity,
        affected_users_pct: affected_users_pct(violations),
        source_coverage,
        criteria_violated,
        top_issues: top_issues(violations),
    }
}

fn top_issues(violations: &[Violation]) -> Vec<CodeFrequency> {
    let mut by_code: HashMap<&str, CodeFrequency> = HashMap::new();
    for violation in violations {
        by_code
            .entry(violation.code.as_str())
            .and_modify(|entry| {
                entry.count += 1;
                entry.severity = entry.severity.min(violation.severity);
            })
            .or_insert_with(|| CodeFrequency {
                code: violation.code.clone(),
                count: 1,
                severity: violation.severity,
                message: violation.message.clone(),
            });
    }

    let mut issues: Vec<CodeFrequency> = by_code.into_values().collect();
    issues.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.severity.cmp(&b.severity))
            .then(a.code.cmp(&b.code))
    });
    issues.truncate(TOP_ISSUE_COUNT);
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(code: &str, severity: Severity, criterion: Option<&str>) -> Violation {
        Violation {
            code: code.to_string(),
            message: format!("{} message", code),
            severity,
            kind: IssueKind::Error,
            criterion: criterion.map(String::from),
            selector: format!("#{}", code),
            source: "axe".to_string(),
            help: None,
        }
    }

    #[test]
    fn test_zero_violations_fully_compliant() {
        let metrics = synthesize_compliance(&[]);
        assert_eq!(metrics.overall_score, 100.0);
        assert_eq!(metrics.level, ComplianceLevel::FullyCompliant);
        assert!(metrics.synthesized);
    }

    #[test]
    fn test_score_is_monotonic_and_critical_dominates() {
        let one_low = vec![violation("a", Severity::Low, None)];
        let one_critical = vec![violation("a", Severity::Critical, None)];
        let two_low = vec![
            violation("a", Severity::Low, None),
            violation("b", Severity::Low, None),
        ];
        assert!(score_from_violations(&one_low) > score_from_violations(&two_low));
        assert!(score_from_violations(&two_low) > score_from_violations(&one_critical));
    }

    #[test]
    fn test_score_bounded_at_zero() {
        let many: Vec<_> = (0..30)
            .map(|i| violation(&format!("c{}", i), Severity::Critical, None))
            .collect();
        assert_eq!(score_from_violations(&many), 0.0);
    }

    #[test]
    fn test_breakdown_by_principle() {
        let violations = vec![violation("contrast", Severity::Critical, Some("1.4.3"))];
        let breakdown = breakdown_from_violations(&violations);
        assert_eq!(breakdown.perceivable, 90.0);
        assert_eq!(breakdown.operable, 100.0);
    }

    #[test]
    fn test_parse_compliance_clamps() {
        let raw = serde_json::json!({"score": 140, "breakdown": {"robust": -5}});
        let metrics = parse_compliance(&raw, &[]).unwrap();
        assert_eq!(metrics.overall_score, 100.0);
        assert_eq!(metrics.breakdown.robust, 0.0);
        assert!(!metrics.synthesized);
    }

    #[test]
    fn test_shared_metrics_counts() {
        let violations = vec![
            violation("a", Severity::Critical, Some("1.1.1")),
            violation("b", Severity::High, Some("2.4.4")),
            violation("b", Severity::Medium, Some("2.4.4")),
            violation("c", Severity::Low, None),
        ];
        let metrics = compute_shared_metrics(&violations);
        assert_eq!(metrics.total_violations, 4);
        assert_eq!(metrics.critical(), 1);
        assert_eq!(metrics.by_severity[&Severity::High].percentage, 25.0);
        assert_eq!(metrics.criteria_violated, vec!["1.1.1", "2.4.4"]);
        assert_eq!(metrics.top_issues[0].code, "b");
        assert_eq!(metrics.top_issues[0].severity, Severity::High);
        assert_eq!(metrics.source_coverage["axe"], 4);
    }
}
