//! Success-criterion identifier validation (QC-002, QC-003).

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::WorkerResult;

use super::numeric::plain_text;
use super::{QualityController, QualityIssue};

/// Anything that looks like a dotted triplet, including malformed variants
static DOTTED_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}(?:\.\d+)*\b").expect("invalid DOTTED_CANDIDATE regex")
});

static CRITERION_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1-4]\.\d{1,2}\.\d{1,2}$").expect("invalid CRITERION_FORMAT regex")
});

/// (principle, guideline, number of success criteria) across WCAG 2.0, 2.1 and 2.2
const GUIDELINES: [(u8, u8, u8); 13] = [
    (1, 1, 1),
    (1, 2, 9),
    (1, 3, 6),
    (1, 4, 13),
    (2, 1, 4),
    (2, 2, 6),
    (2, 3, 3),
    (2, 4, 13),
    (2, 5, 8),
    (3, 1, 6),
    (3, 2, 6),
    (3, 3, 9),
    (4, 1, 3),
];

static KNOWN_CRITERIA: Lazy<HashSet<String>> = Lazy::new(|| {
    GUIDELINES
        .iter()
        .flat_map(|&(principle, guideline, count)| {
            (1..=count).map(move |n| format!("{}.{}.{}", principle, guideline, n))
        })
        .collect()
});

/// Whether `id` is a WCAG 2.x success criterion
pub fn is_known_criterion(id: &str) -> bool {
    KNOWN_CRITERIA.contains(id)
}

impl QualityController {
    /// QC-002 / QC-003: dotted identifiers must be well formed and known.
    pub fn check_identifiers(&self, result: &WorkerResult) -> Vec<QualityIssue> {
        let text = plain_text(&result.content);
        let candidates: BTreeSet<&str> = DOTTED_CANDIDATE
            .find_iter(&text)
            .map(|m| m.as_str())
            .collect();

        candidates
            .into_iter()
            .filter_map(|id| {
                if !CRITERION_FORMAT.is_match(id) {
                    Some(QualityIssue::error(
                        "QC-002",
                        &result.worker,
                        format!("'{}' is not a valid success criterion identifier", id),
                    ))
                } else if !is_known_criterion(id) {
                    Some(QualityIssue::warning(
                        "QC-003",
                        &result.worker,
                        format!("'{}' is not a known WCAG success criterion", id),
                    ))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SectionKind, WorkerStatus};
    use std::time::Duration;

    fn result(content: &str) -> WorkerResult {
        WorkerResult::new(
            "compliance_assessment",
            SectionKind::ComplianceAssessment,
            content.to_string(),
            WorkerStatus::Completed,
            1.0,
            Duration::ZERO,
        )
    }

    #[test]
    fn test_reference_set() {
        assert_eq!(KNOWN_CRITERIA.len(), 87);
        assert!(is_known_criterion("1.4.13"));
        assert!(is_known_criterion("2.5.8"));
        assert!(!is_known_criterion("1.4.14"));
    }

    #[test]
    fn test_malformed_is_error_unknown_is_warning() {
        let qc = QualityController::default();
        let issues = qc.check_identifiers(&result(
            "<p>WCAG 1.4.3 passes, 7.1.1 is malformed, 1.4.3.2 too, 2.4.99 is unknown.</p>",
        ));
        let rules: Vec<(&str, &str)> = issues
            .iter()
            .map(|i| (i.rule_id.as_str(), i.message.as_str()))
            .collect();
        assert_eq!(rules.len(), 3);
        assert!(rules.iter().any(|(r, m)| *r == "QC-002" && m.contains("7.1.1")));
        assert!(rules.iter().any(|(r, m)| *r == "QC-002" && m.contains("1.4.3.2")));
        assert!(rules.iter().any(|(r, m)| *r == "QC-003" && m.contains("2.4.99")));
    }
}
