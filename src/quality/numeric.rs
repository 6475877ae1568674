//! Numeric consistency (QC-001).

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ReportContext, WorkerResult, strip_markup, unescape_html};

use super::{QualityController, QualityIssue};

static COUNT_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:total\s+)?(error|warning)s?\b").expect("invalid COUNT_MENTION regex")
});

/// Plain text of a section, with markup removed and entities decoded
pub(super) fn plain_text(content: &str) -> String {
    unescape_html(&strip_markup(content))
}

/// (count, is_error) pairs mentioned in a section
pub fn count_mentions(content: &str) -> Vec<(usize, bool)> {
    COUNT_MENTION
        .captures_iter(&plain_text(content))
        .filter_map(|caps| {
            let value = caps[1].parse::<usize>().ok()?;
            Some((value, caps[2].eq_ignore_ascii_case("error")))
        })
        .collect()
}

fn deviates(value: usize, expected: usize, tolerance: f64) -> bool {
    let diff = value.abs_diff(expected) as f64;
    diff > tolerance * value.max(expected) as f64
}

impl QualityController {
    /// QC-001: error and warning counts mentioned across sections must agree
    /// with each other and with the scan.
    pub fn check_numeric_consistency(
        &self,
        results: &[WorkerResult],
        ctx: &ReportContext,
    ) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        let per_section: Vec<Vec<(usize, bool)>> =
            results.iter().map(|r| count_mentions(&r.content)).collect();

        for (is_error, kind, expected) in [
            (true, "error", ctx.metrics.error_count),
            (false, "warning", ctx.metrics.warning_count),
        ] {
            let mentions: Vec<(usize, usize)> = per_section
                .iter()
                .enumerate()
                .flat_map(|(idx, found)| {
                    found
                        .iter()
                        .filter(move |(_, e)| *e == is_error)
                        .map(move |(value, _)| (idx, *value))
                })
                .collect();
            let (Some(min), Some(max)) = (
                mentions.iter().map(|(_, v)| *v).min(),
                mentions.iter().map(|(_, v)| *v).max(),
            ) else {
                continue;
            };

            let spread_exceeded = (max - min) as f64 > self.config.count_tolerance * max as f64;
            let mut flagged: BTreeSet<usize> = mentions
                .iter()
                .filter(|(_, v)| deviates(*v, expected, self.config.count_tolerance))
                .map(|(idx, _)| *idx)
                .collect();
            if flagged.is_empty() && spread_exceeded {
                flagged = mentions.iter().map(|(idx, _)| *idx).collect();
            }

            for idx in flagged {
                let mentioned: Vec<String> = mentions
                    .iter()
                    .filter(|(i, _)| *i == idx)
                    .map(|(_, v)| v.to_string())
                    .collect();
                issues.push(QualityIssue::warning(
                    "QC-001",
                    &results[idx].worker,
                    format!(
                        "{} count mentioned as {} but the scan recorded {} (mentions across sections range {}-{})",
                        kind,
                        mentioned.join(", "),
                        expected,
                        min,
                        max
                    ),
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_mentions() {
        let found = count_mentions("<p>We found <b>12</b> errors, 1 warning and 3 total errors.</p>");
        assert_eq!(found, vec![(12, true), (1, false), (3, true)]);
    }

    #[test]
    fn test_deviates_uses_relative_tolerance() {
        assert!(!deviates(100, 95, 0.10));
        assert!(deviates(100, 80, 0.10));
        assert!(!deviates(0, 0, 0.10));
        assert!(deviates(1, 0, 0.10));
    }
}
