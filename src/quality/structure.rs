//! Structural validation (QC-008 to QC-010).
//!
//! - QC-008: opening and closing tags must balance (void elements exempt)
//! - QC-009: every table needs a caption
//! - QC-010: every header cell needs a `scope`

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::WorkerResult;

use super::{QualityController, QualityIssue};

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*?(/?)>").expect("invalid TAG regex")
});
static TABLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b.*?</table>").expect("invalid TABLE_BLOCK regex"));
static CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<caption\b").expect("invalid CAPTION regex"));
static HEADER_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<th\b[^>]*>").expect("invalid HEADER_CELL regex"));
static SCOPE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bscope\s*=").expect("invalid SCOPE_ATTR regex"));

/// Elements that never take a closing tag
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Problems found while matching tags, in document order
pub fn unbalanced_tags(content: &str) -> Vec<String> {
    let mut stack: Vec<String> = Vec::new();
    let mut problems = Vec::new();

    for caps in TAG.captures_iter(content) {
        let name = caps[2].to_lowercase();
        if VOID_ELEMENTS.contains(&name.as_str()) || !caps[3].is_empty() {
            continue;
        }

        if caps[1].is_empty() {
            stack.push(name);
            continue;
        }

        match stack.iter().rposition(|open| *open == name) {
            Some(pos) => {
                for unclosed in stack.drain(pos + 1..) {
                    problems.push(format!("<{}> is not closed before </{}>", unclosed, name));
                }
                stack.pop();
            }
            None => problems.push(format!("</{}> has no matching opening tag", name)),
        }
    }

    problems.extend(stack.into_iter().map(|open| format!("<{}> is never closed", open)));
    problems
}

impl QualityController {
    /// QC-008: tag balance
    pub fn check_balance(&self, result: &WorkerResult) -> Option<QualityIssue> {
        let problems = unbalanced_tags(&result.content);
        if problems.is_empty() {
            return None;
        }
        let shown: Vec<&str> = problems.iter().take(3).map(String::as_str).collect();
        Some(QualityIssue::error(
            "QC-008",
            &result.worker,
            format!(
                "unbalanced markup ({} problem{}): {}",
                problems.len(),
                if problems.len() == 1 { "" } else { "s" },
                shown.join("; ")
            ),
        ))
    }

    /// QC-009 / QC-010: table captions and header scope
    pub fn check_tables(&self, result: &WorkerResult) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        for (index, table) in TABLE_BLOCK.find_iter(&result.content).enumerate() {
            let table = table.as_str();
            if !CAPTION.is_match(table) {
                issues.push(QualityIssue::warning(
                    "QC-009",
                    &result.worker,
                    format!("table {} has no caption", index + 1),
                ));
            }
            let unscoped = HEADER_CELL
                .find_iter(table)
                .filter(|th| !SCOPE_ATTR.is_match(th.as_str()))
                .count();
            if unscoped > 0 {
                issues.push(QualityIssue::warning(
                    "QC-010",
                    &result.worker,
                    format!(
                        "table {} has {} header cell{} without a scope attribute",
                        index + 1,
                        unscoped,
                        if unscoped == 1 { "" } else { "s" }
                    ),
                ));
            }
        }
        issues
    }
}
