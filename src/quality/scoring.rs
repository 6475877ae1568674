//! Document-level quality heuristics.
//!
//! Each heuristic yields a value in [0, 1]; the overall score is their
//! weighted mean using [`ScoringWeights`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ScoringWeights;
use crate::models::{
    ContentMetadata, QualityBreakdown, ReportContext, SectionKind, clamp_unit, mentions,
};

use super::numeric::{count_mentions, plain_text};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\{\{|\}\}|\[(?:todo|tbd|placeholder|insert)[^\]]*\]|\blorem ipsum\b|\bTODO\b|\bTBD\b|\bXXX\b")
        .expect("invalid PLACEHOLDER regex")
});
static HTML_LANG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<html\b[^>]*\blang\s*=\s*"[^"]+""#).expect("invalid HTML_LANG regex"));
static TABLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b.*?</table>").expect("invalid TABLE_BLOCK regex"));
static HEADER_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<th\b[^>]*>").expect("invalid HEADER_CELL regex"));

/// Words per heading considered comfortable to read
const WORDS_PER_HEADING: f64 = 150.0;

/// Share of content sections whose title appears in the document
pub fn completeness(document: &str) -> f64 {
    let present = SectionKind::CONTENT
        .iter()
        .filter(|s| mentions(document, s.title()))
        .count();
    present as f64 / SectionKind::CONTENT.len() as f64
}

/// Share of authoritative figures that appear verbatim
pub fn accuracy(document: &str, ctx: &ReportContext) -> f64 {
    let text = plain_text(document);
    let counts = count_mentions(document);
    let checks = [
        text.contains(&format!("{:.1}", ctx.score())),
        mentions(document, ctx.company_name()),
        counts.contains(&(ctx.metrics.error_count, true)),
        counts.contains(&(ctx.metrics.warning_count, false)),
        text.contains(ctx.analysis.compliance.level.label()),
    ];
    checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64
}

/// Heading density plus the presence of lists
pub fn readability(document: &str) -> f64 {
    let meta = ContentMetadata::extract(document);
    if meta.words == 0 {
        return 0.0;
    }
    let density = (meta.headings as f64 * WORDS_PER_HEADING / meta.words as f64).min(1.0);
    let lists = if meta.lists > 0 { 0.4 } else { 0.0 };
    clamp_unit(density * 0.6 + lists)
}

/// Language declaration, table captions and header scopes
pub fn standards_compliance(document: &str) -> f64 {
    let lang = if HTML_LANG.is_match(document) { 0.3 } else { 0.0 };

    let tables: Vec<&str> = TABLE_BLOCK.find_iter(document).map(|m| m.as_str()).collect();
    let captions = if tables.is_empty() {
        1.0
    } else {
        tables.iter().filter(|t| t.to_lowercase().contains("<caption")).count() as f64
            / tables.len() as f64
    };

    let headers: Vec<&str> = HEADER_CELL.find_iter(document).map(|m| m.as_str()).collect();
    let scopes = if headers.is_empty() {
        1.0
    } else {
        headers.iter().filter(|th| th.to_lowercase().contains("scope")).count() as f64
            / headers.len() as f64
    };

    clamp_unit(lang + 0.35 * captions + 0.35 * scopes)
}

/// No placeholder tokens, a date and a contact address
pub fn professionalism(document: &str, ctx: &ReportContext) -> f64 {
    let mut score = 0.0;
    if !PLACEHOLDER.is_match(&plain_text(document)) {
        score += 0.4;
    }
    if document.contains(&ctx.report_date()) {
        score += 0.3;
    }
    if document.contains("mailto:") || plain_text(document).contains('@') {
        score += 0.3;
    }
    clamp_unit(score)
}

/// All five heuristics for a composed document
pub fn breakdown(document: &str, ctx: &ReportContext) -> QualityBreakdown {
    QualityBreakdown {
        completeness: completeness(document),
        accuracy: accuracy(document, ctx),
        readability: readability(document),
        standards_compliance: standards_compliance(document),
        professionalism: professionalism(document, ctx),
    }
}

/// Weighted overall score in [0, 1]
pub fn weighted_score(breakdown: &QualityBreakdown, weights: &ScoringWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let sum = breakdown.completeness * weights.completeness
        + breakdown.accuracy * weights.accuracy
        + breakdown.readability * weights.readability
        + breakdown.standards_compliance * weights.standards_compliance
        + breakdown.professionalism * weights.professionalism;
    clamp_unit(sum / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPreparer;
    use serde_json::json;

    #[test]
    fn test_standards_compliance_markers() {
        let good = "<html lang=\"en\"><table><caption>x</caption><tr><th scope=\"col\">a</th></tr></table></html>";
        assert!((standards_compliance(good) - 1.0).abs() < 1e-9);

        let bad = "<html><table><tr><th>a</th></tr></table></html>";
        assert_eq!(standards_compliance(bad), 0.0);
    }

    #[test]
    fn test_professionalism_flags_placeholders() {
        let ctx = ContextPreparer::new().prepare(&json!([]), &json!("Acme"), &json!({}));
        let clean = format!("<p>{}</p><a href=\"mailto:a@b.c\">a@b.c</a>", ctx.report_date());
        assert!((professionalism(&clean, &ctx) - 1.0).abs() < 1e-9);

        let dirty = "<p>[TODO: insert summary] {{ company }}</p>";
        assert_eq!(professionalism(dirty, &ctx), 0.0);
    }

    #[test]
    fn test_accuracy_counts_match_whole_numbers() {
        let ctx = ContextPreparer::new().prepare(
            &json!({"violations": [
                {"code": "a", "impact": "serious", "selector": "p"},
                {"code": "b", "impact": "serious", "selector": "q"},
                {"code": "c", "impact": "serious", "selector": "r"},
                {"code": "d", "impact": "serious", "selector": "s"},
                {"code": "e", "impact": "serious", "selector": "t"}
            ]}),
            &json!("Acme"),
            &json!({}),
        );
        assert_eq!(ctx.metrics.error_count, 5);
        let exact = format!(
            "<p>Acme scored {:.1}. We found 5 errors and 0 warnings.</p>",
            ctx.score()
        );
        let inflated = format!(
            "<p>Acme scored {:.1}. We found 15 errors and 10 warnings.</p>",
            ctx.score()
        );
        assert!(accuracy(&exact, &ctx) > accuracy(&inflated, &ctx));
        assert!((accuracy(&exact, &ctx) - accuracy(&inflated, &ctx) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_score_normalizes() {
        let perfect = QualityBreakdown {
            completeness: 1.0,
            accuracy: 1.0,
            readability: 1.0,
            standards_compliance: 1.0,
            professionalism: 1.0,
        };
        let weights = ScoringWeights::default();
        assert!((weighted_score(&perfect, &weights) - 1.0).abs() < 1e-9);
        assert_eq!(weighted_score(&QualityBreakdown::default(), &weights), 0.0);
    }
}
