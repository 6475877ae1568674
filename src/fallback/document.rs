//! Whole-document fallback built straight from raw scan counts.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::context::parse_company;
use crate::models::{Severity, escape_html};

use super::{FALLBACK_NOTICE_LABEL, FallbackSynthesizer, plural};

/// Raw scan nesting deeper than this is not inspected
const MAX_DEPTH: usize = 4;

/// Keys whose arrays hold violation records
const RECORD_KEYS: [&str; 4] = ["violations", "errors", "warnings", "issues"];

/// Counts taken directly from scan data, without parsing into violations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RawCounts {
    pub total: usize,
    pub critical: usize,
}

/// Standalone document returned by the pipeline safety net
#[derive(Debug, Clone, Serialize)]
pub struct FallbackDocument {
    pub html: String,
    pub estimated_score: f64,
    pub violations: usize,
    pub critical: usize,
}

/// Count violation records in any of the accepted scan shapes
pub fn count_raw_violations(scan: &Value) -> RawCounts {
    let mut counts = RawCounts::default();
    walk(scan, 0, &mut counts);
    counts
}

fn walk(value: &Value, depth: usize, counts: &mut RawCounts) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                count_record(item, counts);
            }
        }
        Value::Object(map) => {
            for key in RECORD_KEYS {
                if let Some(Value::Array(items)) = map.get(key) {
                    for item in items {
                        count_record(item, counts);
                    }
                }
            }
            match map.get("results") {
                Some(Value::Object(sources)) => {
                    for source in sources.values() {
                        walk(source, depth + 1, counts);
                    }
                }
                Some(Value::Array(entries)) => {
                    for entry in entries {
                        walk(entry, depth + 1, counts);
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
}

fn count_record(record: &Value, counts: &mut RawCounts) {
    if !record.is_object() {
        return;
    }
    counts.total += 1;
    let severity = ["impact", "severity", "level"]
        .iter()
        .filter_map(|k| record.get(*k))
        .find_map(Value::as_str);
    if severity.is_some_and(|s| Severity::normalize(s) == Severity::Critical) {
        counts.critical += 1;
    }
}

/// Bucketed estimate: monotonically decreasing in the critical count.
pub fn estimate_score(total: usize, critical: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    match critical {
        0 => 85.0,
        1..=2 => 70.0,
        3..=5 => 55.0,
        6..=10 => 40.0,
        11..=20 => 25.0,
        _ => 10.0,
    }
}

fn assessment(score: f64) -> &'static str {
    if score >= 85.0 {
        "The automated scan found no critical barriers. The site appears to have a reasonable accessibility baseline, though the reported issues should still be reviewed."
    } else if score >= 55.0 {
        "The automated scan found a small number of critical barriers. Some users are likely to have difficulty completing key tasks until these are fixed."
    } else if score >= 25.0 {
        "The automated scan found a significant number of critical barriers. Many users with disabilities are likely to be blocked from parts of the site."
    } else {
        "The automated scan found a very large number of critical barriers. The site is likely to be unusable for many people who rely on assistive technology."
    }
}

impl FallbackSynthesizer {
    /// Minimal standalone report used when the pipeline itself fails.
    pub fn document_fallback(&self, scan: &Value, company: &Value, error: &str) -> FallbackDocument {
        let counts = count_raw_violations(scan);
        let estimated_score = estimate_score(counts.total, counts.critical);
        let company = parse_company(company);
        let date = Utc::now().format("%Y-%m-%d").to_string();

        let name = escape_html(company.name());
        let title = escape_html(self.title());
        let contact = escape_html(self.contact_email());
        let site = if company.url.is_empty() {
            String::new()
        } else {
            let url = escape_html(&company.url);
            format!(" (<a href=\"{url}\">{url}</a>)")
        };

        let mut recommendations = Vec::new();
        if counts.critical > 0 {
            recommendations.push(format!(
                "Resolve the {} first, since they block access entirely.",
                plural(counts.critical, "critical violation")
            ));
        }
        if counts.total > 0 {
            recommendations.push(
                "Review the full scan results with the development team.".to_string(),
            );
        }
        recommendations.push("Request a complete report once the generation issue is resolved.".to_string());
        let recommendations: String = recommendations
            .iter()
            .map(|r| format!("<li>{}</li>\n", r))
            .collect();

        let html = format!(
            "<!DOCTYPE html>\n\
             <html lang=\"{lang}\">\n\
             <head>\n<meta charset=\"utf-8\">\n<title>{title}: {name}</title>\n</head>\n\
             <body>\n\
             <header>\n\
             <p class=\"fallback-notice\" role=\"note\"><strong>{label}</strong> the full report could not be generated, so this preliminary report was built directly from the scan results.</p>\n\
             <h1>{title}</h1>\n\
             <p>Prepared for {name}{site} on {date}.</p>\n\
             </header>\n\
             <main>\n\
             <section id=\"summary\">\n<h2>Summary</h2>\n\
             <table>\n<caption>Preliminary scan summary</caption>\n\
             <tr><th scope=\"row\">Violations found</th><td>{total}</td></tr>\n\
             <tr><th scope=\"row\">Critical violations</th><td>{critical}</td></tr>\n\
             <tr><th scope=\"row\">Estimated score</th><td>{score:.0} / 100</td></tr>\n\
             </table>\n</section>\n\
             <section id=\"assessment\">\n<h2>Preliminary Assessment</h2>\n<p>{assessment}</p>\n</section>\n\
             <section id=\"recommendations\">\n<h2>Recommendations</h2>\n<ul>\n{recommendations}</ul>\n</section>\n\
             <section id=\"contact\">\n<h2>Contact</h2>\n\
             <p>Questions about this report can be sent to <a href=\"mailto:{contact}\">{contact}</a>.</p>\n\
             </section>\n\
             </main>\n\
             <footer>\n<p>Generated {date}. Reason for preliminary report: {reason}</p>\n</footer>\n\
             </body>\n</html>\n",
            lang = escape_html(&company.locale),
            title = title,
            name = name,
            label = FALLBACK_NOTICE_LABEL,
            site = site,
            date = date,
            total = counts.total,
            critical = counts.critical,
            score = estimated_score,
            assessment = assessment(estimated_score),
            recommendations = recommendations,
            contact = contact,
            reason = escape_html(error),
        );

        FallbackDocument {
            html,
            estimated_score,
            violations: counts.total,
            critical: counts.critical,
        }
    }
}
