//! Fallback content.
//!
//! Everything here is plain string formatting over already-computed values,
//! so none of it can fail. Per-section fallbacks are keyed by worker identity
//! and always open with a visible notice; the whole-document fallback in
//! [`document`] bypasses the worker pipeline entirely.

mod document;

pub use document::{FallbackDocument, RawCounts, count_raw_violations, estimate_score};

use crate::config::ReportSettings;
use crate::models::{ReportContext, SectionKind, Severity, escape_html};

/// Label that opens every fallback notice
pub const FALLBACK_NOTICE_LABEL: &str = "Fallback content:";

/// Produces replacement content for failed sections and failed pipelines
#[derive(Debug, Clone)]
pub struct FallbackSynthesizer {
    title: String,
    contact_email: String,
}

impl Default for FallbackSynthesizer {
    fn default() -> Self {
        Self::new(&ReportSettings::default())
    }
}

impl FallbackSynthesizer {
    pub fn new(settings: &ReportSettings) -> Self {
        Self {
            title: settings.title.clone(),
            contact_email: settings.contact_email.clone(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn contact_email(&self) -> &str {
        &self.contact_email
    }

    /// Contextual fallback for a worker id, using the generic template for
    /// ids that do not name a content section.
    pub fn for_worker(&self, worker: &str, ctx: &ReportContext, reason: &str) -> String {
        match SectionKind::from_id(worker).filter(|s| !s.is_infrastructure()) {
            Some(section) => self.section_fallback(section, ctx, reason),
            None => self.generic(worker, ctx, reason),
        }
    }

    /// Contextual fallback for a content section, built from real metrics
    pub fn section_fallback(&self, section: SectionKind, ctx: &ReportContext, reason: &str) -> String {
        let body = match section {
            SectionKind::ExecutiveSummary => executive_summary(ctx),
            SectionKind::ComplianceAssessment => compliance_assessment(ctx),
            SectionKind::TechnicalAnalysis => technical_analysis(ctx),
            SectionKind::RemediationPlan => remediation_plan(ctx),
            SectionKind::Recommendations => recommendations(ctx),
            SectionKind::Header | SectionKind::Footer => {
                return self.generic(section.id(), ctx, reason);
            }
        };
        wrap(section.id(), section.title(), reason, &body)
    }

    /// Short placeholder used the moment a worker fails, before the
    /// failure-handling pass replaces it with [`Self::section_fallback`].
    pub fn minimal_section(&self, section: SectionKind, ctx: &ReportContext, reason: &str) -> String {
        let body = format!(
            "<p>The {} for {} could not be generated. The overall compliance score is {:.1} out of 100.</p>",
            section.title().to_lowercase(),
            escape_html(ctx.company_name()),
            ctx.score()
        );
        wrap(section.id(), section.title(), reason, &body)
    }

    fn generic(&self, id: &str, ctx: &ReportContext, reason: &str) -> String {
        let body = format!(
            "<p>This part of the accessibility report for {} is not available. {}</p>",
            escape_html(ctx.company_name()),
            summary_sentence(ctx)
        );
        wrap(id, "Report Section", reason, &body)
    }
}

fn wrap(id: &str, title: &str, reason: &str, body: &str) -> String {
    format!(
        "<section id=\"{id}\" class=\"report-section fallback\">\n\
         <p class=\"fallback-notice\" role=\"note\"><strong>{label}</strong> this section was generated from fallback content because the full analysis was unavailable ({reason}).</p>\n\
         <h2>{title}</h2>\n\
         {body}\n\
         </section>",
        id = escape_html(&id.replace('_', "-")),
        label = FALLBACK_NOTICE_LABEL,
        reason = escape_html(reason),
        title = escape_html(title),
        body = body,
    )
}

pub(crate) fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

fn summary_sentence(ctx: &ReportContext) -> String {
    format!(
        "{} has an overall compliance score of {:.1} out of 100 ({}). Automated testing recorded {} and {}.",
        escape_html(ctx.company_name()),
        ctx.score(),
        ctx.analysis.compliance.level.label(),
        plural(ctx.metrics.error_count, "error"),
        plural(ctx.metrics.warning_count, "warning"),
    )
}

fn executive_summary(ctx: &ReportContext) -> String {
    let site = if ctx.company.url.is_empty() {
        String::new()
    } else {
        let url = escape_html(&ctx.company.url);
        format!(" The evaluated site is <a href=\"{url}\">{url}</a>.")
    };
    format!(
        "<p>{}{}</p>\n<p>Issues rated critical: {}.</p>",
        summary_sentence(ctx),
        site,
        ctx.metrics.critical()
    )
}

fn compliance_assessment(ctx: &ReportContext) -> String {
    let rows: String = ctx
        .analysis
        .compliance
        .breakdown
        .dimensions()
        .iter()
        .map(|(name, score)| format!("<tr><th scope=\"row\">{}</th><td>{:.1}</td></tr>\n", name, score))
        .collect();
    format!(
        "<p>{}</p>\n<table>\n<caption>Results by WCAG principle</caption>\n\
         <tr><th scope=\"col\">Principle</th><th scope=\"col\">Score</th></tr>\n{}</table>",
        summary_sentence(ctx),
        rows
    )
}

fn technical_analysis(ctx: &ReportContext) -> String {
    let rows: String = Severity::ALL
        .iter()
        .map(|s| {
            format!(
                "<tr><th scope=\"row\">{}</th><td>{}</td></tr>\n",
                s.label(),
                ctx.metrics.count(*s)
            )
        })
        .collect();
    format!(
        "<p>{}</p>\n<table>\n<caption>Violations by severity</caption>\n\
         <tr><th scope=\"col\">Severity</th><th scope=\"col\">Count</th></tr>\n{}</table>",
        summary_sentence(ctx),
        rows
    )
}

fn remediation_plan(ctx: &ReportContext) -> String {
    let items: String = Severity::ALL
        .iter()
        .filter(|s| ctx.metrics.count(**s) > 0)
        .map(|s| {
            let count = ctx.metrics.count(*s);
            let noun = if count == 1 { "issue" } else { "issues" };
            format!("<li>Resolve the {} {} {}.</li>\n", count, s.as_str(), noun)
        })
        .collect();
    let items = if items.is_empty() {
        "<li>Keep running automated scans after each release.</li>\n".to_string()
    } else {
        items
    };
    format!(
        "<p>Work for {} should start with the most severe findings.</p>\n<ul>\n{}</ul>",
        escape_html(ctx.company_name()),
        items
    )
}

fn recommendations(ctx: &ReportContext) -> String {
    let mut items = Vec::new();
    if ctx.metrics.critical() > 0 {
        items.push("Fix critical barriers before the next release.");
    }
    items.push("Add automated accessibility checks to the build pipeline.");
    items.push("Schedule a manual review with assistive technology users.");
    let list: String = items.iter().map(|i| format!("<li>{}</li>\n", i)).collect();
    format!(
        "<p>General recommendations for {} while a detailed analysis is pending.</p>\n<ol>\n{}</ol>",
        escape_html(ctx.company_name()),
        list
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPreparer;
    use crate::models::{mentions, strip_markup};
    use serde_json::json;

    fn context() -> ReportContext {
        ContextPreparer::new().prepare(
            &json!({"violations": [
                {"code": "image-alt", "impact": "critical", "selector": "img", "wcag": "1.1.1"},
                {"code": "label", "impact": "serious", "selector": "#q", "wcag": "3.3.2", "type": "warning"}
            ]}),
            &json!({"name": "Acme <Labs>", "url": "https://acme.test"}),
            &json!({}),
        )
    }

    #[test]
    fn test_section_fallback_opens_with_notice() {
        let ctx = context();
        let synth = FallbackSynthesizer::default();
        for section in SectionKind::CONTENT {
            let content = synth.section_fallback(section, &ctx, "timed out");
            let text = strip_markup(&content);
            assert!(
                text.trim_start().starts_with(FALLBACK_NOTICE_LABEL),
                "{:?} does not open with the notice",
                section
            );
            assert!(mentions(&content, "Acme <Labs>"));
            assert!(!content.contains("<Labs>"));
        }
    }

    #[test]
    fn test_section_fallback_uses_real_values() {
        let ctx = context();
        let content = FallbackSynthesizer::default().section_fallback(
            SectionKind::ExecutiveSummary,
            &ctx,
            "failed",
        );
        assert!(content.contains(&format!("{:.1} out of 100", ctx.score())));
        assert!(content.contains("1 error and 1 warning"));
        assert!(content.contains("https://acme.test"));
    }

    #[test]
    fn test_unknown_worker_uses_generic_template() {
        let ctx = context();
        let content = FallbackSynthesizer::default().for_worker("glossary", &ctx, "failed");
        assert!(content.contains("Report Section"));
        assert!(content.contains(FALLBACK_NOTICE_LABEL));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "error"), "1 error");
        assert_eq!(plural(0, "warning"), "0 warnings");
    }
}
