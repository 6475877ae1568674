//! Document composition.

use crate::config::ReportSettings;
use crate::error::PipelineError;
use crate::models::{ReportContext, WorkerResult, escape_html};

/// Turns post-fallback worker results into the final document
pub trait DocumentComposer: Send + Sync {
    fn compose(&self, ctx: &ReportContext, results: &[WorkerResult]) -> Result<String, PipelineError>;
}

/// Standalone HTML document with a header, the sections in fixed order and
/// a footer
#[derive(Debug, Clone)]
pub struct HtmlComposer {
    title: String,
    contact_email: String,
}

impl Default for HtmlComposer {
    fn default() -> Self {
        Self::new(&ReportSettings::default())
    }
}

impl HtmlComposer {
    pub fn new(settings: &ReportSettings) -> Self {
        Self {
            title: settings.title.clone(),
            contact_email: settings.contact_email.clone(),
        }
    }

    fn header(&self, ctx: &ReportContext) -> String {
        let name = escape_html(ctx.company_name());
        let site = if ctx.company.url.is_empty() {
            String::new()
        } else {
            let url = escape_html(&ctx.company.url);
            format!(" | <a href=\"{url}\">{url}</a>")
        };
        format!(
            "<header class=\"report-header\">\n<h1>{}</h1>\n<p class=\"report-subject\">{}{}</p>\n<p class=\"report-date\">Report date: {}</p>\n</header>",
            escape_html(&self.title),
            name,
            site,
            ctx.report_date()
        )
    }

    fn footer(&self, ctx: &ReportContext, fallback_sections: usize) -> String {
        let contact = escape_html(
            ctx.company
                .contact_email
                .as_deref()
                .unwrap_or(&self.contact_email),
        );
        let notice = match fallback_sections {
            0 => String::new(),
            1 => "\n<p class=\"fallback-summary\">1 section of this report was generated from fallback content.</p>".to_string(),
            n => format!(
                "\n<p class=\"fallback-summary\">{} sections of this report were generated from fallback content.</p>",
                n
            ),
        };
        format!(
            "<footer class=\"report-footer\">\n<p>Generated on {} for {}. Questions: <a href=\"mailto:{contact}\">{contact}</a></p>{}\n</footer>",
            ctx.report_date(),
            escape_html(ctx.company_name()),
            notice,
            contact = contact,
        )
    }
}

impl DocumentComposer for HtmlComposer {
    fn compose(&self, ctx: &ReportContext, results: &[WorkerResult]) -> Result<String, PipelineError> {
        let mut sections: Vec<&WorkerResult> = results
            .iter()
            .filter(|r| !r.content.trim().is_empty())
            .collect();
        if sections.is_empty() {
            return Err(PipelineError::Composition(
                "no section produced any content".to_string(),
            ));
        }
        // Completion order is irrelevant here
        sections.sort_by_key(|r| r.section.position());

        let body: Vec<&str> = sections.iter().map(|r| r.content.trim()).collect();
        let fallback_sections = sections.iter().filter(|r| r.is_fallback()).count();

        Ok(format!(
            "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}: {name}</title>\n</head>\n<body>\n{header}\n<main>\n{body}\n</main>\n{footer}\n</body>\n</html>\n",
            lang = escape_html(&ctx.requirements.language),
            title = escape_html(&self.title),
            name = escape_html(ctx.company_name()),
            header = self.header(ctx),
            body = body.join("\n"),
            footer = self.footer(ctx, fallback_sections),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextPreparer;
    use crate::models::{SectionKind, WorkerStatus};
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

    #[test]
    fn test_sections_composed_in_fixed_order() {
        let ctx = ContextPreparer::new().prepare(
            &json!([]),
            &json!({"name": "Acme", "url": "https://acme.test"}),
            &json!({"language": "de"}),
        );
        let results = vec![
            result(SectionKind::Recommendations, "<section>REC</section>"),
            result(SectionKind::ExecutiveSummary, "<section>EXEC</section>"),
            result(SectionKind::TechnicalAnalysis, "   "),
            result(SectionKind::ComplianceAssessment, "<section>COMP</section>"),
        ];
        let doc = HtmlComposer::default().compose(&ctx, &results).unwrap();

        let exec = doc.find("EXEC").unwrap();
        let comp = doc.find("COMP").unwrap();
        let rec = doc.find("REC").unwrap();
        assert!(doc.find("<header").unwrap() < exec);
        assert!(exec < comp && comp < rec);
        assert!(rec < doc.find("<footer").unwrap());
        assert!(doc.contains("<html lang=\"de\">"));
        assert!(doc.contains("mailto:accessibility@reportforge.dev"));
        // Empty sections are omitted, not rendered as placeholders
        assert_eq!(doc.matches("<section>").count(), 3);
    }

    #[test]
    fn test_nothing_to_compose_is_error() {
        let ctx = ContextPreparer::new().prepare(&json!([]), &json!("Acme"), &json!({}));
        let err = HtmlComposer::default().compose(&ctx, &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Composition(_)));
    }
}
