//! Deterministic template backend.
//!
//! Section templates are embedded in the binary using include_str! and can be
//! overridden per section from a template directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use minijinja::{Environment, ErrorKind};
use tracing::debug;

use crate::error::BackendError;
use crate::models::SectionKind;

use super::{GenerationRequest, GenerationResponse, TextBackend};

/// Bundled executive summary template
pub const EXECUTIVE_SUMMARY_TEMPLATE: &str = include_str!("../../templates/executive_summary.html");

/// Bundled compliance assessment template
pub const COMPLIANCE_ASSESSMENT_TEMPLATE: &str =
    include_str!("../../templates/compliance_assessment.html");

/// Bundled technical analysis template
pub const TECHNICAL_ANALYSIS_TEMPLATE: &str = include_str!("../../templates/technical_analysis.html");

/// Bundled remediation plan template
pub const REMEDIATION_PLAN_TEMPLATE: &str = include_str!("../../templates/remediation_plan.html");

/// Bundled recommendations template
pub const RECOMMENDATIONS_TEMPLATE: &str = include_str!("../../templates/recommendations.html");

/// Template file name for a section (e.g. `executive_summary.html`)
pub fn template_name(section: SectionKind) -> String {
    format!("{}.html", section.id())
}

/// Bundled template for a template file name
pub fn bundled_template(name: &str) -> Option<&'static str> {
    let section = SectionKind::from_id(name.strip_suffix(".html").unwrap_or(name))?;
    match section {
        SectionKind::ExecutiveSummary => Some(EXECUTIVE_SUMMARY_TEMPLATE),
        SectionKind::ComplianceAssessment => Some(COMPLIANCE_ASSESSMENT_TEMPLATE),
        SectionKind::TechnicalAnalysis => Some(TECHNICAL_ANALYSIS_TEMPLATE),
        SectionKind::RemediationPlan => Some(REMEDIATION_PLAN_TEMPLATE),
        SectionKind::Recommendations => Some(RECOMMENDATIONS_TEMPLATE),
        SectionKind::Header | SectionKind::Footer => None,
    }
}

/// Where a template was found
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// Template loaded from the override directory
    File(PathBuf),
    /// Template compiled into the binary
    Bundled(&'static str),
}

impl TemplateSource {
    pub fn content(&self) -> std::io::Result<String> {
        match self {
            TemplateSource::File(path) => std::fs::read_to_string(path),
            TemplateSource::Bundled(content) => Ok(content.to_string()),
        }
    }
}

/// Resolve a template, preferring the override directory over the bundled copy.
pub fn resolve_template(template_dir: Option<&Path>, name: &str) -> Option<TemplateSource> {
    if let Some(dir) = template_dir {
        let path = dir.join(name);
        if path.is_file() {
            debug!("Using template override: {:?}", path);
            return Some(TemplateSource::File(path));
        }
    }
    bundled_template(name).map(TemplateSource::Bundled)
}

/// Renders section content from minijinja templates
pub struct TemplateBackend {
    env: Environment<'static>,
    template_dir: Option<PathBuf>,
}

impl TemplateBackend {
    /// Backend using only the bundled templates
    pub fn new() -> Self {
        Self::with_template_dir(None)
    }

    /// Backend that checks `template_dir` before falling back to bundled templates
    pub fn with_template_dir(template_dir: Option<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        let loader_dir = template_dir.clone();
        env.set_loader(move |name: &str| {
            match resolve_template(loader_dir.as_deref(), name) {
                Some(source) => source.content().map(Some).map_err(|e| {
                    minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("failed to read template '{}'", name),
                    )
                    .with_source(e)
                }),
                None => Ok(None),
            }
        });

        Self { env, template_dir }
    }

    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }
}

impl Default for TemplateBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextBackend for TemplateBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, BackendError> {
        let name = template_name(request.section);
        let template = self.env.get_template(&name)?;

        let mut values = request.values.clone();
        if let Some(obj) = values.as_object_mut() {
            obj.insert(
                "role".to_string(),
                serde_json::Value::String(request.role.clone()),
            );
        }

        let content = template.render(&values)?;
        Ok(GenerationResponse {
            content: content.trim().to_string(),
        })
    }

    fn name(&self) -> &str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundled_templates_not_empty() {
        for section in SectionKind::CONTENT {
            let template = bundled_template(&template_name(section));
            assert!(
                template.is_some_and(|t| !t.trim().is_empty()),
                "missing bundled template for {:?}",
                section
            );
        }
        assert!(bundled_template("header.html").is_none());
    }

    #[test]
    fn test_resolve_template_bundled_fallback() {
        let source = resolve_template(Some(Path::new("/nonexistent")), "recommendations.html");
        assert!(matches!(source, Some(TemplateSource::Bundled(_))));
    }

    #[tokio::test]
    async fn test_override_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("executive_summary.html"),
            "<h2>Custom</h2><p>{{ company.name }}</p>",
        )
        .unwrap();

        let backend = TemplateBackend::with_template_dir(Some(dir.path().to_path_buf()));
        let request = GenerationRequest::new(
            "summary",
            SectionKind::ExecutiveSummary,
            json!({"company": {"name": "Acme & Co"}}),
        );
        let response = backend.generate(&request).await.unwrap();
        assert_eq!(response.content, "<h2>Custom</h2><p>Acme &amp; Co</p>");
    }

    #[tokio::test]
    async fn test_missing_template_is_error() {
        let backend = TemplateBackend::new();
        let request = GenerationRequest::new("header", SectionKind::Header, json!({}));
        let result = backend.generate(&request).await;
        assert!(matches!(result, Err(BackendError::Template(_))));
    }
}
