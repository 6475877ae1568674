use serde_json::Value;
use tracing::{debug, info};

use crate::models::{AnalysisData, Audience, CompanyInfo, ReportContext, Requirements};

use super::metrics::{compute_shared_metrics, parse_compliance, synthesize_compliance};
use super::scan::parse_scan_data;

/// Normalizes raw request inputs into one [`ReportContext`].
#[derive(Debug, Clone, Default)]
pub struct ContextPreparer;

impl ContextPreparer {
    pub fn new() -> Self {
        Self
    }

    /// Build the canonical context. Never fails and never mutates its inputs.
    pub fn prepare(&self, scan_data: &Value, company: &Value, requirements: &Value) -> ReportContext {
        let parsed = parse_scan_data(scan_data);
        debug!(
            "Parsed {:?} scan data: {} violations ({} duplicates dropped)",
            parsed.shape,
            parsed.violations.len(),
            parsed.duplicates
        );

        let compliance = parsed
            .compliance
            .as_ref()
            .and_then(|raw| parse_compliance(raw, &parsed.violations))
            .unwrap_or_else(|| synthesize_compliance(&parsed.violations));

        let metrics = compute_shared_metrics(&parsed.violations);
        let company = parse_company(company);
        let requirements = parse_requirements(requirements);

        info!(
            "Prepared context for '{}': {} violations, score {:.1} ({})",
            company.name(),
            metrics.total_violations,
            compliance.overall_score,
            compliance.level.label()
        );

        ReportContext::new(
            AnalysisData {
                violations: parsed.violations,
                compliance,
            },
            company,
            requirements,
            metrics,
        )
    }
}

fn text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Company info from an object or a bare name string
pub fn parse_company(raw: &Value) -> CompanyInfo {
    if let Some(name) = raw.as_str() {
        return CompanyInfo::new(name, "");
    }

    let name = text(raw, &["name", "company_name", "company"]).unwrap_or_default();
    let url = text(raw, &["url", "website", "domain"]).unwrap_or_default();
    let company = CompanyInfo::new(name, url)
        .with_contact(text(raw, &["contact_email", "email", "contact"]));
    match text(raw, &["locale"]) {
        Some(locale) => company.with_locale(locale),
        None => company,
    }
}

/// Requirements with audience-derived format preferences
pub fn parse_requirements(raw: &Value) -> Requirements {
    let audience = text(raw, &["audience", "target_audience"])
        .map(|a| Audience::parse(&a))
        .unwrap_or_default();
    let language = text(raw, &["language", "lang"]).unwrap_or_else(|| "en".to_string());
    Requirements::new(audience, language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplianceLevel, DetailLevel, UNNAMED_COMPANY};
    use serde_json::json;

    #[test]
    fn test_prepare_flat_scan() {
        let scan = json!({
            "violations": [
                {"code": "image-alt", "impact": "critical", "selector": "img", "wcag": "1.1.1"},
                {"code": "label", "impact": "moderate", "selector": "#q", "wcag": "3.3.2"}
            ]
        });
        let ctx = ContextPreparer::new().prepare(
            &scan,
            &json!({"name": "Acme", "url": "https://acme.test"}),
            &json!({"audience": "technical"}),
        );
        assert_eq!(ctx.metrics.total_violations, 2);
        assert_eq!(ctx.metrics.critical(), 1);
        assert_eq!(ctx.company_name(), "Acme");
        assert_eq!(ctx.requirements.format.detail_level, DetailLevel::Comprehensive);
        assert!(ctx.analysis.compliance.synthesized);
        assert!(ctx.check_consistency().is_ok());
    }

    #[test]
    fn test_duplicates_counted_once() {
        let record = json!({"code": "label", "selector": "#q", "wcag": "3.3.2"});
        let scan = json!({"violations": [record.clone(), record]});
        let ctx = ContextPreparer::new().prepare(&scan, &json!({}), &json!({}));
        assert_eq!(ctx.metrics.total_violations, 1);
        assert_eq!(ctx.analysis.violations.len(), 1);
    }

    #[test]
    fn test_missing_company_name_gets_placeholder() {
        let ctx = ContextPreparer::new().prepare(&json!([]), &json!({"name": ""}), &json!(null));
        assert_eq!(ctx.company_name(), UNNAMED_COMPANY);
        assert_eq!(ctx.requirements.language, "en");
    }

    #[test]
    fn test_zero_violations_scenario() {
        let ctx = ContextPreparer::new().prepare(&json!({"violations": []}), &json!("Acme"), &json!({}));
        assert_eq!(ctx.score(), 100.0);
        assert_eq!(ctx.analysis.compliance.level, ComplianceLevel::FullyCompliant);
    }

    #[test]
    fn test_supplied_compliance_is_honoured() {
        let scan = json!({
            "violations": [{"code": "x", "selector": "a"}],
            "compliance_metrics": {"overall_score": 72.5}
        });
        let ctx = ContextPreparer::new().prepare(&scan, &json!({}), &json!({}));
        assert_eq!(ctx.score(), 72.5);
        assert!(!ctx.analysis.compliance.synthesized);
    }

    #[test]
    fn test_inputs_not_mutated() {
        let scan = json!({"violations": [{"code": "x", "impact": "serious"}]});
        let before = scan.clone();
        let _ = ContextPreparer::new().prepare(&scan, &json!({}), &json!({}));
        assert_eq!(scan, before);
    }
}
