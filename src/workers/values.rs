use serde_json::{Value, json};

use crate::models::{DetailLevel, ReportContext, Severity};

/// Values every section template can rely on.
///
/// Numbers that end up in prose are preformatted here so all sections print
/// the authoritative figures identically.
pub fn context_values(ctx: &ReportContext) -> Value {
    let metrics = &ctx.metrics;
    let format = &ctx.requirements.format;
    json!({
        "company": {
            "name": ctx.company_name(),
            "url": ctx.company.url,
            "contact": ctx.company.contact_email,
        },
        "report_date": ctx.report_date(),
        "score": one_decimal(ctx.score()),
        "level": ctx.analysis.compliance.level.label(),
        "synthesized": ctx.analysis.compliance.synthesized,
        "total": metrics.total_violations,
        "errors": metrics.error_count,
        "warnings": metrics.warning_count,
        "critical": metrics.count(Severity::Critical),
        "high": metrics.count(Severity::High),
        "medium": metrics.count(Severity::Medium),
        "low": metrics.count(Severity::Low),
        "affected_users": one_decimal(metrics.affected_users_pct),
        "audience": ctx.requirements.audience,
        "detail_level": detail_level(format.detail_level),
        "include_tables": format.include_technical_tables,
        "include_code": format.include_code_references,
        "max_recommendations": format.max_recommendations,
        "findings": ctx.findings(),
        "prior_sections": ctx.findings().len(),
    })
}

/// Merge section-specific keys into the shared values
pub(super) fn with_extra(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

pub(super) fn one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}

fn detail_level(level: DetailLevel) -> &'static str {
    match level {
        DetailLevel::Summary => "summary",
        DetailLevel::Balanced => "balanced",
        DetailLevel::Comprehensive => "comprehensive",
    }
}
