use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::violation::{Severity, Violation};

/// Label substituted when no company name is supplied
pub const UNNAMED_COMPANY: &str = "Unnamed Organization";

// ============================================================================
// Company / Requirements
// ============================================================================

/// Subject of the report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompanyInfo {
    name: String,
    pub url: String,
    pub contact_email: Option<String>,
    pub locale: String,
}

impl CompanyInfo {
    /// Build company info; an empty or whitespace name becomes [`UNNAMED_COMPANY`].
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            UNNAMED_COMPANY.to_string()
        } else {
            name.trim().to_string()
        };
        Self {
            name,
            url: url.into().trim().to_string(),
            contact_email: None,
            locale: "en-US".to_string(),
        }
    }

    pub fn with_contact(mut self, email: Option<String>) -> Self {
        self.contact_email = email.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        let locale = locale.into();
        if !locale.trim().is_empty() {
            self.locale = locale;
        }
        self
    }

    /// Company name, never empty
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Intended readership of the report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Executive,
    Technical,
    #[default]
    Mixed,
}

impl Audience {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "executive" | "exec" | "management" => Audience::Executive,
            "technical" | "tech" | "developer" | "developers" => Audience::Technical,
            _ => Audience::Mixed,
        }
    }
}

/// How much detail a section should carry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Summary,
    Balanced,
    Comprehensive,
}

/// Formatting preferences derived from the audience
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatPreferences {
    pub detail_level: DetailLevel,
    pub include_technical_tables: bool,
    pub include_code_references: bool,
    pub max_recommendations: usize,
    pub max_listed_violations: usize,
}

impl FormatPreferences {
    /// Lookup keyed on target audience
    pub fn for_audience(audience: Audience) -> Self {
        match audience {
            Audience::Executive => Self {
                detail_level: DetailLevel::Summary,
                include_technical_tables: false,
                include_code_references: false,
                max_recommendations: 5,
                max_listed_violations: 5,
            },
            Audience::Technical => Self {
                detail_level: DetailLevel::Comprehensive,
                include_technical_tables: true,
                include_code_references: true,
                max_recommendations: 10,
                max_listed_violations: 25,
            },
            Audience::Mixed => Self {
                detail_level: DetailLevel::Balanced,
                include_technical_tables: true,
                include_code_references: false,
                max_recommendations: 7,
                max_listed_violations: 10,
            },
        }
    }
}

/// What the requester wants from the report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirements {
    pub audience: Audience,
    pub language: String,
    pub format: FormatPreferences,
}

impl Requirements {
    pub fn new(audience: Audience, language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            audience,
            language: if language.trim().is_empty() {
                "en".to_string()
            } else {
                language
            },
            format: FormatPreferences::for_audience(audience),
        }
    }
}

impl Default for Requirements {
    fn default() -> Self {
        Self::new(Audience::Mixed, "en")
    }
}

// ============================================================================
// Compliance Metrics
// ============================================================================

/// Compliance bucket derived from the overall score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    FullyCompliant,
    SubstantiallyCompliant,
    PartiallyCompliant,
    NonCompliant,
}

impl ComplianceLevel {
    pub fn classify(score: f64, total_violations: usize, critical: usize) -> Self {
        if total_violations == 0 || (score >= 95.0 && critical == 0) {
            ComplianceLevel::FullyCompliant
        } else if score >= 80.0 {
            ComplianceLevel::SubstantiallyCompliant
        } else if score >= 50.0 {
            ComplianceLevel::PartiallyCompliant
        } else {
            ComplianceLevel::NonCompliant
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComplianceLevel::FullyCompliant => "Fully Compliant",
            ComplianceLevel::SubstantiallyCompliant => "Substantially Compliant",
            ComplianceLevel::PartiallyCompliant => "Partially Compliant",
            ComplianceLevel::NonCompliant => "Non-Compliant",
        }
    }
}

/// Score per WCAG principle, each in [0, 100]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceBreakdown {
    pub perceivable: f64,
    pub operable: f64,
    pub understandable: f64,
    pub robust: f64,
}

impl ComplianceBreakdown {
    /// (principle name, score) pairs in principle order
    pub fn dimensions(&self) -> [(&'static str, f64); 4] {
        [
            ("Perceivable", self.perceivable),
            ("Operable", self.operable),
            ("Understandable", self.understandable),
            ("Robust", self.robust),
        ]
    }
}

/// Authoritative compliance figures for a report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceMetrics {
    /// Overall score in [0, 100]
    pub overall_score: f64,
    pub level: ComplianceLevel,
    pub breakdown: ComplianceBreakdown,
    /// True when computed from violation counts rather than supplied by the scanner
    pub synthesized: bool,
}

// ============================================================================
// Shared Metrics
// ============================================================================

/// Count and share of violations at one severity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SeverityCount {
    pub count: usize,
    pub percentage: f64,
}

/// A frequently occurring rule code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeFrequency {
    pub code: String,
    pub count: usize,
    pub severity: Severity,
    pub message: String,
}

/// Aggregates precomputed once per request and shared by all workers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SharedMetrics {
    pub total_violations: usize,
    /// Findings the scanners reported as errors
    pub error_count: usize,
    /// Findings the scanners reported as warnings or notices
    pub warning_count: usize,
    pub by_severity: BTreeMap<Severity, SeverityCount>,
    /// Rough share of users likely to hit a barrier, in percent
    pub affected_users_pct: f64,
    /// Violations per reporting tool
    pub source_coverage: BTreeMap<String, usize>,
    /// Distinct criteria with at least one violation, sorted
    pub criteria_violated: Vec<String>,
    /// Most frequent codes, descending
    pub top_issues: Vec<CodeFrequency>,
}

impl SharedMetrics {
    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).map(|c| c.count).unwrap_or(0)
    }

    pub fn critical(&self) -> usize {
        self.count(Severity::Critical)
    }
}

// ============================================================================
// Report Context
// ============================================================================

/// Violations plus compliance figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisData {
    pub violations: Vec<Violation>,
    pub compliance: ComplianceMetrics,
}

/// Canonical input bundle, prepared once per report request.
///
/// Everything except `findings` is fixed at construction. `findings` is an
/// append-only map that sequential dispatch fills between workers.
#[derive(Debug, Clone, Serialize)]
pub struct ReportContext {
    pub analysis: AnalysisData,
    pub company: CompanyInfo,
    pub requirements: Requirements,
    pub metrics: SharedMetrics,
    findings: BTreeMap<String, Value>,
    pub generated_at: DateTime<Utc>,
}

impl ReportContext {
    pub fn new(
        analysis: AnalysisData,
        company: CompanyInfo,
        requirements: Requirements,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            analysis,
            company,
            requirements,
            metrics,
            findings: BTreeMap::new(),
            generated_at: Utc::now(),
        }
    }

    /// Authoritative overall compliance score
    pub fn score(&self) -> f64 {
        self.analysis.compliance.overall_score
    }

    pub fn company_name(&self) -> &str {
        self.company.name()
    }

    /// Findings recorded by earlier workers (sequential mode only)
    pub fn findings(&self) -> &BTreeMap<String, Value> {
        &self.findings
    }

    /// Append one worker's findings. Existing entries are never overwritten.
    pub fn record_findings(&mut self, worker: &str, findings: Value) -> bool {
        if self.findings.contains_key(worker) {
            return false;
        }
        self.findings.insert(worker.to_string(), findings);
        true
    }

    /// Human-readable generation date (YYYY-MM-DD)
    pub fn report_date(&self) -> String {
        self.generated_at.format("%Y-%m-%d").to_string()
    }

    /// Check the invariants later stages rely on.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.company.name().trim().is_empty() {
            return Err("company name is empty".to_string());
        }
        if self.metrics.total_violations != self.analysis.violations.len() {
            return Err(format!(
                "metrics count {} does not match {} violations",
                self.metrics.total_violations,
                self.analysis.violations.len()
            ));
        }
        let score = self.score();
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(format!("compliance score {} out of range", score));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_name_never_empty() {
        assert_eq!(CompanyInfo::new("", "").name(), UNNAMED_COMPANY);
        assert_eq!(CompanyInfo::new("   ", "").name(), UNNAMED_COMPANY);
        assert_eq!(CompanyInfo::new(" Acme ", "").name(), "Acme");
    }

    #[test]
    fn test_format_preferences_by_audience() {
        assert_eq!(
            FormatPreferences::for_audience(Audience::Executive).detail_level,
            DetailLevel::Summary
        );
        assert_eq!(
            FormatPreferences::for_audience(Audience::Technical).detail_level,
            DetailLevel::Comprehensive
        );
        assert_eq!(
            FormatPreferences::for_audience(Audience::Mixed).detail_level,
            DetailLevel::Balanced
        );
    }

    #[test]
    fn test_compliance_level_buckets() {
        assert_eq!(
            ComplianceLevel::classify(100.0, 0, 0),
            ComplianceLevel::FullyCompliant
        );
        assert_eq!(
            ComplianceLevel::classify(96.0, 2, 1),
            ComplianceLevel::SubstantiallyCompliant
        );
        assert_eq!(
            ComplianceLevel::classify(60.0, 10, 2),
            ComplianceLevel::PartiallyCompliant
        );
        assert_eq!(
            ComplianceLevel::classify(10.0, 40, 9),
            ComplianceLevel::NonCompliant
        );
    }
}
