use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// pa11y-style code segment, e.g. `Guideline1_4.1_4_3`
static PA11Y_CRITERION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([1-4])_(\d{1,2})_(\d{1,2})(?:\D|$)").expect("invalid PA11Y_CRITERION regex")
});

/// axe-style tag, e.g. `wcag143` or `wcag1410`
static AXE_CRITERION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^wcag([1-4])(\d)(\d{1,2})$").expect("invalid AXE_CRITERION regex")
});

/// Plain dotted criterion, e.g. `1.4.3`
static DOTTED_CRITERION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([1-4]\.\d{1,2}\.\d{1,2})\b").expect("invalid DOTTED_CRITERION regex")
});

/// Normalized severity of a violation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// All severities, most severe first
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Map a scanner-specific severity spelling into the closed set.
    ///
    /// Unknown spellings default to `Medium`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "critical" | "blocker" => Severity::Critical,
            "serious" | "high" | "major" | "error" => Severity::High,
            "moderate" | "medium" | "warning" => Severity::Medium,
            "minor" | "low" | "notice" | "info" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the scanner reported the finding as a hard error or a warning
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    #[default]
    Error,
    Warning,
}

impl IssueKind {
    /// Classify a scanner `type` field (`error`, `warning`, `notice`)
    pub fn from_type(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "warning" | "notice" | "info" | "incomplete" => IssueKind::Warning,
            _ => IssueKind::Error,
        }
    }
}

/// A single normalized accessibility violation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    /// Scanner rule code (e.g. "color-contrast")
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Normalized severity
    pub severity: Severity,
    /// Error or warning, as reported by the scanner
    #[serde(default)]
    pub kind: IssueKind,
    /// Dotted success-criterion reference (e.g. "1.4.3")
    pub criterion: Option<String>,
    /// CSS selector of the offending element
    pub selector: String,
    /// Tool that reported the violation
    pub source: String,
    /// Optional remediation hint or help URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Violation {
    /// Identity used for deduplication
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.code.clone(),
            self.selector.clone(),
            self.criterion.clone().unwrap_or_default(),
        )
    }

    /// WCAG principle number (1-4) derived from the criterion
    pub fn principle(&self) -> Option<u8> {
        self.criterion
            .as_deref()
            .and_then(|c| c.split('.').next())
            .and_then(|p| p.parse::<u8>().ok())
            .filter(|p| (1..=4).contains(p))
    }
}

/// Extract a dotted criterion from a scanner code, tag or free text.
///
/// Handles pa11y codes (`WCAG2AA.Principle1.Guideline1_4.1_4_3.G18`),
/// axe tags (`wcag143`) and already-dotted references (`1.4.3`).
pub fn extract_criterion(raw: &str) -> Option<String> {
    if let Some(caps) = AXE_CRITERION.captures(raw.trim()) {
        return Some(format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]));
    }
    if let Some(caps) = DOTTED_CRITERION.captures(raw) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = PA11Y_CRITERION.captures(raw) {
        return Some(format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]));
    }
    None
}
