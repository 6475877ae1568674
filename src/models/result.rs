use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StatusTransitionError;

static HEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<h[1-6][\s>]").expect("invalid HEADING_TAG regex"));
static MARKDOWN_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+\S").expect("invalid MARKDOWN_HEADING regex"));
static PARAGRAPH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p[\s>]").expect("invalid PARAGRAPH_TAG regex"));
static TABLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<table[\s>]").expect("invalid TABLE_TAG regex"));
static LIST_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<[uo]l[\s>]").expect("invalid LIST_TAG regex"));
static LIST_ITEM_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<li[\s>]").expect("invalid LIST_ITEM_TAG regex"));
static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("invalid MARKUP_TAG regex"));

/// Remove markup tags, leaving text content separated by spaces
pub fn strip_markup(content: &str) -> String {
    MARKUP_TAG.replace_all(content, " ").into_owned()
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the character references produced by common HTML escapers
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&#x2f;", "/")
        .replace("&#x2F;", "/")
        .replace("&#47;", "/")
        .replace("&amp;", "&")
}

/// Case-insensitive check that `needle` appears in the text of `content`
pub fn mentions(content: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return true;
    }
    unescape_html(content)
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

// ============================================================================
// Sections
// ============================================================================

/// Structural marker a section is expected to contain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StructuralMarker {
    Heading,
    Paragraph,
    Table,
    List,
}

/// Sections of the final document, declared in composition order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    ExecutiveSummary,
    ComplianceAssessment,
    TechnicalAnalysis,
    RemediationPlan,
    Recommendations,
    Footer,
}

impl SectionKind {
    /// Fixed semantic order of the composed document
    pub const ORDER: [SectionKind; 7] = [
        SectionKind::Header,
        SectionKind::ExecutiveSummary,
        SectionKind::ComplianceAssessment,
        SectionKind::TechnicalAnalysis,
        SectionKind::RemediationPlan,
        SectionKind::Recommendations,
        SectionKind::Footer,
    ];

    /// Sections produced by workers (everything except header and footer)
    pub const CONTENT: [SectionKind; 5] = [
        SectionKind::ExecutiveSummary,
        SectionKind::ComplianceAssessment,
        SectionKind::TechnicalAnalysis,
        SectionKind::RemediationPlan,
        SectionKind::Recommendations,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SectionKind::Header => "header",
            SectionKind::ExecutiveSummary => "executive_summary",
            SectionKind::ComplianceAssessment => "compliance_assessment",
            SectionKind::TechnicalAnalysis => "technical_analysis",
            SectionKind::RemediationPlan => "remediation_plan",
            SectionKind::Recommendations => "recommendations",
            SectionKind::Footer => "footer",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ORDER.iter().copied().find(|s| s.id() == id)
    }

    /// Heading title rendered for the section
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Header => "Accessibility Report",
            SectionKind::ExecutiveSummary => "Executive Summary",
            SectionKind::ComplianceAssessment => "Compliance Assessment",
            SectionKind::TechnicalAnalysis => "Technical Analysis",
            SectionKind::RemediationPlan => "Remediation Plan",
            SectionKind::Recommendations => "Recommendations",
            SectionKind::Footer => "Report Information",
        }
    }

    /// Header and footer frame the document and are not produced by workers
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, SectionKind::Header | SectionKind::Footer)
    }

    /// Position in the composed document
    pub fn position(&self) -> usize {
        Self::ORDER.iter().position(|s| s == self).unwrap_or(usize::MAX)
    }

    pub fn required_markers(&self) -> &'static [StructuralMarker] {
        use StructuralMarker::*;
        match self {
            SectionKind::ComplianceAssessment | SectionKind::TechnicalAnalysis => {
                &[Heading, Paragraph, Table]
            }
            SectionKind::RemediationPlan | SectionKind::Recommendations => {
                &[Heading, Paragraph, List]
            }
            SectionKind::ExecutiveSummary => &[Heading, Paragraph],
            SectionKind::Header | SectionKind::Footer => &[],
        }
    }
}

/// Dispatch priority. Declared highest first so `Ord` sorts critical first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

// ============================================================================
// Worker Status
// ============================================================================

/// Lifecycle of a single worker execution.
///
/// ```text
/// Idle -> Processing -> Completed | Failed | TimedOut
/// Failed | TimedOut | Completed -> Fallback
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
    TimedOut,
    Fallback,
}

impl WorkerStatus {
    /// Whether `self -> next` is an edge of the transition table
    pub fn can_transition_to(self, next: WorkerStatus) -> bool {
        use WorkerStatus::*;
        matches!(
            (self, next),
            (Idle, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, TimedOut)
                | (Completed, Fallback)
                | (Failed, Fallback)
                | (TimedOut, Fallback)
        )
    }

    pub fn transition(self, next: WorkerStatus) -> Result<WorkerStatus, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// Failed and timed-out results must be replaced before composition
    pub fn needs_fallback(self) -> bool {
        matches!(self, WorkerStatus::Failed | WorkerStatus::TimedOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Processing => "processing",
            WorkerStatus::Completed => "completed",
            WorkerStatus::Failed => "failed",
            WorkerStatus::TimedOut => "timed_out",
            WorkerStatus::Fallback => "fallback",
        }
    }
}

// ============================================================================
// Annotations / Metadata
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationSeverity {
    Error,
    Warning,
}

/// An error or warning attached to a worker result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub severity: AnnotationSeverity,
    /// Rule identifier (e.g. "QC-004", "WORKER-TIMEOUT")
    pub rule: String,
    pub message: String,
}

impl Annotation {
    pub fn error(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: AnnotationSeverity::Error,
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn warning(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: AnnotationSeverity::Warning,
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

/// Structural counts extracted from section content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContentMetadata {
    pub characters: usize,
    pub words: usize,
    pub headings: usize,
    pub paragraphs: usize,
    pub tables: usize,
    pub lists: usize,
    pub list_items: usize,
}

impl ContentMetadata {
    pub fn extract(content: &str) -> Self {
        Self {
            characters: content.chars().count(),
            words: strip_markup(content).split_whitespace().count(),
            headings: HEADING_TAG.find_iter(content).count()
                + MARKDOWN_HEADING.find_iter(content).count(),
            paragraphs: PARAGRAPH_TAG.find_iter(content).count(),
            tables: TABLE_TAG.find_iter(content).count(),
            lists: LIST_TAG.find_iter(content).count(),
            list_items: LIST_ITEM_TAG.find_iter(content).count(),
        }
    }

    pub fn has(&self, marker: StructuralMarker) -> bool {
        match marker {
            StructuralMarker::Heading => self.headings > 0,
            StructuralMarker::Paragraph => self.paragraphs > 0,
            StructuralMarker::Table => self.tables > 0,
            StructuralMarker::List => self.lists > 0,
        }
    }
}

// ============================================================================
// Worker Result
// ============================================================================

/// Outcome of one worker for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub worker: String,
    pub section: SectionKind,
    pub content: String,
    pub metadata: ContentMetadata,
    /// Heuristic quality in [0, 1]
    pub quality_score: f64,
    pub status: WorkerStatus,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub errors: Vec<Annotation>,
    pub warnings: Vec<Annotation>,
}

impl WorkerResult {
    pub fn new(
        worker: impl Into<String>,
        section: SectionKind,
        content: String,
        status: WorkerStatus,
        quality_score: f64,
        execution_time: Duration,
    ) -> Self {
        let metadata = ContentMetadata::extract(&content);
        Self {
            worker: worker.into(),
            section,
            content,
            metadata,
            quality_score: clamp_unit(quality_score),
            status,
            execution_time,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.status == WorkerStatus::Fallback
    }

    pub fn add_error(&mut self, annotation: Annotation) {
        self.errors.push(annotation);
    }

    pub fn add_warning(&mut self, annotation: Annotation) {
        self.warnings.push(annotation);
    }

    pub fn set_quality(&mut self, score: f64) {
        self.quality_score = clamp_unit(score);
    }
}

/// Clamp to [0, 1], mapping NaN to 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transition_table() {
        use WorkerStatus::*;
        assert!(Idle.can_transition_to(Processing));
        assert!(Processing.can_transition_to(TimedOut));
        assert!(Failed.can_transition_to(Fallback));
        assert!(Completed.can_transition_to(Fallback));

        // No retry edge and no skipping Processing
        assert!(!Failed.can_transition_to(Processing));
        assert!(!TimedOut.can_transition_to(Processing));
        assert!(!Idle.can_transition_to(Completed));
        assert!(!Fallback.can_transition_to(Completed));
    }

    #[test]
    fn test_illegal_transition_reports_edge() {
        let err = WorkerStatus::Fallback
            .transition(WorkerStatus::Processing)
            .unwrap_err();
        assert_eq!(err.from, WorkerStatus::Fallback);
        assert_eq!(err.to, WorkerStatus::Processing);
    }

    #[test]
    fn test_priority_ordering() {
        let mut priorities = vec![
            WorkerPriority::Low,
            WorkerPriority::Critical,
            WorkerPriority::Normal,
            WorkerPriority::High,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                WorkerPriority::Critical,
                WorkerPriority::High,
                WorkerPriority::Normal,
                WorkerPriority::Low
            ]
        );
    }

    #[test]
    fn test_content_metadata_counts() {
        let content = "<h2>Title</h2><p>One</p><p>Two</p><table><tr><th scope=\"col\">A</th></tr></table><ul><li>x</li><li>y</li></ul>";
        let meta = ContentMetadata::extract(content);
        assert_eq!(meta.headings, 1);
        assert_eq!(meta.paragraphs, 2);
        assert_eq!(meta.tables, 1);
        assert_eq!(meta.lists, 1);
        assert_eq!(meta.list_items, 2);
    }

    #[test]
    fn test_section_order_and_positions() {
        assert_eq!(SectionKind::Header.position(), 0);
        assert_eq!(SectionKind::Footer.position(), 6);
        assert!(SectionKind::ExecutiveSummary < SectionKind::Recommendations);
        assert_eq!(
            SectionKind::from_id("remediation_plan"),
            Some(SectionKind::RemediationPlan)
        );
    }

    #[test]
    fn test_quality_clamped_on_construction() {
        let result = WorkerResult::new(
            "w",
            SectionKind::ExecutiveSummary,
            String::new(),
            WorkerStatus::Completed,
            1.7,
            Duration::ZERO,
        );
        assert_eq!(result.quality_score, 1.0);
    }
}
