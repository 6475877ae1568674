//! Core types for quality control.

use serde::{Deserialize, Serialize};

use crate::models::Annotation;

/// Severity level of a quality finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Reduces the section's quality score
    Error,
    /// Recorded only
    Warning,
}

/// A finding attributed to one worker's section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Rule identifier (e.g., "QC-001")
    pub rule_id: String,
    /// Worker whose section the finding belongs to
    pub worker: String,
    pub severity: IssueSeverity,
    /// Human-readable description of the finding
    pub message: String,
}

impl QualityIssue {
    pub fn error(rule_id: &str, worker: &str, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            worker: worker.to_string(),
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    pub fn warning(rule_id: &str, worker: &str, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            worker: worker.to_string(),
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }

    /// Annotation attached to the owning result
    pub fn annotation(&self) -> Annotation {
        match self.severity {
            IssueSeverity::Error => Annotation::error(&self.rule_id, &self.message),
            IssueSeverity::Warning => Annotation::warning(&self.rule_id, &self.message),
        }
    }
}

/// Result of one quality-control pass over a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,
    /// Number of results whose quality score was reduced
    pub corrected: usize,
}

impl QualityReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn for_worker<'a>(&'a self, worker: &'a str) -> impl Iterator<Item = &'a QualityIssue> + 'a {
        self.issues.iter().filter(move |i| i.worker == worker)
    }

    pub fn has_rule(&self, worker: &str, rule_id: &str) -> bool {
        self.for_worker(worker).any(|i| i.rule_id == rule_id)
    }
}
