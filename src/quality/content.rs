//! Content-quality checks (QC-004 to QC-007).

use crate::models::{StructuralMarker, WorkerResult};

use super::{QualityController, QualityIssue};

fn marker_name(marker: StructuralMarker) -> &'static str {
    match marker {
        StructuralMarker::Heading => "heading",
        StructuralMarker::Paragraph => "paragraph",
        StructuralMarker::Table => "table",
        StructuralMarker::List => "list",
    }
}

impl QualityController {
    /// QC-004 / QC-005: section length bounds
    pub fn check_length(&self, result: &WorkerResult) -> Option<QualityIssue> {
        let length = result.metadata.characters;
        if length < self.config.min_content_length {
            Some(QualityIssue::error(
                "QC-004",
                &result.worker,
                format!(
                    "content is {} characters, below the minimum of {}",
                    length, self.config.min_content_length
                ),
            ))
        } else if length > self.config.max_content_length {
            Some(QualityIssue::error(
                "QC-005",
                &result.worker,
                format!(
                    "content is {} characters, above the maximum of {}",
                    length, self.config.max_content_length
                ),
            ))
        } else {
            None
        }
    }

    /// QC-006: required structural markers for the section type
    pub fn check_markers(&self, result: &WorkerResult) -> Vec<QualityIssue> {
        result
            .section
            .required_markers()
            .iter()
            .filter(|marker| !result.metadata.has(**marker))
            .map(|marker| {
                QualityIssue::warning(
                    "QC-006",
                    &result.worker,
                    format!("section has no {} element", marker_name(*marker)),
                )
            })
            .collect()
    }

    /// QC-007: the section's own quality score
    pub fn check_own_quality(&self, result: &WorkerResult) -> Option<QualityIssue> {
        (result.quality_score < self.quality_threshold).then(|| {
            QualityIssue::warning(
                "QC-007",
                &result.worker,
                format!(
                    "quality score {:.2} is below the threshold of {:.2}",
                    result.quality_score, self.quality_threshold
                ),
            )
        })
    }
}
