//! Context preparation: raw scan, company and requirement inputs are
//! normalized into one immutable [`ReportContext`](crate::models::ReportContext).

mod metrics;
mod preparer;
mod scan;

pub use metrics::{
    affected_users_pct, breakdown_from_violations, compute_shared_metrics, parse_compliance,
    score_from_violations, synthesize_compliance,
};
pub use preparer::{ContextPreparer, parse_company, parse_requirements};
pub use scan::{ParsedScan, ScanShape, dedupe, detect_shape, parse_scan_data};
