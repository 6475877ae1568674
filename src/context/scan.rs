//! Parsing of raw scan data into normalized violations.
//!
//! Three shapes are accepted:
//! - aggregated: `{"results": {"<tool>": {"violations": [...]}}}` or a `results` array
//! - flat: `{"violations": [...]}` or a bare array of records
//! - legacy: `{"errors": [...], "warnings": [...]}`

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::models::{IssueKind, Severity, Violation, extract_criterion};

/// Detected layout of the scan payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanShape {
    Aggregated,
    Flat,
    Legacy,
    Empty,
}

/// Normalized scan data
#[derive(Debug, Clone)]
pub struct ParsedScan {
    pub shape: ScanShape,
    /// Deduplicated violations in first-seen order
    pub violations: Vec<Violation>,
    /// Scanner-supplied compliance object, if any
    pub compliance: Option<Value>,
    /// Records dropped as duplicates
    pub duplicates: usize,
}

/// Defaults applied to records that do not specify them
#[derive(Debug, Clone, Copy)]
struct RecordDefaults<'a> {
    source: &'a str,
    kind: IssueKind,
    severity: Severity,
}

pub fn detect_shape(scan: &Value) -> ScanShape {
    match scan {
        Value::Array(items) if items.is_empty() => ScanShape::Empty,
        Value::Array(_) => ScanShape::Flat,
        Value::Object(map) => {
            if map.contains_key("results") {
                ScanShape::Aggregated
            } else if map.contains_key("violations") {
                ScanShape::Flat
            } else if map.contains_key("errors") || map.contains_key("warnings") {
                ScanShape::Legacy
            } else {
                ScanShape::Empty
            }
        }
        _ => ScanShape::Empty,
    }
}

/// Parse any supported scan shape. Never fails; unknown payloads yield no violations.
pub fn parse_scan_data(scan: &Value) -> ParsedScan {
    let shape = detect_shape(scan);
    let mut raw = Vec::new();

    match shape {
        ScanShape::Aggregated => collect_aggregated(&scan["results"], &mut raw),
        ScanShape::Flat => {
            let records = if scan.is_array() {
                scan
            } else {
                &scan["violations"]
            };
            let source = scan
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or("scanner");
            collect_list(
                records,
                RecordDefaults {
                    source,
                    kind: IssueKind::Error,
                    severity: Severity::Medium,
                },
                &mut raw,
            );
            // Flat payloads may carry warnings alongside violations
            collect_list(
                &scan["warnings"],
                RecordDefaults {
                    source,
                    kind: IssueKind::Warning,
                    severity: Severity::Low,
                },
                &mut raw,
            );
        }
        ScanShape::Legacy => {
            let source = scan
                .get("source")
                .and_then(Value::as_str)
                .unwrap_or("legacy");
            collect_list(
                &scan["errors"],
                RecordDefaults {
                    source,
                    kind: IssueKind::Error,
                    severity: Severity::High,
                },
                &mut raw,
            );
            collect_list(
                &scan["warnings"],
                RecordDefaults {
                    source,
                    kind: IssueKind::Warning,
                    severity: Severity::Medium,
                },
                &mut raw,
            );
        }
        ScanShape::Empty => {}
    }

    let total = raw.len();
    let violations = dedupe(raw);
    let duplicates = total - violations.len();
    if duplicates > 0 {
        debug!("Dropped {} duplicate violation records", duplicates);
    }

    let compliance = scan
        .get("compliance_metrics")
        .or_else(|| scan.get("compliance"))
        .filter(|v| v.is_object())
        .cloned();

    ParsedScan {
        shape,
        violations,
        compliance,
        duplicates,
    }
}

/// Keep the first occurrence of each (code, selector, criterion) triple
pub fn dedupe(violations: Vec<Violation>) -> Vec<Violation> {
    let mut seen = HashSet::new();
    violations
        .into_iter()
        .filter(|v| seen.insert(v.dedup_key()))
        .collect()
}

fn collect_aggregated(results: &Value, out: &mut Vec<Violation>) {
    match results {
        Value::Object(by_source) => {
            for (source, entry) in by_source {
                collect_source_entry(source, entry, out);
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let source = first_str(entry, &["source", "tool", "runner"])
                    .unwrap_or_else(|| "scanner".to_string());
                collect_source_entry(&source, entry, out);
            }
        }
        _ => {}
    }
}

fn collect_source_entry(source: &str, entry: &Value, out: &mut Vec<Violation>) {
    if entry.is_array() {
        collect_list(
            entry,
            RecordDefaults {
                source,
                kind: IssueKind::Error,
                severity: Severity::Medium,
            },
            out,
        );
        return;
    }

    for (key, kind, severity) in [
        ("violations", IssueKind::Error, Severity::Medium),
        ("errors", IssueKind::Error, Severity::High),
        ("warnings", IssueKind::Warning, Severity::Medium),
    ] {
        collect_list(
            &entry[key],
            RecordDefaults {
                source,
                kind,
                severity,
            },
            out,
        );
    }
}

fn collect_list(records: &Value, defaults: RecordDefaults<'_>, out: &mut Vec<Violation>) {
    let Some(records) = records.as_array() else {
        return;
    };

    for record in records {
        // axe reports one rule with many offending nodes
        if let Some(nodes) = record.get("nodes").and_then(Value::as_array)
            && !nodes.is_empty()
        {
            for node in nodes {
                let mut violation = parse_record(record, defaults);
                violation.selector = selector_of(node).unwrap_or_default();
                out.push(violation);
            }
            continue;
        }
        out.push(parse_record(record, defaults));
    }
}

fn parse_record(record: &Value, defaults: RecordDefaults<'_>) -> Violation {
    if let Some(text) = record.as_str() {
        return Violation {
            code: "unspecified".to_string(),
            message: text.to_string(),
            severity: defaults.severity,
            kind: defaults.kind,
            criterion: extract_criterion(text),
            selector: String::new(),
            source: defaults.source.to_string(),
            help: None,
        };
    }

    let code = first_str(record, &["code", "id", "rule", "ruleId", "rule_id"])
        .unwrap_or_else(|| "unspecified".to_string());
    let message = first_str(record, &["message", "description", "title", "help"])
        .unwrap_or_else(|| code.clone());
    let type_field = first_str(record, &["type", "kind"]);

    let severity = first_str(record, &["severity", "impact", "level"])
        .or_else(|| type_field.clone())
        .map(|s| Severity::normalize(&s))
        .unwrap_or(defaults.severity);

    let kind = type_field
        .as_deref()
        .map(IssueKind::from_type)
        .unwrap_or(defaults.kind);

    let criterion = first_str(
        record,
        &["criterion", "wcag", "wcag_criterion", "sc", "identifier"],
    )
    .and_then(|c| extract_criterion(&c))
    .or_else(|| {
        record
            .get("tags")
            .and_then(Value::as_array)
            .and_then(|tags| tags.iter().filter_map(Value::as_str).find_map(extract_criterion))
    })
    .or_else(|| extract_criterion(&code));

    Violation {
        code,
        message,
        severity,
        kind,
        criterion,
        selector: selector_of(record).unwrap_or_default(),
        source: first_str(record, &["source", "runner", "tool"])
            .unwrap_or_else(|| defaults.source.to_string()),
        help: first_str(record, &["helpUrl", "help_url", "recommendation", "help"]),
    }
}

fn selector_of(record: &Value) -> Option<String> {
    for key in ["selector", "target", "element"] {
        match record.get(key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Array(parts)) => {
                let joined: Vec<String> = parts
                    .iter()
                    .map(|p| match p {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                return Some(joined.join(" "));
            }
            _ => {}
        }
    }
    None
}

fn first_str(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
