//! Phase 4: basic screening of field values.

use std::fmt;

use chrono::NaiveDate;

use super::reformat::field_type;
use crate::models::{Dataset, NodeId, NodeKind};
use crate::parser::FieldType;

/// A non-fatal problem found on one field of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningWarning {
    pub node: NodeId,
    pub level: NodeKind,
    pub key: String,
    pub value: String,
    pub message: String,
}

impl fmt::Display for ScreeningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field '{}' = '{}': {}", self.level, self.key, self.value, self.message)
    }
}

fn check_numeric(value: &str) -> Option<&'static str> {
    match value.parse::<f64>() {
        Err(_) => Some("not a number"),
        Ok(v) if !v.is_finite() => Some("not a finite number"),
        Ok(v) if v < 0.0 => Some("negative value"),
        Ok(_) => None,
    }
}

fn check_date(value: &str) -> Option<&'static str> {
    let canonical = value.len() == 10
        && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    (!canonical).then_some("not an ISO date (YYYY-MM-DD)")
}

/// Check every node and attach a message to each offending node.
pub(crate) fn screen(dataset: &mut Dataset) -> Vec<ScreeningWarning> {
    let definition = dataset.definition().clone();
    let mut warnings = Vec::new();

    for id in dataset.iter_depth_first() {
        let Some(node) = dataset.get(id) else {
            continue;
        };
        let kind = node.kind();
        for (key, value) in node.fields() {
            if value.is_empty() {
                continue;
            }
            let declared = field_type(dataset, &definition, id, key);
            let problem = match declared {
                Some(FieldType::Date) => check_date(value),
                Some(t) if t.is_numeric() && kind == NodeKind::Variable => check_numeric(value),
                _ if kind == NodeKind::Variable && key == "value" => check_numeric(value),
                _ => None,
            };
            if let Some(message) = problem {
                warnings.push(ScreeningWarning {
                    node: id,
                    level: kind,
                    key: key.clone(),
                    value: value.clone(),
                    message: message.to_string(),
                });
            }
        }
    }

    for warning in &warnings {
        tracing::warn!(%warning, "screening");
        dataset.add_warning(warning.node, warning.to_string());
    }
    tracing::info!(warnings = warnings.len(), "screening finished");
    warnings
}
