//! Phase 3: coerce field values to their declared types.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{Dataset, NodeId, NodeKind};
use crate::parser::{FieldType, NodeLevel, ParserDefinition};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

fn level_of(kind: NodeKind) -> Option<NodeLevel> {
    match kind {
        NodeKind::Root => None,
        NodeKind::Visit => Some(NodeLevel::Visit),
        NodeKind::Sample => Some(NodeLevel::Sample),
        NodeKind::Variable => Some(NodeLevel::Variable),
    }
}

/// Declared type of `key` on node `id`.
///
/// A split measurement's `value` takes the type declared for its parameter.
pub(crate) fn field_type(
    dataset: &Dataset,
    definition: &ParserDefinition,
    id: NodeId,
    key: &str,
) -> Option<FieldType> {
    let level = level_of(dataset.get(id)?.kind())?;
    definition.declared_type(level, key).or_else(|| {
        if level == NodeLevel::Variable && key == "value" {
            definition.declared_type(level, dataset.field(id, "parameter"))
        } else {
            None
        }
    })
}

/// Normalize a decimal number: drop spaces and NBSP, decimal comma to point.
pub fn normalize_float(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().map(|_| cleaned)
}

fn normalize_integer(value: &str) -> Option<String> {
    let cleaned = normalize_float(value)?;
    let number: f64 = cleaned.parse().ok()?;
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        Some(format!("{}", number as i64))
    } else {
        Some(cleaned)
    }
}

/// Parse the accepted date and datetime forms into `YYYY-MM-DD`.
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Reformat one value. Unparseable values come back unchanged.
pub fn reformat_value(value: &str, field_type: FieldType) -> String {
    let converted = match field_type {
        FieldType::Text => Some(value.trim().to_string()),
        FieldType::Float => normalize_float(value),
        FieldType::Integer => normalize_integer(value),
        FieldType::Date => normalize_date(value),
    };
    converted.unwrap_or_else(|| value.to_string())
}

pub(crate) fn reformat(dataset: &mut Dataset) {
    let definition = dataset.definition().clone();
    let mut changed = 0usize;

    for id in dataset.iter_depth_first() {
        let keys: Vec<String> = match dataset.get(id) {
            Some(node) => node.fields().keys().cloned().collect(),
            None => continue,
        };
        for key in keys {
            let Some(field_type) = field_type(dataset, &definition, id, &key) else {
                continue;
            };
            let value = dataset.field(id, &key);
            if value.is_empty() {
                continue;
            }
            let formatted = reformat_value(value, field_type);
            if formatted != value {
                tracing::debug!(%key, from = value, to = %formatted, "reformatted field");
                dataset.set_field(id, key, formatted);
                changed += 1;
            }
        }
    }
    tracing::info!(changed, "reformat finished");
}
