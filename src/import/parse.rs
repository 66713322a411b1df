//! Phase 1: structural parse of flat rows into the dataset tree.

use crate::error::ImportError;
use crate::models::{Dataset, NodeId, NodeKind};
use crate::parser::{Command, NodeLevel, ParserDefinition};
use crate::table::TableView;

/// An import row with its command parsed and its source column resolved.
struct BoundRow {
    level: NodeKind,
    key: String,
    command: Command,
    /// Position in the source table, `None` for literals and missing columns.
    column: Option<usize>,
}

impl BoundRow {
    fn value<'a>(&'a self, table: &'a TableView, row: usize) -> &'a str {
        match (&self.command, self.column) {
            (Command::Literal(text), _) => text,
            (_, Some(col)) => table.cell(row, col),
            (_, None) => "",
        }
    }

    fn is_promote(&self) -> bool {
        matches!(self.command, Command::Promote { .. })
    }
}

fn bind_rows(table: &TableView, definition: &ParserDefinition) -> Result<Vec<BoundRow>, ImportError> {
    let mut bound = Vec::new();
    for row in definition.import_rows() {
        let Some(level) = NodeKind::from_level(row.node_level) else {
            continue;
        };
        let command = Command::parse(&row.command).map_err(|message| {
            tracing::debug!(key = %row.key, %message, "rejected import command");
            ImportError::InvalidCommand {
                key: row.key.clone(),
                command: row.command.clone(),
            }
        })?;

        let column = match command.column() {
            None => None,
            Some(name) => match table.column_index(name) {
                Some(col) => Some(col),
                None if row.node_level == NodeLevel::Variable => {
                    tracing::debug!(column = name, key = %row.key, "variable column missing, using empty values");
                    None
                }
                None => {
                    return Err(ImportError::MissingColumn {
                        column: name.to_string(),
                    })
                }
            },
        };

        bound.push(BoundRow {
            level,
            key: row.key.clone(),
            command,
            column,
        });
    }
    Ok(bound)
}

/// Set each field of `rows` on `id` unless the node already holds a value.
fn fill_empty_fields(
    dataset: &mut Dataset,
    id: NodeId,
    rows: &[&BoundRow],
    table: &TableView,
    row: usize,
) {
    for b in rows {
        if dataset.field(id, &b.key).is_empty() {
            dataset.set_field(id, b.key.as_str(), b.value(table, row));
        }
    }
}

/// Build the Visit → Sample → Variable tree from the rows of `table`.
///
/// A new Visit starts whenever the tuple of Visit-level values changes, a new
/// Sample whenever the Sample-level tuple changes. Promoted fields take part
/// in neither tuple.
/// Each row adds at most one Variable, only when one of its column-sourced
/// Variable values is non-empty.
pub(crate) fn parse_rows(
    table: &TableView,
    definition: &ParserDefinition,
    dataset: &mut Dataset,
) -> Result<(), ImportError> {
    let bound = bind_rows(table, definition)?;
    let at_level = |kind: NodeKind| -> Vec<&BoundRow> { bound.iter().filter(|b| b.level == kind).collect() };
    let visit_rows = at_level(NodeKind::Visit);
    let sample_rows = at_level(NodeKind::Sample);
    let variable_rows = at_level(NodeKind::Variable);

    let mut current_visit: Option<(Vec<&str>, NodeId)> = None;
    let mut current_sample: Option<(Vec<&str>, NodeId)> = None;

    for row in 0..table.num_rows() {
        let visit_marker: Vec<&str> = visit_rows
            .iter()
            .filter(|b| !b.is_promote())
            .map(|b| b.value(table, row))
            .collect();
        let visit = match &current_visit {
            Some((marker, id)) if *marker == visit_marker => *id,
            _ => {
                let id = dataset.add_visit();
                current_visit = Some((visit_marker, id));
                current_sample = None;
                id
            }
        };
        fill_empty_fields(dataset, visit, &visit_rows, table, row);

        let sample_marker: Vec<&str> = sample_rows
            .iter()
            .filter(|b| !b.is_promote())
            .map(|b| b.value(table, row))
            .collect();
        let sample = match &current_sample {
            Some((marker, id)) if *marker == sample_marker => *id,
            _ => {
                let Some(id) = dataset.add_child(visit) else {
                    continue;
                };
                current_sample = Some((sample_marker, id));
                id
            }
        };
        fill_empty_fields(dataset, sample, &sample_rows, table, row);

        // Promoted values end up on the sample, so they do not make a variable.
        let has_content = variable_rows
            .iter()
            .any(|b| b.column.is_some() && !b.is_promote() && !b.value(table, row).is_empty());
        if !has_content {
            continue;
        }
        if let Some(variable) = dataset.add_child(sample) {
            for b in &variable_rows {
                dataset.set_field(variable, b.key.as_str(), b.value(table, row));
            }
        }
    }

    tracing::info!(
        visits = dataset.num_visits(),
        samples = dataset.num_samples(),
        variables = dataset.num_variables(),
        "structural parse finished"
    );
    Ok(())
}
