mod reader;
mod writer;

use std::collections::HashMap;

pub use reader::{detect_delimiter, ColumnSelection, EncodingErrors, SourceDescriptor, TableReader, TextOptions};
pub use writer::{write_delimited, write_excel, write_table};

/// A column addressed either by header name or by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

/// A header row plus data rows of trimmed string cells.
///
/// Every row holds exactly `header.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableView {
    /// Build a table, padding short rows with empty cells.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { header, rows }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column with the given header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    fn resolve(&self, column: &ColumnRef) -> Option<usize> {
        match column {
            ColumnRef::Name(name) => self.column_index(name),
            ColumnRef::Index(index) => (*index < self.header.len()).then_some(*index),
        }
    }

    /// Cell at `row`, `column`, or `""` when out of range.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Cell at `row` in the column named `name`, or `""` when absent.
    pub fn cell_by_name(&self, row: usize, name: &str) -> &str {
        self.column_index(name)
            .map(|col| self.cell(row, col))
            .unwrap_or("")
    }

    /// Map every non-empty key cell to the value cell of the same row.
    ///
    /// Later rows overwrite earlier ones. Returns an empty map when either
    /// column cannot be resolved.
    pub fn create_dictionary(
        &self,
        key_column: impl Into<ColumnRef>,
        value_column: impl Into<ColumnRef>,
    ) -> HashMap<String, String> {
        let key_column = key_column.into();
        let value_column = value_column.into();
        let (Some(key_idx), Some(value_idx)) = (self.resolve(&key_column), self.resolve(&value_column))
        else {
            tracing::warn!(?key_column, ?value_column, "failed to create dictionary, column not found");
            return HashMap::new();
        };

        self.rows
            .iter()
            .filter(|row| !row[key_idx].is_empty())
            .map(|row| (row[key_idx].clone(), row[value_idx].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TableView {
        TableView::new(
            vec!["aaa".into(), "bbb".into(), "ccc".into()],
            vec![
                vec!["1".into(), "one".into(), "x".into()],
                vec!["".into(), "none".into(), "y".into()],
                vec!["3".into(), "three".into()],
            ],
        )
    }

    #[test]
    fn test_new_pads_short_rows() {
        let table = sample_table();
        assert_eq!(table.rows()[2], vec!["3", "three", ""]);
        assert!(table.rows().iter().all(|r| r.len() == table.num_columns()));
    }

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let table = sample_table();
        assert_eq!(table.cell(0, 1), "one");
        assert_eq!(table.cell(9, 0), "");
        assert_eq!(table.cell(0, 9), "");
        assert_eq!(table.cell_by_name(0, "ccc"), "x");
        assert_eq!(table.cell_by_name(0, "zzz"), "");
    }

    #[test]
    fn test_create_dictionary_by_name() {
        let table = sample_table();
        let dict = table.create_dictionary("aaa", "bbb");
        assert_eq!(dict.len(), 2);
        assert_eq!(dict["1"], "one");
        assert_eq!(dict["3"], "three");
    }

    #[test]
    fn test_create_dictionary_by_index() {
        let table = sample_table();
        let dict = table.create_dictionary(1usize, 0usize);
        assert_eq!(dict["one"], "1");
        assert_eq!(dict["none"], "");
    }

    #[test]
    fn test_create_dictionary_unknown_column() {
        let table = sample_table();
        assert!(table.create_dictionary("aaa", "missing").is_empty());
        assert!(table.create_dictionary(7usize, 0usize).is_empty());
    }
}
