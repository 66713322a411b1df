use std::path::Path;

use super::{Command, FieldType};
use crate::error::ReadError;
use crate::table::{TableReader, TableView};

/// Level column of a parser definition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLevel {
    /// Reader configuration, never a dataset field.
    Info,
    Visit,
    Sample,
    Variable,
}

impl std::fmt::Display for NodeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeLevel::Info => write!(f, "INFO"),
            NodeLevel::Visit => write!(f, "Visit"),
            NodeLevel::Sample => write!(f, "Sample"),
            NodeLevel::Variable => write!(f, "Variable"),
        }
    }
}

impl std::str::FromStr for NodeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(NodeLevel::Info),
            "visit" => Ok(NodeLevel::Visit),
            "sample" => Ok(NodeLevel::Sample),
            "variable" => Ok(NodeLevel::Variable),
            _ => Err(format!("unknown node level '{s}'")),
        }
    }
}

/// One row of the import profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub node_level: NodeLevel,
    pub key: String,
    pub command: String,
}

/// One row of the export or semantics profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub header: String,
    pub node_level: NodeLevel,
    pub key: String,
}

/// Spreadsheet read offsets from the INFO rows, already 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetOffsets {
    pub sheet_name: Option<String>,
    pub header_row: usize,
    pub data_rows_from: usize,
    pub first_column: usize,
}

impl Default for SpreadsheetOffsets {
    fn default() -> Self {
        Self {
            sheet_name: None,
            header_row: 0,
            data_rows_from: 1,
            first_column: 0,
        }
    }
}

/// Import, export and semantics profiles extracted from a definition table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserDefinition {
    import_rows: Vec<ImportRow>,
    export_columns: Vec<ColumnInfo>,
    semantics: Vec<ColumnInfo>,
}

impl ParserDefinition {
    /// Extract the requested profile columns from a definition table.
    ///
    /// Column 0 is the node level, column 1 the key. Rows with an empty cell
    /// in a profile column are left out of that profile; INFO rows only ever
    /// reach the import profile.
    pub fn load(
        table: &TableView,
        import_column: Option<&str>,
        export_column: Option<&str>,
        semantics_column: Option<&str>,
    ) -> Self {
        let levels: Vec<Option<NodeLevel>> = (0..table.num_rows())
            .map(|row| {
                let raw = table.cell(row, 0);
                match raw.parse::<NodeLevel>() {
                    Ok(level) => Some(level),
                    Err(_) => {
                        if !raw.is_empty() {
                            tracing::warn!(row, level = raw, "skipping definition row with unknown node level");
                        }
                        None
                    }
                }
            })
            .collect();

        let profile = |column: Option<&str>| -> Vec<(NodeLevel, String, String)> {
            let Some(name) = column else {
                return Vec::new();
            };
            let Some(col) = table.column_index(name) else {
                tracing::warn!(column = name, "profile column not found in parser definition");
                return Vec::new();
            };
            levels
                .iter()
                .enumerate()
                .filter_map(|(row, level)| {
                    let level = (*level)?;
                    let value = table.cell(row, col);
                    (!value.is_empty())
                        .then(|| (level, table.cell(row, 1).to_string(), value.to_string()))
                })
                .collect()
        };

        let import_rows = profile(import_column)
            .into_iter()
            .map(|(node_level, key, command)| ImportRow {
                node_level,
                key,
                command,
            })
            .collect();
        let to_columns = |rows: Vec<(NodeLevel, String, String)>| -> Vec<ColumnInfo> {
            rows.into_iter()
                .filter(|(level, _, _)| *level != NodeLevel::Info)
                .map(|(node_level, key, header)| ColumnInfo {
                    header,
                    node_level,
                    key,
                })
                .collect()
        };

        let definition = Self {
            import_rows,
            export_columns: to_columns(profile(export_column)),
            semantics: to_columns(profile(semantics_column)),
        };
        tracing::info!(
            import_rows = definition.import_rows.len(),
            export_columns = definition.export_columns.len(),
            semantics = definition.semantics.len(),
            "parser definition loaded"
        );
        definition
    }

    /// Read a definition table from a spreadsheet (`.xlsx`, `.xls`, `.ods`) or
    /// a delimited text file and extract the profiles.
    pub fn from_file(
        path: impl AsRef<Path>,
        import_column: Option<&str>,
        export_column: Option<&str>,
        semantics_column: Option<&str>,
    ) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        let table = match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => TableReader::spreadsheet(path).read()?,
            _ => TableReader::text(path).read()?,
        };
        Ok(Self::load(&table, import_column, export_column, semantics_column))
    }

    pub fn import_rows(&self) -> &[ImportRow] {
        &self.import_rows
    }

    pub fn export_columns(&self) -> &[ColumnInfo] {
        &self.export_columns
    }

    pub fn semantics(&self) -> &[ColumnInfo] {
        &self.semantics
    }

    /// True when no profile produced any row.
    pub fn is_inert(&self) -> bool {
        self.import_rows.is_empty() && self.export_columns.is_empty() && self.semantics.is_empty()
    }

    /// Spreadsheet offsets from the INFO import rows. Non-numeric values keep
    /// the defaults.
    pub fn spreadsheet_offsets(&self) -> SpreadsheetOffsets {
        let mut offsets = SpreadsheetOffsets::default();
        let one_based = |value: &str, default: usize| -> usize {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| (v as usize).saturating_sub(1))
                .unwrap_or(default)
        };

        for row in self
            .import_rows
            .iter()
            .filter(|r| r.node_level == NodeLevel::Info)
        {
            match row.key.as_str() {
                "Excel sheet name" => offsets.sheet_name = Some(row.command.clone()),
                "Header row" => offsets.header_row = one_based(&row.command, 0),
                "First data row" => offsets.data_rows_from = one_based(&row.command, 1),
                "First column" => offsets.first_column = one_based(&row.command, 0),
                _ => {}
            }
        }
        offsets
    }

    /// Declared type of a field: a type name in the semantics profile wins
    /// over the type implied by the import command.
    pub fn declared_type(&self, level: NodeLevel, key: &str) -> Option<FieldType> {
        let from_semantics = self
            .semantics
            .iter()
            .filter(|c| c.node_level == level && c.key == key)
            .find_map(|c| c.header.parse::<FieldType>().ok());
        from_semantics.or_else(|| {
            self.import_rows
                .iter()
                .filter(|r| r.node_level == level && r.key == key)
                .find_map(|r| Command::parse(&r.command).ok()?.field_type())
        })
    }
}
