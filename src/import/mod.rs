//! Parser-definition-driven import of flat tables into a [`Dataset`].

mod parse;
mod reformat;
mod reorganize;
mod screening;

use std::path::Path;

pub use reformat::{normalize_date, normalize_float, reformat_value};
pub use screening::ScreeningWarning;

use crate::error::ImportError;
use crate::models::Dataset;
use crate::parser::ParserDefinition;
use crate::table::{TableReader, TableView, TextOptions};

/// A successfully built dataset plus the non-fatal screening findings.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub dataset: Dataset,
    pub warnings: Vec<ScreeningWarning>,
}

/// Run the four import phases over `table`.
///
/// Phases run in fixed order, each over the whole tree: structural parse,
/// reorganize, reformat, screening.
pub fn import(
    table: &TableView,
    definition: &ParserDefinition,
    name: &str,
) -> Result<ImportOutcome, ImportError> {
    tracing::info!(dataset = name, rows = table.num_rows(), "import started");
    let mut dataset = Dataset::with_definition(name, definition.clone());

    parse::parse_rows(table, definition, &mut dataset)?;
    reorganize::reorganize(&mut dataset);
    reformat::reformat(&mut dataset);
    let warnings = screening::screen(&mut dataset);

    if dataset.num_variables() == 0 {
        tracing::warn!(dataset = name, "import produced no variables");
        return Err(ImportError::EmptyResult {
            dataset: Box::new(dataset),
        });
    }
    Ok(ImportOutcome { dataset, warnings })
}

/// Re-run the reorganize phase on an imported dataset. A no-op once the
/// import has completed.
pub fn reorganize(dataset: &mut Dataset) {
    reorganize::reorganize(dataset);
}

/// Imports source files with one parser definition.
#[derive(Debug, Clone)]
pub struct ImportManager {
    definition: ParserDefinition,
}

impl ImportManager {
    pub fn new(definition: ParserDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &ParserDefinition {
        &self.definition
    }

    pub fn import_table(&self, table: &TableView, name: &str) -> Result<ImportOutcome, ImportError> {
        import(table, &self.definition, name)
    }

    /// Import a delimited text file. The header is the first row.
    pub fn import_text_file(
        &self,
        path: impl AsRef<Path>,
        options: TextOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let path = path.as_ref();
        let table = TableReader::text(path).text_options(options).read()?;
        self.import_table(&table, &dataset_name(path))
    }

    /// Import a spreadsheet using the sheet and offsets from the INFO rows.
    pub fn import_excel_file(&self, path: impl AsRef<Path>) -> Result<ImportOutcome, ImportError> {
        let path = path.as_ref();
        let offsets = self.definition.spreadsheet_offsets();
        let mut reader = TableReader::spreadsheet(path)
            .header_row(offsets.header_row)
            .data_rows_from(offsets.data_rows_from)
            .first_column(offsets.first_column);
        if let Some(sheet) = offsets.sheet_name {
            reader = reader.sheet(sheet);
        }
        let table = reader.read()?;
        self.import_table(&table, &dataset_name(path))
    }

    /// Import by file extension: spreadsheets through
    /// [`import_excel_file`](Self::import_excel_file), anything else as text.
    pub fn import_file(
        &self,
        path: impl AsRef<Path>,
        options: TextOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => self.import_excel_file(path),
            _ => self.import_text_file(path, options),
        }
    }
}

fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string()
}
