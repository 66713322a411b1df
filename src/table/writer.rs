use std::path::Path;

use rust_xlsxwriter::Workbook;

use super::TableView;
use crate::error::ToolboxError;

/// Write a table as delimited text, header first.
pub fn write_delimited(
    table: &TableView,
    path: impl AsRef<Path>,
    delimiter: u8,
) -> Result<(), ToolboxError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path.as_ref())?;

    wtr.write_record(table.header())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write a table to an Excel (.xlsx) file with the header on the first row.
pub fn write_excel(table: &TableView, path: impl AsRef<Path>) -> Result<(), ToolboxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in table.header().iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet.write_string(row_idx as u32 + 1, col as u16, value)?;
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}

/// Write by file extension: `.xlsx` as a workbook, `.csv` comma separated,
/// anything else tab separated.
pub fn write_table(table: &TableView, path: impl AsRef<Path>) -> Result<(), ToolboxError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xlsx" => write_excel(table, path),
        "csv" => write_delimited(table, path, b','),
        _ => write_delimited(table, path, b'\t'),
    }
}
