//! Reading of delimited text, spreadsheets and text entries in zip archives
//! into a uniform [`TableView`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, DataType, Reader};
use encoding_rs::{Encoding, UTF_8};

use super::TableView;
use crate::error::ReadError;

/// What to do with bytes that are not valid in the chosen encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingErrors {
    /// Fail the read with [`ReadError::Encoding`].
    #[default]
    Strict,
    /// Substitute U+FFFD.
    Replace,
    /// Drop the offending bytes.
    Ignore,
}

impl std::str::FromStr for EncodingErrors {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(EncodingErrors::Strict),
            "replace" => Ok(EncodingErrors::Replace),
            "ignore" => Ok(EncodingErrors::Ignore),
            _ => Err(format!("unknown encoding error policy '{s}'")),
        }
    }
}

/// Options shared by delimited text files and archive entries.
#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    pub encoding: &'static Encoding,
    pub errors: EncodingErrors,
    /// Field delimiter; `None` autodetects from the header row.
    pub delimiter: Option<u8>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            encoding: UTF_8,
            errors: EncodingErrors::Strict,
            delimiter: None,
        }
    }
}

impl TextOptions {
    /// Options for a WHATWG encoding label such as `"windows-1252"` or `"cp1252"`.
    pub fn with_encoding_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(|encoding| Self {
            encoding,
            ..Self::default()
        })
    }
}

/// Where a table comes from.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    Text {
        path: PathBuf,
        options: TextOptions,
    },
    Spreadsheet {
        path: PathBuf,
        /// `None` reads the first sheet.
        sheet: Option<String>,
    },
    ArchiveEntry {
        archive: PathBuf,
        entry: String,
        options: TextOptions,
    },
}

/// Column subset requested by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelection {
    #[default]
    All,
    ByName(Vec<String>),
    ByIndex(Vec<usize>),
}

/// Builder-style reader producing a [`TableView`].
///
/// Row indices are physical, 0-based rows of the source. The header row
/// defaults to 0 and data starts at row 1.
#[derive(Debug, Clone)]
pub struct TableReader {
    source: SourceDescriptor,
    header_row: usize,
    data_rows_from: usize,
    data_rows_to: Option<usize>,
    first_column: usize,
    columns_by_name: Option<Vec<String>>,
    columns_by_index: Option<Vec<usize>>,
}

impl TableReader {
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            header_row: 0,
            data_rows_from: 1,
            data_rows_to: None,
            first_column: 0,
            columns_by_name: None,
            columns_by_index: None,
        }
    }

    pub fn text(path: impl AsRef<Path>) -> Self {
        Self::new(SourceDescriptor::Text {
            path: path.as_ref().to_path_buf(),
            options: TextOptions::default(),
        })
    }

    pub fn spreadsheet(path: impl AsRef<Path>) -> Self {
        Self::new(SourceDescriptor::Spreadsheet {
            path: path.as_ref().to_path_buf(),
            sheet: None,
        })
    }

    pub fn archive_entry(archive: impl AsRef<Path>, entry: impl Into<String>) -> Self {
        Self::new(SourceDescriptor::ArchiveEntry {
            archive: archive.as_ref().to_path_buf(),
            entry: entry.into(),
            options: TextOptions::default(),
        })
    }

    /// Text options for text and archive sources; ignored for spreadsheets.
    pub fn text_options(mut self, new_options: TextOptions) -> Self {
        match &mut self.source {
            SourceDescriptor::Text { options, .. } | SourceDescriptor::ArchiveEntry { options, .. } => {
                *options = new_options;
            }
            SourceDescriptor::Spreadsheet { .. } => {}
        }
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        match &mut self.source {
            SourceDescriptor::Text { options, .. } | SourceDescriptor::ArchiveEntry { options, .. } => {
                options.delimiter = Some(delimiter);
            }
            SourceDescriptor::Spreadsheet { .. } => {}
        }
        self
    }

    /// Sheet to read from a spreadsheet source.
    pub fn sheet(mut self, name: impl Into<String>) -> Self {
        if let SourceDescriptor::Spreadsheet { sheet, .. } = &mut self.source {
            *sheet = Some(name.into());
        }
        self
    }

    pub fn header_row(mut self, row: usize) -> Self {
        self.header_row = row;
        self
    }

    pub fn data_rows_from(mut self, row: usize) -> Self {
        self.data_rows_from = row;
        self
    }

    /// Inclusive last physical row to read.
    pub fn data_rows_to(mut self, row: Option<usize>) -> Self {
        self.data_rows_to = row;
        self
    }

    /// Columns left of this index are ignored in every row.
    pub fn first_column(mut self, column: usize) -> Self {
        self.first_column = column;
        self
    }

    /// Select and order columns by header name. Takes precedence over
    /// selection by index.
    pub fn select_columns_by_name<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_by_name = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn select_columns_by_index(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.columns_by_index = Some(indices.into_iter().collect());
        self
    }

    /// The column selection that will be applied.
    pub fn selection(&self) -> ColumnSelection {
        match (&self.columns_by_name, &self.columns_by_index) {
            (Some(names), _) => ColumnSelection::ByName(names.clone()),
            (None, Some(indices)) => ColumnSelection::ByIndex(indices.clone()),
            (None, None) => ColumnSelection::All,
        }
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    /// Read the source into a table.
    pub fn read(&self) -> Result<TableView, ReadError> {
        let table = match &self.source {
            SourceDescriptor::Text { path, options } => {
                let bytes = read_file_bytes(path)?;
                let text = decode(&bytes, options, path)?;
                self.read_delimited(&text, options)?
            }
            SourceDescriptor::ArchiveEntry {
                archive,
                entry,
                options,
            } => {
                let bytes = read_archive_entry(archive, entry)?;
                let text = decode(&bytes, options, archive)?;
                self.read_delimited(&text, options)?
            }
            SourceDescriptor::Spreadsheet { path, sheet } => {
                self.read_spreadsheet(path, sheet.as_deref())?
            }
        };
        tracing::info!(
            rows = table.num_rows(),
            columns = table.num_columns(),
            "table read"
        );
        Ok(table)
    }

    fn read_delimited(&self, text: &str, options: &TextOptions) -> Result<TableView, ReadError> {
        let delimiter = match options.delimiter {
            Some(d) => d,
            None => detect_delimiter(text.lines().nth(self.header_row).unwrap_or("")),
        };
        tracing::debug!(delimiter = %(delimiter as char).escape_debug(), "field delimiter");

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut physical_rows = Vec::new();
        for (counter, result) in rdr.records().enumerate() {
            let record = result?;
            let index = record
                .position()
                .map(|p| p.line().saturating_sub(1) as usize)
                .unwrap_or(counter);
            if self.data_rows_to.is_some_and(|to| index > to) {
                break;
            }
            physical_rows.push((index, record.iter().map(|c| c.trim().to_string()).collect()));
        }
        Ok(self.assemble(physical_rows))
    }

    fn read_spreadsheet(&self, path: &Path, sheet: Option<&str>) -> Result<TableView, ReadError> {
        if !path.exists() {
            return Err(ReadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let mut workbook = open_workbook_auto(path).map_err(|e| ReadError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = match sheet {
            Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
            Some(name) => {
                return Err(ReadError::SheetNotFound {
                    path: path.to_path_buf(),
                    sheet: name.to_string(),
                })
            }
            None => sheet_names.first().cloned().ok_or_else(|| ReadError::Malformed {
                path: path.to_path_buf(),
                message: "workbook contains no sheets".to_string(),
            })?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ReadError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        // The range begins at the first used cell, not at A1.
        let (start_row, start_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut physical_rows = Vec::new();
        for (offset, row) in range.rows().enumerate() {
            let index = start_row + offset;
            if self.data_rows_to.is_some_and(|to| index > to) {
                break;
            }
            let mut cells = vec![String::new(); start_col];
            cells.extend(row.iter().map(cell_to_string));
            physical_rows.push((index, cells));
        }
        Ok(self.assemble(physical_rows))
    }

    /// Split physical rows into header and data, then apply the column selection.
    fn assemble(&self, physical_rows: Vec<(usize, Vec<String>)>) -> TableView {
        let mut header = Vec::new();
        let mut data_rows = Vec::new();

        for (index, cells) in physical_rows {
            let cells: Vec<String> = cells.into_iter().skip(self.first_column).collect();
            if index == self.header_row {
                header = cells;
            } else if index >= self.data_rows_from {
                if cells.iter().all(|c| c.is_empty()) {
                    continue;
                }
                data_rows.push(cells);
            }
        }

        let plan: Option<Vec<Option<usize>>> = match self.selection() {
            ColumnSelection::ByName(names) => {
                let plan = names
                    .iter()
                    .map(|name| header.iter().position(|h| h == name))
                    .collect();
                header = names;
                Some(plan)
            }
            ColumnSelection::ByIndex(indices) => {
                header = indices
                    .iter()
                    .map(|&i| header.get(i).cloned().unwrap_or_default())
                    .collect();
                Some(indices.into_iter().map(Some).collect())
            }
            ColumnSelection::All => None,
        };

        match plan {
            Some(plan) => {
                let rows = data_rows
                    .into_iter()
                    .map(|row| {
                        plan.iter()
                            .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                            .collect()
                    })
                    .collect();
                TableView::new(header, rows)
            }
            None => {
                // Widen the header for rows carrying content beyond it; trailing
                // empty cells are dropped.
                let used_width = data_rows
                    .iter()
                    .map(|row| row.iter().rposition(|c| !c.is_empty()).map_or(0, |p| p + 1))
                    .max()
                    .unwrap_or(0);
                if used_width > header.len() {
                    tracing::debug!(
                        header = header.len(),
                        used_width,
                        "rows wider than header, adding unnamed columns"
                    );
                    header.resize(used_width, String::new());
                }
                let width = header.len();
                let rows = data_rows
                    .into_iter()
                    .map(|mut row| {
                        row.truncate(width);
                        row
                    })
                    .collect();
                TableView::new(header, rows)
            }
        }
    }
}

/// Pick the field delimiter from header row content: tab, then semicolon,
/// then comma, falling back to tab.
pub fn detect_delimiter(header_line: &str) -> u8 {
    if header_line.contains('\t') {
        b'\t'
    } else if header_line.contains(';') {
        b';'
    } else if header_line.contains(',') {
        b','
    } else {
        b'\t'
    }
}

fn read_file_bytes(path: &Path) -> Result<Vec<u8>, ReadError> {
    std::fs::read(path).map_err(|e| not_found_or_io(e, path))
}

fn not_found_or_io(e: std::io::Error, path: &Path) -> ReadError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ReadError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        ReadError::Io(e)
    }
}

fn read_archive_entry(archive: &Path, entry: &str) -> Result<Vec<u8>, ReadError> {
    let file = File::open(archive).map_err(|e| not_found_or_io(e, archive))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| ReadError::Malformed {
        path: archive.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut zip_entry = match zip.by_name(entry) {
        Ok(zip_entry) => zip_entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ReadError::EntryNotFound {
                archive: archive.to_path_buf(),
                entry: entry.to_string(),
            })
        }
        Err(e) => {
            return Err(ReadError::Malformed {
                path: archive.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    let mut bytes = Vec::new();
    zip_entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn decode(bytes: &[u8], options: &TextOptions, path: &Path) -> Result<String, ReadError> {
    let (text, had_errors) = options.encoding.decode_with_bom_removal(bytes);
    if !had_errors {
        return Ok(text.into_owned());
    }
    match options.errors {
        EncodingErrors::Strict => Err(ReadError::Encoding {
            path: path.to_path_buf(),
            encoding: options.encoding.name(),
        }),
        EncodingErrors::Replace => {
            tracing::warn!(path = %path.display(), "invalid bytes replaced while decoding");
            Ok(text.into_owned())
        }
        EncodingErrors::Ignore => Ok(text.replace('\u{FFFD}', "")),
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string().trim().to_string(),
    }
}
