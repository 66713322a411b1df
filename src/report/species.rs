use std::cmp::Ordering;
use std::collections::HashMap;

use super::ReportMode;
use crate::analysis::format_number;
use crate::models::{Dataset, NodeKind};
use crate::table::TableView;
use crate::taxa::{Rank, TaxonLookup};

/// Number of taxon metadata columns before the sample columns.
pub const METADATA_COLUMNS: usize = 7;

const COL_CLASS: usize = 0;
const COL_HARMFUL: usize = 1;
const COL_NAME: usize = 2;
const COL_SIZE: usize = 3;
const COL_TROPHY: usize = 5;
const COL_UNIT: usize = 6;

const SORT_COLUMNS: [usize; 4] = [COL_CLASS, COL_NAME, COL_SIZE, COL_TROPHY];

/// One species row of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub cells: Vec<String>,
    removed: bool,
}

impl ReportRow {
    fn new(width: usize) -> Self {
        Self {
            cells: vec![String::new(); width],
            removed: false,
        }
    }

    /// Merged into the following row by row aggregation.
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

/// The pivoted species-by-sample report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    /// Station, date, depths, analysis date and analyst per sample column.
    pub header_rows: Vec<Vec<String>>,
    pub title_row: Vec<String>,
    pub species_rows: Vec<ReportRow>,
}

impl ReportTable {
    /// All emitted rows: header rows, title row, then the species rows that
    /// were not merged away.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.header_rows
            .iter()
            .chain(std::iter::once(&self.title_row))
            .cloned()
            .chain(
                self.species_rows
                    .iter()
                    .filter(|r| !r.removed)
                    .map(|r| r.cells.clone()),
            )
            .collect()
    }

    pub fn num_columns(&self) -> usize {
        self.title_row.len()
    }

    /// Flat table for the writers. The first header row becomes the table
    /// header so no blank line precedes the report.
    pub fn to_table(&self) -> TableView {
        let mut rows = self.rows();
        let header = if rows.is_empty() {
            Vec::new()
        } else {
            rows.remove(0)
        };
        TableView::new(header, rows)
    }
}

/// Offset of a parameter inside a sample's column group, if the mode reports it.
fn parameter_slot(mode: ReportMode, parameter: &str) -> Option<usize> {
    match (mode, parameter) {
        (ReportMode::Counted, "Abundance") => Some(0),
        (ReportMode::Counted, "Biovolume concentration") => Some(1),
        (ReportMode::Net, "Abundance class") => Some(0),
        _ => None,
    }
}

/// Ascending comparison where empty cells sort after non-empty ones.
fn compare_empty_last(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => a.cmp(b),
    }
}

/// Row order: class, scientific name, size class, trophic type. Cells beyond
/// the end of a short row count as empty.
pub fn compare_rows(a: &[String], b: &[String]) -> Ordering {
    fn cell(row: &[String], col: usize) -> &str {
        row.get(col).map_or("", String::as_str)
    }
    SORT_COLUMNS
        .iter()
        .map(|&col| compare_empty_last(cell(a, col), cell(b, col)))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn title_row(mode: ReportMode, aggregate_rows: bool, samples: usize) -> Vec<String> {
    let size_title = match mode {
        ReportMode::Counted if !aggregate_rows => "Size class",
        _ => "",
    };
    let mut row: Vec<String> = [
        "Class",
        "Pot. toxic",
        "Scientific name",
        size_title,
        "Sflag",
        "Trophic type",
        "Unit type",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for _ in 0..samples {
        match mode {
            ReportMode::Counted => {
                row.push("Units/L".to_string());
                row.push("Biovolume (mm3/L)".to_string());
            }
            ReportMode::Net => row.push("Occurrence".to_string()),
        }
    }
    row
}

/// Float rendering with at most 12 significant digits and at least one
/// decimal, then a decimal comma.
fn render_decimal_comma(value: f64) -> String {
    let text = if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        let magnitude = value.abs().log10().floor() as i32;
        let decimals = (11 - magnitude).clamp(1, 17) as usize;
        let fixed = format!("{value:.decimals$}");
        let trimmed = fixed.trim_end_matches('0');
        if trimmed.ends_with('.') {
            format!("{trimmed}0")
        } else {
            trimmed.to_string()
        }
    };
    text.replace('.', ",")
}

fn sum_counts(a: &str, b: &str) -> Option<String> {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => Some((x + y).to_string()),
        _ => {
            let x: f64 = a.trim().replace(',', ".").parse().ok()?;
            let y: f64 = b.trim().replace(',', ".").parse().ok()?;
            Some(format_number(x + y))
        }
    }
}

fn sum_biovolumes(a: &str, b: &str) -> Option<String> {
    let x: f64 = a.trim().replace(',', ".").parse().ok()?;
    let y: f64 = b.trim().replace(',', ".").parse().ok()?;
    Some(render_decimal_comma(x + y))
}

/// Merge adjacent rows with the same scientific name and trophic type into
/// the later row. Size classes are blanked first.
fn aggregate_rows(rows: &mut [ReportRow], samples: usize, per_sample: usize) {
    for row in rows.iter_mut() {
        row.cells[COL_SIZE].clear();
    }

    for i in 1..rows.len() {
        let (before, after) = rows.split_at_mut(i);
        let previous = &mut before[i - 1];
        let current = &mut after[0];
        if current.cells[COL_NAME].is_empty()
            || previous.cells[COL_NAME] != current.cells[COL_NAME]
            || previous.cells[COL_TROPHY] != current.cells[COL_TROPHY]
        {
            continue;
        }

        for sample in 0..samples {
            let abundance = METADATA_COLUMNS + sample * per_sample;
            let biovolume = abundance + 1;
            let pairs: [(usize, fn(&str, &str) -> Option<String>); 2] =
                [(abundance, sum_counts), (biovolume, sum_biovolumes)];
            for (col, sum) in pairs {
                let (prev, cur) = (&previous.cells[col], &current.cells[col]);
                if prev.is_empty() || cur.is_empty() {
                    continue;
                }
                match sum(cur, prev) {
                    Some(total) => {
                        current.cells[col] = total;
                        previous.removed = true;
                    }
                    None => tracing::warn!(
                        name = %current.cells[COL_NAME],
                        column = col,
                        "cannot merge non-numeric report values"
                    ),
                }
            }
        }
    }
}

/// Pivot the variables of `datasets` into a species-by-sample report.
///
/// Samples are numbered in traversal order over all datasets; each owns
/// `mode.columns_per_sample()` value columns. Rows are grouped by scientific
/// name and size class and get their metadata columns from `lookup`.
pub fn generate(
    datasets: &[Dataset],
    mode: ReportMode,
    aggregate_rows_enabled: bool,
    lookup: &dyn TaxonLookup,
) -> ReportTable {
    let per_sample = mode.columns_per_sample();
    let samples: Vec<(&Dataset, _)> = datasets
        .iter()
        .flat_map(|ds| ds.samples().map(move |s| (ds, s)))
        .collect();
    let width = METADATA_COLUMNS + samples.len() * per_sample;

    const HEADER_FIELDS: [(&str, NodeKind, &str); 6] = [
        ("Station:", NodeKind::Visit, "station_name"),
        ("Sampling date:", NodeKind::Visit, "sample_date"),
        ("Min. depth:", NodeKind::Sample, "sample_min_depth_m"),
        ("Max. depth:", NodeKind::Sample, "sample_max_depth_m"),
        ("Analysis date:", NodeKind::Sample, "analysis_date"),
        ("Analysed by:", NodeKind::Sample, "analysed_by"),
    ];
    let header_rows: Vec<Vec<String>> = HEADER_FIELDS
        .iter()
        .map(|(label, kind, key)| {
            let mut row = vec![String::new(); width];
            row[METADATA_COLUMNS - 1] = label.to_string();
            for (index, (ds, sample)) in samples.iter().enumerate() {
                let node = ds.ancestor_of_kind(*sample, *kind);
                row[METADATA_COLUMNS + index * per_sample] =
                    node.map(|n| ds.field(n, key).to_string()).unwrap_or_default();
            }
            row
        })
        .collect();

    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<String>> = HashMap::new();
    for (index, (ds, sample)) in samples.iter().enumerate() {
        for &variable in ds.children(*sample) {
            let key = (
                ds.field(variable, "scientific_name").to_string(),
                ds.field(variable, "size_class").to_string(),
            );
            let values = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                vec![String::new(); samples.len() * per_sample]
            });
            if let Some(slot) = parameter_slot(mode, ds.field(variable, "parameter")) {
                values[index * per_sample + slot] = ds.field(variable, "value").to_string();
            }
        }
    }

    let mut species_rows: Vec<ReportRow> = order
        .into_iter()
        .map(|key| {
            let values = groups.remove(&key).unwrap_or_default();
            let (name, size) = key;
            let mut row = ReportRow::new(width);
            row.cells[COL_CLASS] = lookup.taxon_rank_value(&name, Rank::Class).unwrap_or_default();
            if lookup.is_harmful(&name) {
                row.cells[COL_HARMFUL] = "X".to_string();
            }
            row.cells[COL_TROPHY] = lookup
                .bvol_value(&name, &size, "bvol_trophic_type")
                .filter(|t| !t.is_empty())
                .or_else(|| lookup.trophic_type(&name))
                .unwrap_or_default();
            row.cells[COL_UNIT] = lookup.bvol_value(&name, &size, "bvol_unit").unwrap_or_default();
            row.cells[COL_NAME] = name;
            row.cells[COL_SIZE] = size;
            for (offset, value) in values.into_iter().enumerate() {
                row.cells[METADATA_COLUMNS + offset] = value;
            }
            row
        })
        .collect();

    species_rows.sort_by(|a, b| compare_rows(&a.cells, &b.cells));

    if aggregate_rows_enabled && mode == ReportMode::Counted {
        aggregate_rows(&mut species_rows, samples.len(), per_sample);
    }

    let report = ReportTable {
        header_rows,
        title_row: title_row(mode, aggregate_rows_enabled, samples.len()),
        species_rows,
    };
    tracing::info!(
        ?mode,
        samples = samples.len(),
        rows = report.species_rows.iter().filter(|r| !r.removed).count(),
        "species report generated"
    );
    report
}
