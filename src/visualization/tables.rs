use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::analysis::AggregationWarning;
use crate::import::ScreeningWarning;
use crate::models::Dataset;
use crate::report::ReportTable;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn title(text: &str) -> String {
    format!("\n{}\n{}\n", text.bold().green(), "=".repeat(50))
}

/// Format node counts and parameters of a dataset as a string.
pub fn format_dataset_summary(dataset: &Dataset) -> String {
    let mut output = title(&format!("Dataset: {}", dataset.name));

    let mut table = new_table(vec!["Item", "Count"]);
    table.add_row(vec![Cell::new("Visits"), Cell::new(dataset.num_visits())]);
    table.add_row(vec![Cell::new("Samples"), Cell::new(dataset.num_samples())]);
    table.add_row(vec![Cell::new("Variables"), Cell::new(dataset.num_variables())]);

    let mut parameters: Vec<(String, usize)> = Vec::new();
    for variable in dataset.variables() {
        let parameter = dataset.field(variable, "parameter");
        match parameters.iter_mut().find(|(p, _)| p.as_str() == parameter) {
            Some((_, count)) => *count += 1,
            None => parameters.push((parameter.to_string(), 1)),
        }
    }
    parameters.sort();
    for (parameter, count) in parameters {
        let label = if parameter.is_empty() {
            "  (no parameter)".to_string()
        } else {
            format!("  {parameter}")
        };
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }

    output.push_str(&format!("{table}"));
    output
}

pub fn print_dataset_summary(dataset: &Dataset) {
    print!("{}", format_dataset_summary(dataset));
}

/// Format screening warnings as a table; empty string when there are none.
pub fn format_screening_warnings(warnings: &[ScreeningWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let mut output = title(&format!("Screening warnings ({})", warnings.len()));
    let mut table = new_table(vec!["Level", "Field", "Value", "Problem"]);
    for w in warnings {
        table.add_row(vec![
            Cell::new(w.level),
            Cell::new(&w.key),
            Cell::new(&w.value),
            Cell::new(&w.message),
        ]);
    }
    output.push_str(&format!("{table}"));
    output
}

pub fn print_screening_warnings(warnings: &[ScreeningWarning]) {
    print!("{}", format_screening_warnings(warnings));
}

/// Format values skipped during aggregation; empty string when there are none.
pub fn format_aggregation_warnings(warnings: &[AggregationWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let mut output = title(&format!("Aggregation warnings ({})", warnings.len()));
    let mut table = new_table(vec!["Scientific name", "Value"]);
    for w in warnings {
        table.add_row(vec![Cell::new(&w.scientific_name), Cell::new(&w.value)]);
    }
    output.push_str(&format!("{table}"));
    output
}

pub fn print_aggregation_warnings(warnings: &[AggregationWarning]) {
    print!("{}", format_aggregation_warnings(warnings));
}

/// Format the first `max_rows` species rows of a report, metadata columns only.
pub fn format_report_preview(report: &ReportTable, max_rows: usize) -> String {
    let rows: Vec<_> = report.species_rows.iter().filter(|r| !r.is_removed()).collect();
    let mut output = title(&format!("Species report ({} rows)", rows.len()));

    let mut table = new_table(vec!["Class", "Pot. toxic", "Scientific name", "Size class", "Trophic type"]);
    for row in rows.iter().take(max_rows) {
        table.add_row(vec![
            Cell::new(&row.cells[0]),
            Cell::new(&row.cells[1]),
            Cell::new(&row.cells[2]),
            Cell::new(&row.cells[3]),
            Cell::new(&row.cells[5]),
        ]);
    }
    output.push_str(&format!("{table}"));
    if rows.len() > max_rows {
        output.push_str(&format!("\n  ... {} more rows\n", rows.len() - max_rows));
    }
    output
}

pub fn print_report_preview(report: &ReportTable, max_rows: usize) {
    print!("{}", format_report_preview(report, max_rows));
}
