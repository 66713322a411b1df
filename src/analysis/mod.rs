mod aggregation;
mod analyzer;
mod complement;
mod concat;

pub use aggregation::{aggregate, format_number, AggregationWarning, TaxonRank};
pub use analyzer::Analyzer;
pub use complement::{add_missing_taxa, selection_alternatives, SelectionAlternatives};
pub use concat::concat_datasets;
