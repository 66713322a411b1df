mod tables;

pub use tables::{
    format_aggregation_warnings, format_dataset_summary, format_report_preview,
    format_screening_warnings, print_aggregation_warnings, print_dataset_summary,
    print_report_preview, print_screening_warnings,
};
