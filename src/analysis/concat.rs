use crate::error::ToolboxError;
use crate::models::Dataset;

/// Deep-copy several datasets into one for analysis.
///
/// All inputs must share the same export columns. The combined dataset keeps
/// the first input's parser definition.
pub fn concat_datasets(datasets: &[Dataset]) -> Result<Dataset, ToolboxError> {
    let Some(first) = datasets.first() else {
        return Err(ToolboxError::InvalidArgument(
            "no datasets selected for analysis".to_string(),
        ));
    };

    for other in &datasets[1..] {
        if other.export_columns() != first.export_columns() {
            return Err(ToolboxError::IncompatibleDatasets(format!(
                "'{}' and '{}' have different export columns",
                first.name, other.name
            )));
        }
    }

    let name = datasets
        .iter()
        .map(|d| d.name.as_str())
        .collect::<Vec<_>>()
        .join("+");
    let mut combined = Dataset::with_definition(name, first.definition().clone());
    for dataset in datasets {
        combined.graft_visits(dataset);
    }

    if combined.num_variables() == 0 {
        return Err(ToolboxError::InvalidArgument(
            "selected datasets contain no variables".to_string(),
        ));
    }
    tracing::info!(
        datasets = datasets.len(),
        visits = combined.num_visits(),
        variables = combined.num_variables(),
        "datasets concatenated"
    );
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserDefinition;
    use crate::table::TableView;

    fn definition(export: &str) -> ParserDefinition {
        let table = TableView::new(
            vec!["Node".into(), "Key".into(), "Export".into()],
            vec![vec!["Variable".into(), "value".into(), export.into()]],
        );
        ParserDefinition::load(&table, None, Some("Export"), None)
    }

    fn dataset(name: &str, export: &str, variables: usize) -> Dataset {
        let mut ds = Dataset::with_definition(name, definition(export));
        let visit = ds.add_visit();
        let sample = ds.add_child(visit).unwrap();
        for i in 0..variables {
            let v = ds.add_child(sample).unwrap();
            ds.set_field(v, "value", i.to_string());
        }
        ds
    }

    #[test]
    fn test_concat_copies_all_visits() {
        let inputs = [dataset("a", "Value", 2), dataset("b", "Value", 3)];
        let combined = concat_datasets(&inputs).unwrap();
        assert_eq!(combined.name, "a+b");
        assert_eq!(combined.num_visits(), 2);
        assert_eq!(combined.num_variables(), 5);
        assert_eq!(combined.export_columns(), inputs[0].export_columns());
    }

    #[test]
    fn test_concat_is_independent_of_inputs() {
        let inputs = [dataset("a", "Value", 1)];
        let mut combined = concat_datasets(&inputs).unwrap();
        let v = combined.variables().next().unwrap();
        combined.set_field(v, "value", "99");
        let original = inputs[0].variables().next().unwrap();
        assert_eq!(inputs[0].field(original, "value"), "0");
    }

    #[test]
    fn test_concat_rejects_different_columns() {
        let inputs = [dataset("a", "Value", 1), dataset("b", "Count", 1)];
        let err = concat_datasets(&inputs).unwrap_err();
        assert!(matches!(err, ToolboxError::IncompatibleDatasets(_)));
    }

    #[test]
    fn test_concat_rejects_empty() {
        assert!(matches!(
            concat_datasets(&[]),
            Err(ToolboxError::InvalidArgument(_))
        ));
        assert!(matches!(
            concat_datasets(&[dataset("a", "Value", 0)]),
            Err(ToolboxError::InvalidArgument(_))
        ));
    }
}
