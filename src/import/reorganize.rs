//! Phase 2: move promoted fields up and split parameter columns into
//! separate Variables.

use std::collections::BTreeMap;

use crate::models::{Dataset, NodeKind};
use crate::parser::{Command, ParserDefinition};

struct PendingRules {
    /// `(level, key)` of fields moved to the parent node.
    promote: Vec<(NodeKind, String)>,
    /// `(parameter name, unit)` of measurements split into their own Variable.
    parameters: Vec<(String, String)>,
}

impl PendingRules {
    fn from_definition(definition: &ParserDefinition) -> Self {
        let mut promote = Vec::new();
        let mut parameters = Vec::new();
        for row in definition.import_rows() {
            let Some(level) = NodeKind::from_level(row.node_level) else {
                continue;
            };
            match Command::parse(&row.command) {
                Ok(Command::Promote { .. }) => promote.push((level, row.key.clone())),
                Ok(Command::Parameter { unit, .. }) if level == NodeKind::Variable => {
                    parameters.push((row.key.clone(), unit))
                }
                _ => {}
            }
        }
        Self { promote, parameters }
    }
}

/// Apply the structural corrections declared in the import profile.
///
/// Both corrections consume the fields they act on, so a second run finds
/// nothing left to do and leaves the tree untouched.
pub(crate) fn reorganize(dataset: &mut Dataset) {
    let rules = PendingRules::from_definition(dataset.definition());
    let promoted = promote_fields(dataset, &rules);
    let split = split_parameters(dataset, &rules);
    tracing::info!(promoted, split, "reorganization finished");
}

fn promote_fields(dataset: &mut Dataset, rules: &PendingRules) -> usize {
    let mut moved = 0;
    for id in dataset.iter_depth_first() {
        let Some(node) = dataset.get(id) else {
            continue;
        };
        let Some(parent) = node.parent() else {
            continue;
        };
        let kind = node.kind();
        let pending: Vec<(String, String)> = rules
            .promote
            .iter()
            .filter(|(level, _)| *level == kind)
            .filter_map(|(_, key)| node.get(key).map(|v| (key.clone(), v.to_string())))
            .collect();

        for (key, value) in pending {
            if let Some(node) = dataset.get_mut(id) {
                node.remove(&key);
            }
            if dataset.field(parent, &key).is_empty() {
                dataset.set_field(parent, key, value);
            }
            moved += 1;
        }
    }
    moved
}

fn split_parameters(dataset: &mut Dataset, rules: &PendingRules) -> usize {
    if rules.parameters.is_empty() {
        return 0;
    }
    let samples: Vec<_> = dataset.samples().collect();
    let mut split = 0;

    for sample in samples {
        let variables = dataset.children(sample);
        let has_pending = variables.iter().any(|&v| {
            rules
                .parameters
                .iter()
                .any(|(name, _)| dataset[v].get(name).is_some())
        });
        if !has_pending {
            continue;
        }

        let mut rebuilt: Vec<BTreeMap<String, String>> = Vec::new();
        for &variable in variables {
            let mut fields = dataset[variable].fields().clone();
            let measurements: Vec<(String, String, String)> = rules
                .parameters
                .iter()
                .filter_map(|(name, unit)| {
                    fields
                        .remove(name)
                        .map(|value| (name.clone(), unit.clone(), value))
                })
                .collect();

            if measurements.is_empty() {
                rebuilt.push(fields);
                continue;
            }
            split += 1;
            for (parameter, unit, value) in measurements {
                if value.is_empty() {
                    continue;
                }
                let mut split_fields = fields.clone();
                split_fields.insert("parameter".to_string(), parameter);
                split_fields.insert("value".to_string(), value);
                split_fields.insert("unit".to_string(), unit);
                rebuilt.push(split_fields);
            }
        }
        dataset.replace_children(sample, rebuilt);
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableView;

    fn definition(rows: &[[&str; 3]]) -> ParserDefinition {
        let table = TableView::new(
            vec!["Node".into(), "Key".into(), "Import".into()],
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        ParserDefinition::load(&table, Some("Import"), None, None)
    }

    fn dataset_with_parameters() -> Dataset {
        let def = definition(&[
            ["Visit", "station_name", "$Text('Station')"],
            ["Variable", "scientific_name", "$Text('Taxon')"],
            ["Variable", "Abundance", "$Parameter('Count', 'ind/l')"],
            ["Variable", "Biovolume concentration", "$Parameter('Biovol', 'mm3/l')"],
            ["Variable", "sample_date", "$Promote('Date')"],
        ]);
        let mut ds = Dataset::with_definition("test", def);
        let visit = ds.add_visit();
        let sample = ds.add_child(visit).unwrap();
        for (taxon, count, biovol, date) in [
            ("Skeletonema marinoi", "100", "0,5", "2012-06-14"),
            ("Dinophysis acuta", "", "", "2012-06-15"),
            ("Ceratium tripos", "3", "", ""),
        ] {
            let v = ds.add_child(sample).unwrap();
            ds.set_field(v, "scientific_name", taxon);
            ds.set_field(v, "Abundance", count);
            ds.set_field(v, "Biovolume concentration", biovol);
            ds.set_field(v, "sample_date", date);
        }
        ds
    }

    fn snapshot(ds: &Dataset) -> Vec<BTreeMap<String, String>> {
        ds.iter_depth_first()
            .into_iter()
            .map(|id| ds[id].fields().clone())
            .collect()
    }

    #[test]
    fn test_split_parameters() {
        let mut ds = dataset_with_parameters();
        reorganize(&mut ds);

        // Two measurements for the first taxon, none for the second, one for the third.
        assert_eq!(ds.num_variables(), 3);
        let rows: Vec<(String, String, String, String)> = ds
            .variables()
            .map(|v| {
                (
                    ds.field(v, "scientific_name").to_string(),
                    ds.field(v, "parameter").to_string(),
                    ds.field(v, "value").to_string(),
                    ds.field(v, "unit").to_string(),
                )
            })
            .collect();
        assert_eq!(rows[0].1, "Abundance");
        assert_eq!(rows[0].3, "ind/l");
        assert_eq!(rows[1].1, "Biovolume concentration");
        assert_eq!(rows[1].2, "0,5");
        assert_eq!(rows[2].0, "Ceratium tripos");
        assert!(ds
            .variables()
            .all(|v| ds[v].get("Abundance").is_none() && ds[v].get("sample_date").is_none()));
    }

    #[test]
    fn test_promote_keeps_first_non_empty_value() {
        let mut ds = dataset_with_parameters();
        reorganize(&mut ds);
        let sample = ds.samples().next().unwrap();
        assert_eq!(ds.field(sample, "sample_date"), "2012-06-14");
    }

    #[test]
    fn test_existing_parent_value_wins() {
        let mut ds = dataset_with_parameters();
        let sample = ds.samples().next().unwrap();
        ds.set_field(sample, "sample_date", "2012-01-01");
        reorganize(&mut ds);
        assert_eq!(ds.field(sample, "sample_date"), "2012-01-01");
    }

    #[test]
    fn test_reorganize_is_idempotent() {
        let mut ds = dataset_with_parameters();
        reorganize(&mut ds);
        let once = snapshot(&ds);
        let ids_once = ds.iter_depth_first();
        reorganize(&mut ds);
        assert_eq!(snapshot(&ds), once);
        assert_eq!(ds.iter_depth_first(), ids_once);
    }

    #[test]
    fn test_no_rules_leaves_tree_untouched() {
        let mut ds = Dataset::new("plain");
        let visit = ds.add_visit();
        let sample = ds.add_child(visit).unwrap();
        let v = ds.add_child(sample).unwrap();
        ds.set_field(v, "value", "1");
        let before = snapshot(&ds);
        reorganize(&mut ds);
        assert_eq!(snapshot(&ds), before);
    }
}
