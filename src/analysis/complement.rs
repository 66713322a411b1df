use std::collections::{BTreeSet, HashSet};

use crate::models::Dataset;

const TAXON_KEY_FIELDS: [&str; 7] = [
    "scientific_name",
    "size_class",
    "trophy",
    "stage",
    "sex",
    "parameter",
    "unit",
];

/// Distinct filter values found in a dataset, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionAlternatives {
    pub trophies: Vec<String>,
    /// `stage`, or `stage/sex` when a sex is recorded.
    pub lifestages: Vec<String>,
}

/// Collect the trophy and life-stage values used by the dataset's variables.
pub fn selection_alternatives(dataset: &Dataset) -> SelectionAlternatives {
    let mut trophies = BTreeSet::new();
    let mut lifestages = BTreeSet::new();
    for variable in dataset.variables() {
        trophies.insert(dataset.field(variable, "trophy").to_string());
        let stage = dataset.field(variable, "stage");
        let sex = dataset.field(variable, "sex");
        lifestages.insert(if sex.is_empty() {
            stage.to_string()
        } else {
            format!("{stage}/{sex}")
        });
    }
    SelectionAlternatives {
        trophies: trophies.into_iter().collect(),
        lifestages: lifestages.into_iter().collect(),
    }
}

/// Add a zero-valued variable to every sample for each taxon combination
/// observed elsewhere in the dataset but not in that sample.
///
/// Returns the number of variables added.
pub fn add_missing_taxa(dataset: &mut Dataset) -> usize {
    let key_of = |ds: &Dataset, variable| -> Vec<String> {
        TAXON_KEY_FIELDS
            .iter()
            .map(|field| ds.field(variable, field).to_string())
            .collect()
    };

    let mut all_keys: Vec<Vec<String>> = Vec::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    for variable in dataset.variables() {
        let key = key_of(&*dataset, variable);
        if seen.insert(key.clone()) {
            all_keys.push(key);
        }
    }

    let mut added = 0;
    let samples: Vec<_> = dataset.samples().collect();
    for sample in samples {
        let present: HashSet<Vec<String>> = dataset
            .children(sample)
            .iter()
            .map(|&v| key_of(&*dataset, v))
            .collect();
        for key in all_keys.iter().filter(|k| !present.contains(*k)) {
            let Some(variable) = dataset.add_child(sample) else {
                continue;
            };
            for (field, value) in TAXON_KEY_FIELDS.iter().zip(key) {
                if !value.is_empty() {
                    dataset.set_field(variable, *field, value.as_str());
                }
            }
            dataset.set_field(variable, "value", "0");
            added += 1;
        }
    }
    tracing::info!(added, "added zero values for taxa not observed");
    added
}
