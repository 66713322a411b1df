use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::models::{Dataset, NodeId};
use crate::taxa::{Rank, TaxonLookup};

/// Rank to aggregate variables at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonRank {
    /// Everything collapses into `Biota`.
    Biota,
    PlanktonGroup,
    /// Resolved through the taxon lookup.
    Lookup(Rank),
    /// Read from the variable's own rank field.
    FromDataset(Rank),
}

impl fmt::Display for TaxonRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonRank::Biota => write!(f, "Biota (all levels)"),
            TaxonRank::PlanktonGroup => write!(f, "Plankton group"),
            TaxonRank::Lookup(rank) => write!(f, "{rank}"),
            TaxonRank::FromDataset(rank) => write!(f, "{rank} (from dataset)"),
        }
    }
}

impl std::str::FromStr for TaxonRank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        match label.to_lowercase().as_str() {
            "biota" | "biota (all levels)" => return Ok(TaxonRank::Biota),
            "plankton group" => return Ok(TaxonRank::PlanktonGroup),
            _ => {}
        }
        if let Some(rank) = label.strip_suffix("(from dataset)") {
            return rank.parse().map(TaxonRank::FromDataset);
        }
        label
            .parse()
            .map(TaxonRank::Lookup)
            .map_err(|_| format!("unknown aggregation rank '{s}'"))
    }
}

/// A variable skipped during aggregation because its value is not a number.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWarning {
    pub sample: NodeId,
    pub scientific_name: String,
    pub value: String,
}

impl fmt::Display for AggregationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value is not a valid float: '{}' ({})",
            self.value, self.scientific_name
        )
    }
}

/// Render a summed value: integral values without a fraction.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AggregationKey {
    taxon: String,
    trophy: String,
    stage: String,
    sex: String,
    parameter: String,
    unit: String,
}

/// Name used for taxon lookups; older datasets carry only `taxon_name`.
fn lookup_name<'a>(dataset: &'a Dataset, variable: NodeId) -> &'a str {
    match dataset.field(variable, "scientific_name") {
        "" => dataset.field(variable, "taxon_name"),
        name => name,
    }
}

fn resolve_taxon(
    dataset: &Dataset,
    variable: NodeId,
    rank: TaxonRank,
    lookup: &dyn TaxonLookup,
) -> String {
    let name = lookup_name(dataset, variable);
    let taxon = match rank {
        TaxonRank::Biota => Some("Biota".to_string()),
        TaxonRank::PlanktonGroup => lookup.plankton_group(name),
        TaxonRank::Lookup(rank) => lookup.taxon_rank_value(name, rank),
        TaxonRank::FromDataset(rank) => Some(dataset.field(variable, rank.field_name()).to_string()),
    };
    match taxon {
        Some(t) if !t.is_empty() => t,
        _ => "not-designated".to_string(),
    }
}

/// Collapse the variables of every sample by taxon, trophy, life stage, sex,
/// parameter and unit, summing their values.
///
/// Variables whose trophy is not in `trophy_filter` are dropped. Variables
/// whose `stage` (or `stage/sex`) is in `lifestage_filter` get the combined
/// filter label as stage and an empty sex; others keep their life stage.
/// Each sample's children are replaced in one swap.
pub fn aggregate(
    dataset: &mut Dataset,
    rank: TaxonRank,
    trophy_filter: &BTreeSet<String>,
    lifestage_filter: &BTreeSet<String>,
    lookup: &dyn TaxonLookup,
) -> Vec<AggregationWarning> {
    let trophy_label = trophy_filter.iter().cloned().collect::<Vec<_>>().join("-");
    let lifestage_label = lifestage_filter.iter().cloned().collect::<Vec<_>>().join("-");
    let mut warnings = Vec::new();

    let samples: Vec<NodeId> = dataset.samples().collect();
    for &sample in &samples {
        let mut order: Vec<AggregationKey> = Vec::new();
        let mut sums: HashMap<AggregationKey, f64> = HashMap::new();

        for &variable in dataset.children(sample) {
            let raw = dataset.field(variable, "value");
            let Ok(value) = raw.trim().parse::<f64>() else {
                if !raw.is_empty() {
                    warnings.push(AggregationWarning {
                        sample,
                        scientific_name: lookup_name(dataset, variable).to_string(),
                        value: raw.to_string(),
                    });
                }
                continue;
            };

            if !trophy_filter.contains(dataset.field(variable, "trophy")) {
                continue;
            }

            let mut stage = dataset.field(variable, "stage").to_string();
            let mut sex = dataset.field(variable, "sex").to_string();
            let check = if sex.is_empty() {
                stage.clone()
            } else {
                format!("{stage}/{sex}")
            };
            if lifestage_filter.contains(&check) {
                stage = lifestage_label.clone();
                sex.clear();
            }

            let key = AggregationKey {
                taxon: resolve_taxon(dataset, variable, rank, lookup),
                trophy: trophy_label.clone(),
                stage,
                sex,
                parameter: dataset.field(variable, "parameter").to_string(),
                unit: dataset.field(variable, "unit").to_string(),
            };
            match sums.get_mut(&key) {
                Some(sum) => *sum += value,
                None => {
                    sums.insert(key.clone(), value);
                    order.push(key);
                }
            }
        }

        let new_children: Vec<BTreeMap<String, String>> = order
            .into_iter()
            .map(|key| {
                let value = sums.get(&key).copied().unwrap_or(0.0);
                let mut fields = BTreeMap::new();
                for rank in [Rank::Kingdom, Rank::Phylum, Rank::Class, Rank::Order] {
                    let ancestor = lookup.taxon_rank_value(&key.taxon, rank).unwrap_or_default();
                    fields.insert(rank.field_name().to_string(), ancestor);
                }
                fields.insert("scientific_name".to_string(), key.taxon.clone());
                fields.insert("taxon_name".to_string(), key.taxon);
                fields.insert("trophy".to_string(), key.trophy);
                fields.insert("stage".to_string(), key.stage);
                fields.insert("sex".to_string(), key.sex);
                fields.insert("parameter".to_string(), key.parameter);
                fields.insert("unit".to_string(), key.unit);
                fields.insert("value".to_string(), format_number(value));
                fields
            })
            .collect();
        dataset.replace_children(sample, new_children);
    }

    for warning in &warnings {
        tracing::warn!(%warning, "aggregation");
    }
    tracing::info!(
        %rank,
        samples = samples.len(),
        variables = dataset.num_variables(),
        warnings = warnings.len(),
        "aggregation finished"
    );
    warnings
}
