use std::collections::BTreeSet;

use crate::analysis::{
    add_missing_taxa, aggregate, concat_datasets, selection_alternatives, AggregationWarning,
    SelectionAlternatives, TaxonRank,
};
use crate::error::ToolboxError;
use crate::models::Dataset;
use crate::taxa::TaxonLookup;

/// Working copy of one or more imported datasets plus the taxon lookup the
/// analysis steps consult. The imported datasets are never modified.
pub struct Analyzer<'a> {
    data: Dataset,
    lookup: &'a dyn TaxonLookup,
}

impl<'a> Analyzer<'a> {
    /// Copy the given datasets into a single analysis dataset.
    pub fn new(datasets: &[Dataset], lookup: &'a dyn TaxonLookup) -> Result<Self, ToolboxError> {
        Ok(Self {
            data: concat_datasets(datasets)?,
            lookup,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    pub fn into_dataset(self) -> Dataset {
        self.data
    }

    /// Trophy and life-stage values available as filters.
    pub fn selection_alternatives(&self) -> SelectionAlternatives {
        selection_alternatives(&self.data)
    }

    /// Aggregate the working copy in place.
    pub fn aggregate(
        &mut self,
        rank: TaxonRank,
        trophy_filter: &BTreeSet<String>,
        lifestage_filter: &BTreeSet<String>,
    ) -> Vec<AggregationWarning> {
        aggregate(&mut self.data, rank, trophy_filter, lifestage_filter, self.lookup)
    }

    /// Add zero values for taxa not observed in a sample.
    pub fn add_missing_taxa(&mut self) -> usize {
        add_missing_taxa(&mut self.data)
    }
}
