//! Taxon reference data: the lookup interface used by aggregation and
//! reporting, plus an in-memory implementation built from tables.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ReadError;
use crate::table::{TableReader, TableView};

/// Taxonomic rank for classification lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    pub const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Field name used for this rank in taxa tables and datasets.
    pub fn field_name(self) -> &'static str {
        match self {
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.field_name();
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            write!(f, "{}{}", first.to_ascii_uppercase(), chars.as_str())?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Rank::ALL
            .into_iter()
            .find(|r| r.field_name() == wanted)
            .ok_or_else(|| format!("unknown rank '{s}'"))
    }
}

/// Species reference data consulted by aggregation and reporting.
pub trait TaxonLookup {
    /// Name of the taxon at `rank` that `scientific_name` belongs to.
    fn taxon_rank_value(&self, scientific_name: &str, rank: Rank) -> Option<String>;

    fn plankton_group(&self, scientific_name: &str) -> Option<String>;

    fn is_harmful(&self, scientific_name: &str) -> bool;

    /// Size-class specific value such as `bvol_unit` or `bvol_trophic_type`.
    /// An empty `size_class` addresses the taxon-level value.
    fn bvol_value(&self, scientific_name: &str, size_class: &str, field: &str) -> Option<String>;

    fn trophic_type(&self, scientific_name: &str) -> Option<String> {
        self.bvol_value(scientific_name, "", "bvol_trophic_type")
    }
}

#[derive(Debug, Clone, Default)]
struct TaxonRecord {
    ranks: HashMap<Rank, String>,
    plankton_group: String,
    harmful: bool,
    trophic_type: String,
}

/// In-memory taxa and biovolume lists keyed by scientific name.
#[derive(Debug, Clone, Default)]
pub struct TaxaTable {
    taxa: HashMap<String, TaxonRecord>,
    /// `(scientific_name, size_class)` → field → value
    bvol: HashMap<(String, String), HashMap<String, String>>,
}

const BVOL_FIELDS: [&str; 2] = ["bvol_unit", "bvol_trophic_type"];

fn is_flag_set(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "x" | "yes" | "true" | "1")
}

impl TaxaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a taxa table and an optional size-class (biovolume) table.
    pub fn from_tables(taxa: &TableView, bvol: Option<&TableView>) -> Self {
        let mut table = Self::new();
        table.load_taxa(taxa);
        if let Some(bvol) = bvol {
            table.load_bvol(bvol);
        }
        table
    }

    /// Read the tables from delimited text or spreadsheet files.
    pub fn from_files(
        taxa_path: impl AsRef<Path>,
        bvol_path: Option<&Path>,
    ) -> Result<Self, ReadError> {
        let taxa = read_any(taxa_path.as_ref())?;
        let bvol = bvol_path.map(read_any).transpose()?;
        Ok(Self::from_tables(&taxa, bvol.as_ref()))
    }

    pub fn load_taxa(&mut self, table: &TableView) {
        for row in 0..table.num_rows() {
            let name = table.cell_by_name(row, "scientific_name");
            if name.is_empty() {
                continue;
            }
            let ranks = Rank::ALL
                .into_iter()
                .filter_map(|rank| {
                    let value = table.cell_by_name(row, rank.field_name());
                    (!value.is_empty()).then(|| (rank, value.to_string()))
                })
                .collect();
            self.taxa.insert(
                name.to_string(),
                TaxonRecord {
                    ranks,
                    plankton_group: table.cell_by_name(row, "plankton_group").to_string(),
                    harmful: is_flag_set(table.cell_by_name(row, "harmful")),
                    trophic_type: table.cell_by_name(row, "trophic_type").to_string(),
                },
            );
        }
        tracing::info!(taxa = self.taxa.len(), "taxa loaded");
    }

    pub fn load_bvol(&mut self, table: &TableView) {
        for row in 0..table.num_rows() {
            let name = table.cell_by_name(row, "scientific_name");
            if name.is_empty() {
                continue;
            }
            let key = (
                name.to_string(),
                table.cell_by_name(row, "size_class").to_string(),
            );
            let fields = self.bvol.entry(key).or_default();
            for field in BVOL_FIELDS {
                let value = table.cell_by_name(row, field);
                if !value.is_empty() {
                    fields.insert(field.to_string(), value.to_string());
                }
            }
        }
        tracing::info!(size_classes = self.bvol.len(), "biovolume list loaded");
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }
}

fn read_any(path: &Path) -> Result<TableView, ReadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => TableReader::spreadsheet(path).read(),
        _ => TableReader::text(path).read(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl TaxonLookup for TaxaTable {
    fn taxon_rank_value(&self, scientific_name: &str, rank: Rank) -> Option<String> {
        self.taxa.get(scientific_name)?.ranks.get(&rank).cloned()
    }

    fn plankton_group(&self, scientific_name: &str) -> Option<String> {
        non_empty(&self.taxa.get(scientific_name)?.plankton_group)
    }

    fn is_harmful(&self, scientific_name: &str) -> bool {
        self.taxa
            .get(scientific_name)
            .map(|t| t.harmful)
            .unwrap_or(false)
    }

    fn bvol_value(&self, scientific_name: &str, size_class: &str, field: &str) -> Option<String> {
        let from_bvol = self
            .bvol
            .get(&(scientific_name.to_string(), size_class.to_string()))
            .and_then(|fields| fields.get(field))
            .cloned();
        if from_bvol.is_some() || !size_class.is_empty() {
            return from_bvol;
        }
        // Taxon-level fallback for the trophic type.
        match field {
            "bvol_trophic_type" => non_empty(&self.taxa.get(scientific_name)?.trophic_type),
            _ => None,
        }
    }
}
