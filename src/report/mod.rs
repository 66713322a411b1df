//! Species-by-sample report generation.

mod species;

use serde::Deserialize;

pub use species::{compare_rows, generate, ReportRow, ReportTable, METADATA_COLUMNS};

/// Kind of species report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Abundance and biovolume per sample.
    #[default]
    Counted,
    /// Abundance class per sample.
    Net,
}

impl ReportMode {
    pub fn columns_per_sample(self) -> usize {
        match self {
            ReportMode::Counted => 2,
            ReportMode::Net => 1,
        }
    }
}

impl std::fmt::Display for ReportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportMode::Counted => write!(f, "counted"),
            ReportMode::Net => write!(f, "net"),
        }
    }
}

impl std::str::FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "counted" => Ok(ReportMode::Counted),
            "net" => Ok(ReportMode::Net),
            _ => Err(format!("unknown report mode '{s}' (expected counted or net)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("Counted".parse::<ReportMode>().unwrap(), ReportMode::Counted);
        assert_eq!("net".parse::<ReportMode>().unwrap(), ReportMode::Net);
        assert!("gross".parse::<ReportMode>().is_err());
    }

    #[test]
    fn test_columns_per_sample() {
        assert_eq!(ReportMode::Counted.columns_per_sample(), 2);
        assert_eq!(ReportMode::Net.columns_per_sample(), 1);
    }
}
