//! TOML configuration for the command-line application.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analysis::TaxonRank;
use crate::error::ToolboxError;
use crate::parser::ParserDefinition;
use crate::report::ReportMode;
use crate::table::{EncodingErrors, TextOptions};
use crate::taxa::TaxaTable;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Parser definition table, spreadsheet or delimited text.
    pub definition: Option<PathBuf>,
    pub import_column: Option<String>,
    pub export_column: Option<String>,
    pub semantics_column: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            definition: None,
            import_column: Some("Import".to_string()),
            export_column: Some("Export".to_string()),
            semantics_column: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// WHATWG encoding label.
    pub encoding: String,
    /// `strict`, `replace` or `ignore`.
    pub errors: String,
    /// Single-character delimiter; autodetected when absent.
    pub delimiter: Option<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            errors: "strict".to_string(),
            delimiter: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaxaConfig {
    pub taxa_file: Option<PathBuf>,
    pub bvol_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub mode: ReportMode,
    pub aggregate_rows: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregationConfig {
    pub rank: String,
    #[serde(default)]
    pub trophy: Vec<String>,
    #[serde(default)]
    pub lifestage: Vec<String>,
}

impl AggregationConfig {
    pub fn rank(&self) -> Result<TaxonRank, ToolboxError> {
        self.rank.parse().map_err(ToolboxError::Config)
    }

    pub fn trophy_filter(&self) -> BTreeSet<String> {
        self.trophy.iter().cloned().collect()
    }

    pub fn lifestage_filter(&self) -> BTreeSet<String> {
        self.lifestage.iter().cloned().collect()
    }
}

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolboxConfig {
    pub parser: ParserConfig,
    pub text: TextConfig,
    pub taxa: TaxaConfig,
    pub report: ReportConfig,
    /// Aggregation runs only when this section is present.
    pub aggregation: Option<AggregationConfig>,
}

impl ToolboxConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ToolboxError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file. Relative paths inside it are resolved
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ToolboxError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.parser.definition,
            &mut self.taxa.taxa_file,
            &mut self.taxa.bvol_file,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn text_options(&self) -> Result<TextOptions, ToolboxError> {
        let mut options = TextOptions::with_encoding_label(&self.text.encoding).ok_or_else(|| {
            ToolboxError::Config(format!("unknown text encoding '{}'", self.text.encoding))
        })?;
        options.errors = self
            .text
            .errors
            .parse::<EncodingErrors>()
            .map_err(ToolboxError::Config)?;
        options.delimiter = match self.text.delimiter.as_deref() {
            None | Some("") => None,
            Some(d) if d.len() == 1 => Some(d.as_bytes()[0]),
            Some(d) => {
                return Err(ToolboxError::Config(format!(
                    "delimiter must be a single ASCII character, got '{d}'"
                )))
            }
        };
        Ok(options)
    }

    pub fn load_definition(&self) -> Result<ParserDefinition, ToolboxError> {
        let path = self.parser.definition.as_ref().ok_or_else(|| {
            ToolboxError::Config("no parser definition configured ([parser] definition)".to_string())
        })?;
        Ok(ParserDefinition::from_file(
            path,
            self.parser.import_column.as_deref(),
            self.parser.export_column.as_deref(),
            self.parser.semantics_column.as_deref(),
        )?)
    }

    /// Taxon reference data, empty when no taxa file is configured.
    pub fn load_taxa(&self) -> Result<TaxaTable, ToolboxError> {
        match &self.taxa.taxa_file {
            Some(taxa_file) => Ok(TaxaTable::from_files(taxa_file, self.taxa.bvol_file.as_deref())?),
            None => {
                tracing::debug!("no taxa file configured, report metadata stays empty");
                Ok(TaxaTable::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ToolboxConfig::from_toml_str("").unwrap();
        assert_eq!(config, ToolboxConfig::default());
        assert_eq!(config.parser.import_column.as_deref(), Some("Import"));
        assert_eq!(config.report.mode, ReportMode::Counted);
        assert!(config.aggregation.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = ToolboxConfig::from_toml_str(
            r#"
[parser]
definition = "parser.xlsx"
import_column = "PTBX"
export_column = "Export"
semantics_column = "Semantics"

[text]
encoding = "windows-1252"
errors = "replace"
delimiter = "\t"

[taxa]
taxa_file = "taxa.txt"

[report]
mode = "net"
aggregate_rows = true

[aggregation]
rank = "Class"
trophy = ["AU", "MX"]
"#,
        )
        .unwrap();

        assert_eq!(config.parser.import_column.as_deref(), Some("PTBX"));
        assert_eq!(config.report.mode, ReportMode::Net);
        assert!(config.report.aggregate_rows);

        let options = config.text_options().unwrap();
        assert_eq!(options.encoding.name(), "windows-1252");
        assert_eq!(options.errors, EncodingErrors::Replace);
        assert_eq!(options.delimiter, Some(b'\t'));

        let aggregation = config.aggregation.unwrap();
        assert_eq!(
            aggregation.rank().unwrap(),
            TaxonRank::Lookup(crate::taxa::Rank::Class)
        );
        assert_eq!(aggregation.trophy_filter().len(), 2);
        assert!(aggregation.lifestage_filter().is_empty());
    }

    #[test]
    fn test_invalid_values() {
        let config = ToolboxConfig::from_toml_str("[text]\nencoding = \"klingon\"\n").unwrap();
        assert!(matches!(config.text_options(), Err(ToolboxError::Config(_))));

        let config = ToolboxConfig::from_toml_str("[text]\ndelimiter = \";;\"\n").unwrap();
        assert!(config.text_options().is_err());

        assert!(ToolboxConfig::from_toml_str("[report]\nmode = \"gross\"\n").is_err());
        assert!(ToolboxConfig::default().load_definition().is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolbox.toml");
        std::fs::write(&path, "[parser]\ndefinition = \"parser.txt\"\n").unwrap();
        let config = ToolboxConfig::load(&path).unwrap();
        assert_eq!(config.parser.definition, Some(dir.path().join("parser.txt")));
    }

    #[test]
    fn test_no_taxa_file_gives_empty_table() {
        let taxa = ToolboxConfig::default().load_taxa().unwrap();
        assert!(taxa.is_empty());
    }
}
