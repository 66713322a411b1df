//! Import of plankton monitoring tables into a Visit → Sample → Variable
//! tree, taxonomic aggregation and species-by-sample reports.
//!
//! ```no_run
//! use plankton_toolbox::{ImportManager, ParserDefinition, TextOptions};
//!
//! let definition = ParserDefinition::from_file("parser.txt", Some("Import"), Some("Export"), None)?;
//! let outcome = ImportManager::new(definition).import_text_file("BY31_2012.txt", TextOptions::default())?;
//! println!("{} variables", outcome.dataset.num_variables());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod parser;
pub mod report;
pub mod table;
pub mod taxa;
pub mod visualization;

pub use analysis::{aggregate, Analyzer, TaxonRank};
pub use config::ToolboxConfig;
pub use error::{ImportError, ReadError, ToolboxError};
pub use import::{import, ImportManager, ImportOutcome, ScreeningWarning};
pub use models::{Dataset, Node, NodeId, NodeKind};
pub use parser::{NodeLevel, ParserDefinition};
pub use report::{generate, ReportMode, ReportTable};
pub use table::{TableReader, TableView, TextOptions};
pub use taxa::{Rank, TaxaTable, TaxonLookup};
