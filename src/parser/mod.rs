mod command;
mod definition;

pub use command::{Command, FieldType};
pub use definition::{ColumnInfo, ImportRow, NodeLevel, ParserDefinition, SpreadsheetOffsets};
