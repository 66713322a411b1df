//! The small command language found in the import profile column.
//!
//! A command is either a literal, assigned as-is, or a call such as
//! `$Float('Counted units/l')` that pulls a value from a source column.

use std::fmt;

/// Declared type of a dataset field, used when reformatting and screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Date,
}

impl FieldType {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Date => write!(f, "date"),
        }
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "string" => Ok(FieldType::Text),
            "integer" | "int" => Ok(FieldType::Integer),
            "float" | "number" => Ok(FieldType::Float),
            "date" => Ok(FieldType::Date),
            _ => Err(format!("unknown field type '{s}'")),
        }
    }
}

/// A parsed import command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Constant assigned to every node.
    Literal(String),
    /// Value copied from a source column.
    Column { column: String, field_type: FieldType },
    /// Measurement split into its own Variable during reorganization.
    /// The import row key is the parameter name.
    Parameter { column: String, unit: String },
    /// Value copied from a source column and moved to the parent node.
    Promote { column: String },
}

impl Command {
    pub fn parse(command: &str) -> Result<Self, String> {
        let command = command.trim();
        let Some(call) = command.strip_prefix('$') else {
            return Ok(Command::Literal(command.to_string()));
        };

        let (open, close) = match (call.find('('), call.rfind(')')) {
            (Some(open), Some(close)) if open < close => (open, close),
            _ => return Err(format!("malformed call '{command}'")),
        };
        let name = call[..open].trim().to_lowercase();
        let args = split_args(&call[open + 1..close])?;

        let single = |args: &[String]| -> Result<String, String> {
            match args {
                [column] if !column.is_empty() => Ok(column.clone()),
                _ => Err(format!("'{command}' expects one column name")),
            }
        };

        match name.as_str() {
            "text" => Ok(Command::Column {
                column: single(&args)?,
                field_type: FieldType::Text,
            }),
            "integer" => Ok(Command::Column {
                column: single(&args)?,
                field_type: FieldType::Integer,
            }),
            "float" => Ok(Command::Column {
                column: single(&args)?,
                field_type: FieldType::Float,
            }),
            "date" => Ok(Command::Column {
                column: single(&args)?,
                field_type: FieldType::Date,
            }),
            "promote" => Ok(Command::Promote {
                column: single(&args)?,
            }),
            "parameter" => match args.as_slice() {
                [column] if !column.is_empty() => Ok(Command::Parameter {
                    column: column.clone(),
                    unit: String::new(),
                }),
                [column, unit] if !column.is_empty() => Ok(Command::Parameter {
                    column: column.clone(),
                    unit: unit.clone(),
                }),
                _ => Err(format!("'{command}' expects a column name and an optional unit")),
            },
            _ => Err(format!("unknown command '${name}'")),
        }
    }

    /// Source column read by this command, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Command::Literal(_) => None,
            Command::Column { column, .. }
            | Command::Parameter { column, .. }
            | Command::Promote { column } => Some(column),
        }
    }

    /// Type implied by the command itself.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Command::Literal(_) => None,
            Command::Column { field_type, .. } => Some(*field_type),
            Command::Parameter { .. } => Some(FieldType::Float),
            Command::Promote { .. } => Some(FieldType::Text),
        }
    }
}

fn split_args(raw: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, ',') => args.push(std::mem::take(&mut current).trim().to_string()),
            (None, c) => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(format!("unterminated quote in '{raw}'"));
    }
    let last = current.trim().to_string();
    if !last.is_empty() || !args.is_empty() {
        args.push(last);
    }
    Ok(args)
}
