use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::parser::NodeLevel;

/// Handle to a node inside a [`Dataset`](super::Dataset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Level of a node in the dataset tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Visit,
    Sample,
    Variable,
}

impl NodeKind {
    /// The only kind allowed directly below this one.
    pub fn child_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Root => Some(NodeKind::Visit),
            NodeKind::Visit => Some(NodeKind::Sample),
            NodeKind::Sample => Some(NodeKind::Variable),
            NodeKind::Variable => None,
        }
    }

    /// Node kind addressed by a parser definition level. INFO rows address no node.
    pub fn from_level(level: NodeLevel) -> Option<NodeKind> {
        match level {
            NodeLevel::Info => None,
            NodeLevel::Visit => Some(NodeKind::Visit),
            NodeLevel::Sample => Some(NodeKind::Sample),
            NodeLevel::Variable => Some(NodeKind::Variable),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Root => write!(f, "Root"),
            NodeKind::Visit => write!(f, "Visit"),
            NodeKind::Sample => write!(f, "Sample"),
            NodeKind::Variable => write!(f, "Variable"),
        }
    }
}

/// A node of the dataset tree: a field map plus its place in the tree.
///
/// Values are kept as strings; the typed getters parse on access.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) warnings: Vec<String>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
            children: Vec::new(),
            parent,
            warnings: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Screening messages attached to this node.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Field value, or `""` when absent.
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.trim().parse().ok()
    }

    /// Field parsed as an ISO `YYYY-MM-DD` date.
    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.get(key)?.trim(), "%Y-%m-%d").ok()
    }

    /// Insert or overwrite a field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.fields.remove(key)
    }
}
