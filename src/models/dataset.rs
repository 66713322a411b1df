use std::collections::BTreeMap;
use std::ops::Index;

use super::{Node, NodeId, NodeKind};
use crate::parser::{ColumnInfo, NodeLevel, ParserDefinition};
use crate::table::TableView;

/// A Visit → Sample → Variable tree stored in a flat arena.
///
/// Nodes refer to each other by [`NodeId`]. Removing a node frees its whole
/// subtree; the ids of freed nodes are never reused.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Name or identifier, usually the source file stem
    pub name: String,
    nodes: Vec<Option<Node>>,
    definition: ParserDefinition,
}

impl Index<NodeId> for Dataset {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {id:?} has been removed from dataset '{}'", self.name),
        }
    }
}

impl Dataset {
    /// Create an empty dataset holding only the root node.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_definition(name, ParserDefinition::default())
    }

    pub fn with_definition(name: impl Into<String>, definition: ParserDefinition) -> Self {
        Self {
            name: name.into(),
            nodes: vec![Some(Node::new(NodeKind::Root, None))],
            definition,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Parser definition the dataset was imported with.
    pub fn definition(&self) -> &ParserDefinition {
        &self.definition
    }

    pub fn export_columns(&self) -> &[ColumnInfo] {
        self.definition.export_columns()
    }

    pub fn semantics(&self) -> &[ColumnInfo] {
        self.definition.semantics()
    }

    /// Append a child of the next level down. Returns `None` for a Variable
    /// parent or a removed node.
    pub fn add_child(&mut self, parent: NodeId) -> Option<NodeId> {
        let kind = self.get(parent)?.kind.child_kind()?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(kind, Some(parent))));
        self.get_mut(parent)?.children.push(id);
        Some(id)
    }

    pub fn add_visit(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(NodeKind::Visit, Some(NodeId(0)))));
        if let Some(root) = self.get_mut(NodeId(0)) {
            root.children.push(id);
        }
        id
    }

    /// Field value on a node, `""` when the field or node is absent.
    pub fn field(&self, id: NodeId, key: &str) -> &str {
        self.get(id).map(|n| n.get_str(key)).unwrap_or("")
    }

    pub fn set_field(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        if let Some(node) = self.get_mut(id) {
            node.set(key, value);
        }
    }

    pub(crate) fn add_warning(&mut self, id: NodeId, message: String) {
        if let Some(node) = self.get_mut(id) {
            node.warnings.push(message);
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn visits(&self) -> &[NodeId] {
        self.children(self.root())
    }

    /// All samples in traversal order.
    pub fn samples(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.visits()
            .iter()
            .flat_map(move |&visit| self.children(visit).iter().copied())
    }

    /// All variables in traversal order.
    pub fn variables(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.samples()
            .flat_map(move |sample| self.children(sample).iter().copied())
    }

    /// All live nodes, root first, in depth-first order.
    pub fn iter_depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    pub fn num_visits(&self) -> usize {
        self.visits().len()
    }

    pub fn num_samples(&self) -> usize {
        self.samples().count()
    }

    pub fn num_variables(&self) -> usize {
        self.variables().count()
    }

    /// Nearest node of `kind` on the path from `id` up to the root.
    pub fn ancestor_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.get(cur)?;
            if node.kind == kind {
                return Some(cur);
            }
            current = node.parent;
        }
        None
    }

    /// Detach a node from its parent and free its subtree.
    pub fn remove_node(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        let parent = self.get(id).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(cur.0).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
    }

    /// Swap the children of `parent` for freshly built nodes, one per field
    /// map, in order. The new list is built completely before the old
    /// children are freed.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        new_children: Vec<BTreeMap<String, String>>,
    ) -> Vec<NodeId> {
        let Some(kind) = self.get(parent).and_then(|n| n.kind.child_kind()) else {
            return Vec::new();
        };

        let mut ids = Vec::with_capacity(new_children.len());
        for fields in new_children {
            let id = NodeId(self.nodes.len());
            let mut node = Node::new(kind, Some(parent));
            node.fields = fields;
            self.nodes.push(Some(node));
            ids.push(id);
        }

        let old = match self.get_mut(parent) {
            Some(node) => std::mem::replace(&mut node.children, ids.clone()),
            None => Vec::new(),
        };
        for child in old {
            self.free_subtree(child);
        }
        ids
    }

    /// Move a visit subtree from another dataset under this root.
    pub(crate) fn graft_visits(&mut self, other: &Dataset) {
        for &visit in other.visits() {
            let new_visit = self.add_visit();
            self.copy_fields(other, visit, new_visit);
            for &sample in other.children(visit) {
                let Some(new_sample) = self.add_child(new_visit) else {
                    continue;
                };
                self.copy_fields(other, sample, new_sample);
                for &variable in other.children(sample) {
                    if let Some(new_variable) = self.add_child(new_sample) {
                        self.copy_fields(other, variable, new_variable);
                    }
                }
            }
        }
    }

    fn copy_fields(&mut self, other: &Dataset, from: NodeId, to: NodeId) {
        if let (Some(source), Some(target)) = (other.get(from), self.get_mut(to)) {
            target.fields = source.fields.clone();
            target.warnings = source.warnings.clone();
        }
    }

    /// Flatten to one row per Variable using the export columns. Each cell is
    /// read from the Variable or from its Sample or Visit ancestor.
    pub fn export_table(&self) -> TableView {
        let columns = self.export_columns();
        let header = columns.iter().map(|c| c.header.clone()).collect();

        let rows = self
            .variables()
            .map(|variable| {
                columns
                    .iter()
                    .map(|column| {
                        let kind = match column.node_level {
                            NodeLevel::Visit => NodeKind::Visit,
                            NodeLevel::Sample => NodeKind::Sample,
                            NodeLevel::Variable | NodeLevel::Info => NodeKind::Variable,
                        };
                        self.ancestor_of_kind(variable, kind)
                            .map(|id| self.field(id, &column.key).to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        TableView::new(header, rows)
    }
}
