mod dataset;
mod node;

pub use dataset::Dataset;
pub use node::{Node, NodeId, NodeKind};
