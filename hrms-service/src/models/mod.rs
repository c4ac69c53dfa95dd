//! Domain models for hrms-service.

mod node;
mod tree;

pub use node::{Node, NodeKind, NodeStatus, Scope};
pub use tree::TreeNode;
