use super::tree::ProcedureTree;
use crate::core::ids::NodeId;
use crate::core::node::ProcedureNode;
use crate::nodes::{self, NodeType};

/// The single constructor for node kinds.
///
/// Creating a node allocates it in the tree, gives it its kind's default keywords,
/// creates its branch sequence (owned by the new node) if the kind has one, and
/// declares the parameters the kind exposes. The node is left unnamed and unscoped
/// until it is appended to a sequence.
pub struct NodeRegistry;

impl NodeRegistry {
    pub fn create(tree: &mut ProcedureTree, node_type: NodeType) -> NodeId {
        let id = tree.insert_node(ProcedureNode::new(node_type));

        if let Some(branch) = node_type.branch() {
            let sequence = tree.create_sequence(branch.context, Some(id), branch.keyword);
            tree.set_branch(id, sequence);
        }

        nodes::initialise(tree, id);
        id
    }

    /// Creates a node from its type keyword, case-insensitively.
    pub fn create_from_keyword(tree: &mut ProcedureTree, keyword: &str) -> Option<NodeId> {
        NodeType::from_keyword(keyword).map(|node_type| Self::create(tree, node_type))
    }

    /// Frees a node that was created but never appended to a sequence.
    pub fn discard(tree: &mut ProcedureTree, node: NodeId) {
        if tree.node(node).is_some_and(|n| n.scope().is_none()) {
            tree.free_node(node);
        }
    }
}
