use super::context::NodeContext;
use super::ids::NodeId;

/// One lexical scope: an ordered list of nodes.
///
/// The sequence owns its nodes by membership in `nodes`. `owner` is the node whose
/// branch this sequence is, and is absent for a root sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSequence {
    context: NodeContext,
    owner: Option<NodeId>,
    block_keyword: String,
    pub(crate) nodes: Vec<NodeId>,
}

impl NodeSequence {
    pub fn new(context: NodeContext, owner: Option<NodeId>, block_keyword: &str) -> Self {
        Self {
            context,
            owner,
            block_keyword: block_keyword.to_string(),
            nodes: Vec::new(),
        }
    }

    /// The declared context, which may be the unresolved [`NodeContext::Inherit`].
    pub fn context(&self) -> NodeContext {
        self.context
    }

    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    /// Label opening the block in text form; the block is closed by `End<keyword>`.
    pub fn block_keyword(&self) -> &str {
        &self.block_keyword
    }

    pub fn end_keyword(&self) -> String {
        format!("End{}", self.block_keyword)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}
