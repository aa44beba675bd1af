//! Name and parameter resolution over the procedure tree.
//!
//! Two lookup strategies are provided:
//!
//! - **Scoped** lookups (`*_in_scope`) implement declare-before-use visibility. The
//!   search window starts at the querying node and walks backward to the start of its
//!   sequence, so nodes declared later are invisible. When the window is exhausted the
//!   search escalates to the sequence containing the owner of the current sequence,
//!   with the owner itself as the new querying node, until a root is reached.
//! - **Global** lookups (`*_exists`) bubble up to the root sequence and search every
//!   node and branch depth-first, irrespective of declaration order.
//!
//! The querying node is included in its own window, which makes an owner node visible
//! from inside its branch and lets a node see its own parameters.

use super::tree::ProcedureTree;
use crate::core::expression::{ExpressionError, NodeValue};
use crate::core::ids::{NodeId, SequenceId};
use crate::core::parameter::ParameterRef;
use crate::nodes::NodeType;

/// Reverse view over a sequence's nodes, from the querying node back to the start.
struct QueryRange<'a> {
    window: &'a [NodeId],
}

impl<'a> QueryRange<'a> {
    /// An absent or foreign querying node yields an empty window.
    fn new(nodes: &'a [NodeId], querying: Option<NodeId>) -> Self {
        let end = querying
            .and_then(|q| nodes.iter().position(|&n| n == q))
            .map_or(0, |position| position + 1);
        Self {
            window: &nodes[..end],
        }
    }

    fn iter(&self) -> impl Iterator<Item = NodeId> + 'a {
        self.window.iter().rev().copied()
    }
}

fn type_matches(filter: &[NodeType], node_type: NodeType) -> bool {
    filter.is_empty() || filter.contains(&node_type)
}

impl ProcedureTree {
    /// Walks the scope chain from `sequence`, yielding each visible node in turn.
    ///
    /// The visitor returns `Some` to stop the walk with a result.
    fn walk_scope<T>(
        &self,
        sequence: SequenceId,
        querying: Option<NodeId>,
        mut visit: impl FnMut(NodeId) -> Option<T>,
    ) -> Option<T> {
        let mut current = Some((sequence, querying));
        while let Some((seq_id, origin)) = current {
            let seq = self.sequence(seq_id)?;
            for id in QueryRange::new(seq.nodes(), origin).iter() {
                if let Some(found) = visit(id) {
                    return Some(found);
                }
            }
            current = seq
                .owner()
                .and_then(|owner| Some((self.node(owner)?.scope()?, Some(owner))));
        }
        None
    }

    /// Returns the topmost sequence reachable from `sequence` through owner links.
    pub fn root_of(&self, sequence: SequenceId) -> SequenceId {
        let mut current = sequence;
        while let Some(parent) = self
            .sequence(current)
            .and_then(|seq| seq.owner())
            .and_then(|owner| self.node(owner))
            .and_then(|owner| owner.scope())
        {
            current = parent;
        }
        current
    }

    /// Depth-first search over a sequence and all of its branches.
    fn find_in_subtree<T>(
        &self,
        sequence: SequenceId,
        visit: &mut impl FnMut(NodeId) -> Option<T>,
    ) -> Option<T> {
        let seq = self.sequence(sequence)?;
        for &id in seq.nodes() {
            if let Some(found) = visit(id) {
                return Some(found);
            }
            if let Some(branch) = self.node(id).and_then(|n| n.branch()) {
                if let Some(found) = self.find_in_subtree(branch, visit) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn name_matches(
        &self,
        id: NodeId,
        name: &str,
        exclude: Option<NodeId>,
        type_filter: &[NodeType],
    ) -> bool {
        Some(id) != exclude
            && self
                .node(id)
                .is_some_and(|n| n.has_name(name) && type_matches(type_filter, n.node_type()))
    }

    /// Finds a named node visible from `querying` under declare-before-use rules.
    ///
    /// # Arguments
    ///
    /// * `sequence` - The sequence the search starts in.
    /// * `querying` - The node the lookup originates from; `None` starts with an empty
    ///   window in `sequence` and searches only enclosing scopes.
    /// * `name` - The name to look for (case-insensitive).
    /// * `exclude` - A node to ignore, typically the node being named.
    /// * `type_filter` - Acceptable node types; empty accepts any.
    pub fn node_in_scope(
        &self,
        sequence: SequenceId,
        querying: Option<NodeId>,
        name: &str,
        exclude: Option<NodeId>,
        type_filter: &[NodeType],
    ) -> Option<NodeId> {
        self.walk_scope(sequence, querying, |id| {
            self.name_matches(id, name, exclude, type_filter)
                .then_some(id)
        })
    }

    /// Lists every node visible from `querying`, nearest first.
    pub fn nodes_in_scope(
        &self,
        sequence: SequenceId,
        querying: Option<NodeId>,
        type_filter: &[NodeType],
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk_scope(sequence, querying, |id| {
            if self
                .node(id)
                .is_some_and(|n| type_matches(type_filter, n.node_type()))
            {
                found.push(id);
            }
            None::<()>
        });
        found
    }

    /// Finds a named node anywhere in the procedure containing `sequence`.
    pub fn node_exists(
        &self,
        sequence: SequenceId,
        name: &str,
        exclude: Option<NodeId>,
        type_filter: &[NodeType],
    ) -> Option<NodeId> {
        let root = self.root_of(sequence);
        self.find_in_subtree(root, &mut |id| {
            self.name_matches(id, name, exclude, type_filter)
                .then_some(id)
        })
    }

    /// Finds a named node within one sequence and its branches only.
    pub fn node_in_sequence(&self, sequence: SequenceId, name: &str) -> Option<NodeId> {
        self.find_in_subtree(sequence, &mut |id| {
            self.name_matches(id, name, None, &[]).then_some(id)
        })
    }

    /// Lists every node of a sequence and its branches, depth-first.
    pub fn nodes(&self, sequence: SequenceId, type_filter: &[NodeType]) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.find_in_subtree(sequence, &mut |id| {
            if self
                .node(id)
                .is_some_and(|n| type_matches(type_filter, n.node_type()))
            {
                found.push(id);
            }
            None::<()>
        });
        found
    }

    fn parameter_matching(
        &self,
        id: NodeId,
        name: &str,
        exclude: Option<ParameterRef>,
    ) -> Option<ParameterRef> {
        self.node(id)?
            .parameters()
            .iter()
            .enumerate()
            .map(|(index, p)| (ParameterRef { node: id, index }, p))
            .find(|(reference, p)| Some(*reference) != exclude && p.matches(name))
            .map(|(reference, _)| reference)
    }

    /// Finds a parameter by its external name under declare-before-use rules.
    pub fn parameter_in_scope(
        &self,
        sequence: SequenceId,
        querying: Option<NodeId>,
        name: &str,
        exclude: Option<ParameterRef>,
    ) -> Option<ParameterRef> {
        self.walk_scope(sequence, querying, |id| {
            self.parameter_matching(id, name, exclude)
        })
    }

    /// Lists every parameter visible from `querying`, nearest declaring node first.
    pub fn parameters_in_scope(
        &self,
        sequence: SequenceId,
        querying: Option<NodeId>,
    ) -> Vec<ParameterRef> {
        let mut found = Vec::new();
        self.walk_scope(sequence, querying, |id| {
            if let Some(node) = self.node(id) {
                found.extend(
                    (0..node.parameters().len()).map(|index| ParameterRef { node: id, index }),
                );
            }
            None::<()>
        });
        found
    }

    /// Finds a parameter by its external name anywhere in the procedure.
    pub fn parameter_exists(
        &self,
        sequence: SequenceId,
        name: &str,
        exclude: Option<ParameterRef>,
    ) -> Option<ParameterRef> {
        let root = self.root_of(sequence);
        self.find_in_subtree(root, &mut |id| self.parameter_matching(id, name, exclude))
    }

    /// Scoped node lookup originating from `node`.
    pub fn get_node(&self, node: NodeId, name: &str, type_filter: &[NodeType]) -> Option<NodeId> {
        let scope = self.node(node)?.scope()?;
        self.node_in_scope(scope, Some(node), name, None, type_filter)
    }

    /// Every node visible from `node`.
    pub fn get_nodes(&self, node: NodeId, type_filter: &[NodeType]) -> Vec<NodeId> {
        match self.node(node).and_then(|n| n.scope()) {
            Some(scope) => self.nodes_in_scope(scope, Some(node), type_filter),
            None => Vec::new(),
        }
    }

    /// Scoped parameter lookup originating from `node`.
    pub fn get_parameter(&self, node: NodeId, name: &str) -> Option<ParameterRef> {
        let scope = self.node(node)?.scope()?;
        self.parameter_in_scope(scope, Some(node), name, None)
    }

    /// Every parameter visible from `node`.
    pub fn get_parameters(&self, node: NodeId) -> Vec<ParameterRef> {
        match self.node(node).and_then(|n| n.scope()) {
            Some(scope) => self.parameters_in_scope(scope, Some(node)),
            None => Vec::new(),
        }
    }

    /// Evaluates a node value with identifiers resolved through the parameters
    /// visible from `node`.
    pub fn evaluate(&self, node: NodeId, value: &NodeValue) -> Result<f64, ExpressionError> {
        value.evaluate(|name| {
            self.get_parameter(node, name)
                .and_then(|reference| self.parameter(reference))
                .map(|p| p.value().as_f64())
        })
    }
}
