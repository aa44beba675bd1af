use super::error::StructuralError;
use crate::core::context::NodeContext;
use crate::core::ids::{NodeId, SequenceId};
use crate::core::node::ProcedureNode;
use crate::core::parameter::{ExpressionValue, Parameter, ParameterRef};
use crate::core::sequence::NodeSequence;
use slotmap::SlotMap;
use tracing::debug;

/// Arena owning every node and sequence of a procedure.
///
/// Ownership is expressed by membership: a sequence owns the nodes listed in it and a
/// node owns its branch sequence. Scope and owner back-references are plain keys, so
/// removing a node frees its whole subtree and leaves any other reference to it stale
/// rather than dangling.
#[derive(Debug, Clone, Default)]
pub struct ProcedureTree {
    /// Primary storage for nodes.
    nodes: SlotMap<NodeId, ProcedureNode>,
    /// Primary storage for sequences, both roots and branches.
    sequences: SlotMap<SequenceId, NodeSequence>,
}

impl ProcedureTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a node by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The node ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&ProcedureNode)` if the node exists, otherwise `None`.
    pub fn node(&self, id: NodeId) -> Option<&ProcedureNode> {
        self.nodes.get(id)
    }

    /// Retrieves a mutable reference to a node by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The node ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&mut ProcedureNode)` if the node exists, otherwise `None`.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ProcedureNode> {
        self.nodes.get_mut(id)
    }

    /// Retrieves a sequence by its ID.
    pub fn sequence(&self, id: SequenceId) -> Option<&NodeSequence> {
        self.sequences.get(id)
    }

    /// Returns an iterator over every live node, in no particular order.
    pub fn nodes_iter(&self) -> impl Iterator<Item = (NodeId, &ProcedureNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Allocates a new, empty sequence.
    ///
    /// # Arguments
    ///
    /// * `context` - The declared context of the sequence.
    /// * `owner` - The node whose branch this sequence is, or `None` for a root.
    /// * `block_keyword` - Label used to open and close the block in text form.
    ///
    /// # Return
    ///
    /// The ID of the new sequence.
    pub fn create_sequence(
        &mut self,
        context: NodeContext,
        owner: Option<NodeId>,
        block_keyword: &str,
    ) -> SequenceId {
        self.sequences
            .insert(NodeSequence::new(context, owner, block_keyword))
    }

    pub(crate) fn insert_node(&mut self, node: ProcedureNode) -> NodeId {
        self.nodes.insert(node)
    }

    pub(crate) fn set_branch(&mut self, node: NodeId, branch: SequenceId) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.branch = Some(branch);
        }
    }

    /// Resolves the context of a sequence, following "inherit" through owner scopes.
    ///
    /// # Panics
    ///
    /// Panics if the sequence does not exist, or if an "inherit" context cannot be
    /// resolved because the sequence has no owner or the owner is not yet scoped.
    pub fn effective_context(&self, sequence: SequenceId) -> NodeContext {
        let seq = self
            .sequences
            .get(sequence)
            .unwrap_or_else(|| panic!("{}", StructuralError::UnknownSequence));

        if seq.context() != NodeContext::Inherit {
            return seq.context();
        }

        let owner = seq.owner().unwrap_or_else(|| {
            panic!(
                "Sequence '{}' inherits its context but has no owner node",
                seq.block_keyword()
            )
        });
        let owner_scope = self.nodes.get(owner).and_then(|n| n.scope).unwrap_or_else(|| {
            panic!(
                "Sequence '{}' inherits its context but its owner node is not part of any sequence",
                seq.block_keyword()
            )
        });

        self.effective_context(owner_scope)
    }

    /// Appends a node to a sequence, or inserts it at `at_index`.
    ///
    /// The node must be relevant to the sequence's effective context. An unnamed node
    /// receives the first free `<TypeKeyword>NN` name, and an explicit name must not
    /// already be used anywhere in the procedure. On error the node is left untouched
    /// and unscoped.
    ///
    /// # Arguments
    ///
    /// * `sequence` - The sequence to append to.
    /// * `node` - A node created in this tree and not yet part of any sequence.
    /// * `at_index` - Insertion position; `None` (or a position past the end) appends.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] describing the rejected append.
    pub fn try_append(
        &mut self,
        sequence: SequenceId,
        node: NodeId,
        at_index: Option<usize>,
    ) -> Result<(), StructuralError> {
        if !self.sequences.contains_key(sequence) {
            return Err(StructuralError::UnknownSequence);
        }
        let candidate = self.nodes.get(node).ok_or(StructuralError::UnknownNode)?;
        if candidate.scope.is_some() {
            return Err(StructuralError::AlreadyScoped {
                name: candidate.name().to_string(),
            });
        }

        let context = self.effective_context(sequence);
        if !candidate.is_context_relevant(context) {
            return Err(StructuralError::ContextMismatch {
                node: candidate.name().to_string(),
                node_type: candidate.node_type(),
                context,
            });
        }

        if candidate.name().is_empty() {
            let name = self.unique_name(sequence, candidate.node_type().keyword());
            self.nodes[node].set_name(&name);
        } else if self
            .node_exists(sequence, candidate.name(), Some(node), &[])
            .is_some()
        {
            return Err(StructuralError::DuplicateName {
                name: candidate.name().to_string(),
            });
        }

        let seq = &mut self.sequences[sequence];
        match at_index {
            Some(index) if index < seq.nodes.len() => seq.nodes.insert(index, node),
            _ => seq.nodes.push(node),
        }
        let appended = &mut self.nodes[node];
        appended.scope = Some(sequence);
        debug!(
            node = appended.name(),
            node_type = %appended.node_type(),
            "Appended node to sequence '{}'",
            self.sequences[sequence].block_keyword()
        );

        Ok(())
    }

    /// Appends a node to a sequence, treating any rejection as a construction fault.
    ///
    /// # Panics
    ///
    /// Panics with the formatted [`StructuralError`] if [`Self::try_append`] fails.
    pub fn append(&mut self, sequence: SequenceId, node: NodeId, at_index: Option<usize>) {
        if let Err(e) = self.try_append(sequence, node, at_index) {
            panic!("{}", e);
        }
    }

    fn unique_name(&self, sequence: SequenceId, base: &str) -> String {
        (1..)
            .map(|n| format!("{}{:02}", base, n))
            .find(|name| self.node_exists(sequence, name, None, &[]).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Removes a node from a sequence and frees it together with its branch.
    ///
    /// # Return
    ///
    /// Returns `true` if the node was a member of the sequence.
    pub fn remove(&mut self, sequence: SequenceId, node: NodeId) -> bool {
        let Some(seq) = self.sequences.get_mut(sequence) else {
            return false;
        };
        let Some(position) = seq.position(node) else {
            return false;
        };
        seq.nodes.remove(position);
        if let Some(removed) = self.nodes.get(node) {
            debug!(
                node = removed.name(),
                node_type = %removed.node_type(),
                "Removed node from sequence"
            );
        }
        self.free_node(node);
        true
    }

    /// Removes and frees every node of a sequence.
    pub fn clear(&mut self, sequence: SequenceId) {
        let Some(seq) = self.sequences.get_mut(sequence) else {
            return;
        };
        for node in std::mem::take(&mut seq.nodes) {
            self.free_node(node);
        }
    }

    /// Frees a node that is not listed in any sequence, along with its branch.
    pub(crate) fn free_node(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(node) else {
            return;
        };
        if let Some(branch) = removed.branch {
            if let Some(seq) = self.sequences.remove(branch) {
                for child in seq.nodes {
                    self.free_node(child);
                }
            }
        }
    }

    /// Renames a node, sanitising the name and re-prefixing its parameters.
    pub fn set_name(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.set_name(name);
        }
    }

    /// Declares a parameter on a node.
    ///
    /// # Panics
    ///
    /// Panics if the node does not exist.
    pub fn add_parameter(
        &mut self,
        node: NodeId,
        base_name: &str,
        initial_value: ExpressionValue,
    ) -> ParameterRef {
        let owner = self
            .nodes
            .get_mut(node)
            .unwrap_or_else(|| panic!("{}", StructuralError::UnknownNode));
        let index = owner.add_parameter(base_name, initial_value);
        ParameterRef { node, index }
    }

    /// Resolves a parameter handle; stale handles yield `None`.
    pub fn parameter(&self, reference: ParameterRef) -> Option<&Parameter> {
        self.nodes.get(reference.node)?.parameter(reference.index)
    }
}
