use super::context::ProcedureContext;
use super::error::NodeError;
use super::tree::ProcedureTree;
use crate::core::ids::{NodeId, SequenceId};
use crate::nodes;
use std::fmt;
use tracing::error;

/// One of the three lifecycle phases driven over a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Execute,
    Finalise,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Prepare => "prepare",
            Phase::Execute => "execute",
            Phase::Finalise => "finalise",
        })
    }
}

impl ProcedureTree {
    /// Runs one phase of a single node.
    pub fn run_node(
        &mut self,
        node: NodeId,
        phase: Phase,
        ctx: &mut ProcedureContext,
    ) -> Result<(), NodeError> {
        match phase {
            Phase::Prepare => nodes::prepare(self, node, ctx),
            Phase::Execute => nodes::execute(self, node, ctx),
            Phase::Finalise => nodes::finalise(self, node, ctx),
        }
    }

    /// Runs one phase over the nodes of a sequence, in order.
    ///
    /// Stops at the first node that fails and returns its error, attributed to that
    /// node. Branches are not entered here: each node kind drives its own branch.
    pub fn run_sequence(
        &mut self,
        sequence: SequenceId,
        phase: Phase,
        ctx: &mut ProcedureContext,
    ) -> Result<(), NodeError> {
        let members = match self.sequence(sequence) {
            Some(seq) => seq.nodes().to_vec(),
            None => return Ok(()),
        };

        for id in members {
            if let Err(e) = self.run_node(id, phase, ctx) {
                let (name, node_type) = match self.node(id) {
                    Some(node) => (node.name().to_string(), node.node_type()),
                    None => return Err(e),
                };
                if matches!(e, NodeError::Node { .. }) {
                    return Err(e);
                }
                error!(
                    node = %name,
                    node_type = %node_type,
                    "Node failed to {}: {}",
                    phase,
                    e
                );
                return Err(e.attributed(&name, node_type));
            }
        }

        Ok(())
    }

    pub fn prepare_sequence(
        &mut self,
        sequence: SequenceId,
        ctx: &mut ProcedureContext,
    ) -> Result<(), NodeError> {
        self.run_sequence(sequence, Phase::Prepare, ctx)
    }

    pub fn execute_sequence(
        &mut self,
        sequence: SequenceId,
        ctx: &mut ProcedureContext,
    ) -> Result<(), NodeError> {
        self.run_sequence(sequence, Phase::Execute, ctx)
    }

    pub fn finalise_sequence(
        &mut self,
        sequence: SequenceId,
        ctx: &mut ProcedureContext,
    ) -> Result<(), NodeError> {
        self.run_sequence(sequence, Phase::Finalise, ctx)
    }

    /// Runs a phase over a node's branch, if it has one.
    pub fn run_branch(
        &mut self,
        node: NodeId,
        phase: Phase,
        ctx: &mut ProcedureContext,
    ) -> Result<(), NodeError> {
        match self.node(node).and_then(|n| n.branch()) {
            Some(branch) => self.run_sequence(branch, phase, ctx),
            None => Ok(()),
        }
    }
}
