use super::{NodeState, NodeType, calculate, node_name, referenced_node};
use crate::core::data::Histogram1D;
use crate::core::ids::NodeId;
use crate::core::keywords::{KeywordDefault, KeywordSpec};
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::lifecycle::Phase;
use crate::engine::tree::ProcedureTree;
use tracing::info;

pub static KEYWORDS: [KeywordSpec; 2] = [
    KeywordSpec {
        name: "QuantityX",
        description: "Calculate node whose value is binned",
        default: KeywordDefault::Node {
            allowed: &[NodeType::CalculateDistance],
            only_in_scope: true,
        },
    },
    KeywordSpec {
        name: "RangeX",
        description: "Histogram minimum, maximum and bin width",
        default: KeywordDefault::Bins {
            min: 0.0,
            max: 10.0,
            width: 0.05,
        },
    },
];

pub fn histogram(tree: &ProcedureTree, node: NodeId) -> Option<&Histogram1D> {
    match &tree.node(node)?.state {
        NodeState::Collect1D(histogram) => histogram.as_ref(),
        _ => None,
    }
}

fn histogram_mut(tree: &mut ProcedureTree, node: NodeId) -> Option<&mut Histogram1D> {
    match &mut tree.node_mut(node)?.state {
        NodeState::Collect1D(histogram) => histogram.as_mut(),
        _ => None,
    }
}

pub(crate) fn prepare(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    referenced_node(tree, node, "QuantityX")?;

    let (min, max, width) = tree
        .node(node)
        .and_then(|n| n.keywords.bins("RangeX"))
        .ok_or(NodeError::MissingKeyword { keyword: "RangeX" })?;
    let histogram = Histogram1D::new(min, max, width).ok_or_else(|| NodeError::InvalidKeyword {
        keyword: "RangeX",
        reason: format!("range {} to {} with bin width {} is empty", min, max, width),
    })?;
    if let Some(n) = tree.node_mut(node) {
        n.state = NodeState::Collect1D(Some(histogram));
    }

    tree.run_branch(node, Phase::Prepare, ctx)
}

pub(crate) fn execute(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let quantity = referenced_node(tree, node, "QuantityX")?;
    let value = calculate::value(tree, quantity).ok_or_else(|| {
        NodeError::NoData(format!(
            "Node '{}' provides no value",
            node_name(tree, quantity)
        ))
    })?;

    let binned = histogram_mut(tree, node)
        .ok_or_else(|| NodeError::NoData("histogram has not been prepared".into()))?
        .bin(value);
    if binned {
        tree.run_branch(node, Phase::Execute, ctx)?;
    }
    Ok(())
}

pub(crate) fn finalise(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    if let Some(histogram) = histogram(tree, node) {
        info!(
            node = %node_name(tree, node),
            binned = histogram.n_binned(),
            missed = histogram.n_missed(),
            "Histogram collected over {} bins",
            histogram.n_bins()
        );
    }
    tree.run_branch(node, Phase::Finalise, ctx)
}
