use super::{NodeType, evaluate_keyword, process};
use crate::core::ids::NodeId;
use crate::core::keywords::{KeywordDefault, KeywordSpec};
use crate::engine::error::NodeError;
use crate::engine::tree::ProcedureTree;

pub static KEYWORDS: [KeywordSpec; 1] = [KeywordSpec {
    name: "Value",
    description: "Divisor applied to the processed data",
    default: KeywordDefault::Value(1.0),
}];

/// The processing node whose `Normalisation` branch holds `node`.
fn target_processor(tree: &ProcedureTree, node: NodeId) -> Option<NodeId> {
    let scope = tree.node(node)?.scope()?;
    let owner = tree.sequence(scope)?.owner()?;
    (tree.node(owner)?.node_type() == NodeType::Process1D).then_some(owner)
}

pub(crate) fn execute(tree: &mut ProcedureTree, node: NodeId) -> Result<(), NodeError> {
    let divisor = evaluate_keyword(tree, node, "Value")?;
    if divisor == 0.0 {
        return Err(NodeError::InvalidKeyword {
            keyword: "Value",
            reason: "cannot divide by zero".into(),
        });
    }

    let processor = target_processor(tree, node).ok_or_else(|| {
        NodeError::NoData("no processed data is available to operate on".into())
    })?;
    if let Some(data) = process::data_mut(tree, processor) {
        data.divide(divisor);
    }
    Ok(())
}
