use super::evaluate_keyword;
use crate::core::ids::NodeId;
use crate::core::keywords::{KeywordDefault, KeywordSpec};
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::tree::ProcedureTree;
use tracing::debug;

pub static KEYWORDS: [KeywordSpec; 1] = [KeywordSpec {
    name: "Temperature",
    description: "Temperature to apply to the configuration, in Kelvin",
    default: KeywordDefault::Value(300.0),
}];

pub(crate) fn execute(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let temperature = evaluate_keyword(tree, node, "Temperature")?;
    if temperature < 0.0 {
        return Err(NodeError::InvalidKeyword {
            keyword: "Temperature",
            reason: format!("{} K is below absolute zero", temperature),
        });
    }
    ctx.configuration.temperature = temperature;
    debug!(iteration = ctx.iteration(), "Set configuration temperature to {} K", temperature);
    Ok(())
}
