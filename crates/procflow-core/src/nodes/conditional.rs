use super::evaluate_keyword;
use crate::core::ids::NodeId;
use crate::core::keywords::{KeywordDefault, KeywordSpec};
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::lifecycle::Phase;
use crate::engine::tree::ProcedureTree;

pub static KEYWORDS: [KeywordSpec; 2] = [
    KeywordSpec {
        name: "Value",
        description: "Value to test",
        default: KeywordDefault::Value(0.0),
    },
    KeywordSpec {
        name: "ValueRange",
        description: "Inclusive range within which the Then branch runs",
        default: KeywordDefault::Range { min: 0.0, max: 1.0 },
    },
];

pub(crate) fn prepare(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    tree.run_branch(node, Phase::Prepare, ctx)
}

pub(crate) fn execute(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let value = evaluate_keyword(tree, node, "Value")?;
    let (min, max) = tree
        .node(node)
        .and_then(|n| n.keywords.range("ValueRange"))
        .ok_or(NodeError::MissingKeyword {
            keyword: "ValueRange",
        })?;

    if (min..=max).contains(&value) {
        tree.run_branch(node, Phase::Execute, ctx)?;
    }
    Ok(())
}

pub(crate) fn finalise(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    tree.run_branch(node, Phase::Finalise, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::configuration::Configuration;
    use crate::core::context::NodeContext;
    use crate::core::expression::NodeValue;
    use crate::core::keywords::KeywordData;
    use crate::core::parameter::ExpressionValue;
    use crate::engine::registry::NodeRegistry;
    use crate::nodes::NodeType;

    fn run_with_x(x: f64) -> f64 {
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(NodeContext::Generation, None, "Generator");
        let globals = NodeRegistry::create(&mut tree, NodeType::Parameters);
        tree.append(root, globals, None);
        tree.add_parameter(globals, "x", ExpressionValue::Double(x));

        let condition = NodeRegistry::create(&mut tree, NodeType::IfValueInRange);
        tree.append(root, condition, None);
        let keywords = &mut tree.node_mut(condition).unwrap().keywords;
        keywords.set("Value", KeywordData::Value(NodeValue::from_text("x * 2")));
        keywords.set("ValueRange", KeywordData::Range { min: 1.0, max: 4.0 });
        let then = tree.node(condition).unwrap().branch().unwrap();

        let temperature = NodeRegistry::create(&mut tree, NodeType::Temperature);
        tree.append(then, temperature, None);
        tree.node_mut(temperature).unwrap().keywords.set(
            "Temperature",
            KeywordData::Value(NodeValue::Constant(500.0)),
        );

        let mut config = Configuration::new(10.0);
        let mut ctx = ProcedureContext::new(&mut config);
        tree.prepare_sequence(root, &mut ctx).unwrap();
        tree.execute_sequence(root, &mut ctx).unwrap();
        config.temperature
    }

    #[test]
    fn then_branch_runs_only_within_range() {
        assert_eq!(run_with_x(1.0), 500.0);
        assert_eq!(run_with_x(2.0), 500.0);
        assert_eq!(run_with_x(2.5), 300.0);
        assert_eq!(run_with_x(0.1), 300.0);
    }
}
