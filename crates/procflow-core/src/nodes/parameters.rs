//! The `Parameters` node: user-declared global parameters.
//!
//! Its body holds `Parameter <name> <value>` lines instead of keywords, and the
//! parameters it declares are exposed under their bare names.

use crate::core::ids::NodeId;
use crate::core::io::script::ScriptLine;
use crate::core::keywords::ParseResult;
use crate::core::node::ProcedureNode;
use crate::core::parameter::ExpressionValue;
use crate::engine::error::Diagnostics;
use crate::engine::tree::ProcedureTree;

pub const PARAMETER_KEYWORD: &str = "Parameter";

/// Declares a parameter on a `Parameters` node, rejecting names already in use.
pub fn declare(
    tree: &mut ProcedureTree,
    node: NodeId,
    name: &str,
    value: ExpressionValue,
) -> Result<(), String> {
    let Some(scope) = tree.node(node).and_then(|n| n.scope()) else {
        return Err(format!("Parameter '{}' cannot be declared on an unscoped node", name));
    };
    if tree.parameter_exists(scope, name, None).is_some() {
        return Err(format!("A parameter named '{}' already exists", name));
    }
    tree.add_parameter(node, name, value);
    Ok(())
}

/// Reads one `Parameter <name> <value>` line into the node.
pub fn deserialise_line(
    tree: &mut ProcedureTree,
    node: NodeId,
    line: &ScriptLine,
    diagnostics: &mut Diagnostics,
) -> ParseResult {
    if line.n_args() != 3 {
        diagnostics.report(
            line.number,
            format!(
                "'{}' expects a name and a value, but {} argument(s) were given",
                PARAMETER_KEYWORD,
                line.n_args() - 1
            ),
        );
        return ParseResult::Failed;
    }

    let name = line.arg_str(1);
    let Some(value) = ExpressionValue::parse(line.arg_str(2)) else {
        diagnostics.report(
            line.number,
            format!("Value '{}' for parameter '{}' is not a number", line.arg_str(2), name),
        );
        return ParseResult::Failed;
    };

    match declare(tree, node, name, value) {
        Ok(()) => ParseResult::Success,
        Err(message) => {
            diagnostics.report(line.number, message);
            ParseResult::Failed
        }
    }
}

/// Writes the node's parameters as body lines.
pub fn serialise_lines(node: &ProcedureNode) -> Vec<String> {
    node.parameters()
        .iter()
        .map(|p| format!("{}  {}  {}", PARAMETER_KEYWORD, p.base_name(), p.value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::NodeContext;
    use crate::core::io::script::tokenize_line;
    use crate::engine::registry::NodeRegistry;
    use crate::nodes::NodeType;

    #[test]
    fn parameter_lines_declare_unprefixed_parameters() {
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(NodeContext::Analysis, None, "Analyser");
        let node = NodeRegistry::create(&mut tree, NodeType::Parameters);
        tree.set_name(node, "Globals");
        tree.append(root, node, None);
        let mut diagnostics = Diagnostics::new();

        let line = ScriptLine::new(2, tokenize_line("Parameter  rMax  4.5"));
        assert_eq!(
            deserialise_line(&mut tree, node, &line, &mut diagnostics),
            ParseResult::Success
        );
        let duplicate = ScriptLine::new(3, tokenize_line("Parameter  RMAX  1"));
        assert_eq!(
            deserialise_line(&mut tree, node, &duplicate, &mut diagnostics),
            ParseResult::Failed
        );
        let malformed = ScriptLine::new(4, tokenize_line("Parameter  n"));
        assert_eq!(
            deserialise_line(&mut tree, node, &malformed, &mut diagnostics),
            ParseResult::Failed
        );

        assert_eq!(diagnostics.len(), 2);
        let declared = tree.node(node).unwrap();
        assert_eq!(declared.parameters().len(), 1);
        assert_eq!(declared.parameters()[0].name(), "rMax");
        assert_eq!(serialise_lines(declared), vec!["Parameter  rMax  4.5"]);
    }
}
