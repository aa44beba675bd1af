//! The structured (TOML) form of a sequence.
//!
//! A sequence is an array of node tables. Each table holds the node's `type` and `name`,
//! one field per set keyword, a `parameters` table for `Parameters` nodes, and an array
//! under the branch keyword for a non-empty branch:
//!
//! ```toml
//! [[nodes]]
//! type = "Select"
//! name = "A"
//! Site = ["COM"]
//!
//! [[nodes.ForEach]]
//! type = "CalculateDistance"
//! name = "D"
//! I = "A"
//! J = "A"
//! ```

use super::keywords;
use crate::core::ids::{NodeId, SequenceId};
use crate::core::parameter::ExpressionValue;
use crate::engine::error::StructuredError;
use crate::engine::registry::NodeRegistry;
use crate::engine::tree::ProcedureTree;
use crate::nodes::{NodeType, parameters};
use toml::{Table, Value};
use tracing::warn;

const TYPE_FIELD: &str = "type";
const NAME_FIELD: &str = "name";
const PARAMETERS_FIELD: &str = "parameters";

/// Converts the nodes of a sequence to an array of node tables.
pub fn sequence_to_toml(tree: &ProcedureTree, sequence: SequenceId) -> Value {
    let nodes = tree
        .sequence(sequence)
        .map(|seq| {
            seq.nodes()
                .iter()
                .filter_map(|&node| node_to_toml(tree, node))
                .map(Value::Table)
                .collect()
        })
        .unwrap_or_default();
    Value::Array(nodes)
}

fn node_to_toml(tree: &ProcedureTree, id: NodeId) -> Option<Table> {
    let node = tree.node(id)?;
    let mut table = Table::new();
    table.insert(TYPE_FIELD.into(), Value::String(node.node_type().keyword().into()));
    table.insert(NAME_FIELD.into(), Value::String(node.name().into()));

    if node.node_type() == NodeType::Parameters && !node.parameters().is_empty() {
        let declared = node
            .parameters()
            .iter()
            .map(|p| {
                let value = match p.value() {
                    ExpressionValue::Integer(i) => Value::Integer(i),
                    ExpressionValue::Double(d) => Value::Float(d),
                };
                (p.base_name().to_string(), value)
            })
            .collect();
        table.insert(PARAMETERS_FIELD.into(), Value::Table(declared));
    }

    for keyword in node.keywords.iter().filter(|k| k.is_set()) {
        if let Some(value) = keywords::to_toml(tree, &keyword.data) {
            table.insert(keyword.name().into(), value);
        }
    }

    if let (Some(branch), Some(spec)) = (node.branch(), node.node_type().branch()) {
        if tree.sequence(branch).is_some_and(|s| !s.is_empty()) {
            table.insert(spec.keyword.into(), sequence_to_toml(tree, branch));
        }
    }

    Some(table)
}

/// Appends the nodes described by an array of node tables to `sequence`.
///
/// Unlike the text reader this stops at the first problem; `path` locates it in the
/// document (e.g. `nodes[0].ForEach[1]`).
///
/// # Errors
///
/// Returns a [`StructuredError`] for a malformed table, an unknown node type or
/// keyword, a keyword value of the wrong shape, or a rejected append.
pub fn sequence_from_toml(
    tree: &mut ProcedureTree,
    sequence: SequenceId,
    value: &Value,
    path: &str,
) -> Result<(), StructuredError> {
    let entries = value.as_array().ok_or_else(|| StructuredError::UnexpectedType {
        path: path.to_string(),
        expected: "an array of node tables",
    })?;

    for (index, entry) in entries.iter().enumerate() {
        let entry_path = format!("{}[{}]", path, index);
        let table = entry.as_table().ok_or_else(|| StructuredError::UnexpectedType {
            path: entry_path.clone(),
            expected: "a node table",
        })?;
        node_from_toml(tree, sequence, table, &entry_path)?;
    }
    Ok(())
}

fn node_from_toml(
    tree: &mut ProcedureTree,
    sequence: SequenceId,
    table: &Table,
    path: &str,
) -> Result<(), StructuredError> {
    let type_name = table
        .get(TYPE_FIELD)
        .ok_or_else(|| StructuredError::MissingField {
            path: path.to_string(),
            field: TYPE_FIELD,
        })?
        .as_str()
        .ok_or_else(|| StructuredError::UnexpectedType {
            path: format!("{}.{}", path, TYPE_FIELD),
            expected: "a string",
        })?;
    let node_type = NodeType::from_keyword(type_name)
        .ok_or_else(|| StructuredError::UnknownNodeType(type_name.to_string()))?;

    let node = NodeRegistry::create(tree, node_type);
    if let Some(name) = table.get(NAME_FIELD) {
        let Some(name) = name.as_str() else {
            NodeRegistry::discard(tree, node);
            return Err(StructuredError::UnexpectedType {
                path: format!("{}.{}", path, NAME_FIELD),
                expected: "a string",
            });
        };
        tree.set_name(node, name);
    }
    if let Err(e) = tree.try_append(sequence, node, None) {
        NodeRegistry::discard(tree, node);
        return Err(e.into());
    }

    let node_name = tree.node(node).map(|n| n.name().to_string()).unwrap_or_default();
    let branch = tree.node(node).and_then(|n| n.branch());
    let branch_keyword = node_type.branch().map(|b| b.keyword);

    for (key, value) in table {
        if key == TYPE_FIELD || key == NAME_FIELD {
            continue;
        }

        if node_type == NodeType::Parameters && key == PARAMETERS_FIELD {
            read_parameters(tree, node, &node_name, value, path)?;
            continue;
        }

        if let (Some(branch), Some(keyword)) = (branch, branch_keyword) {
            if key.eq_ignore_ascii_case(keyword) {
                sequence_from_toml(tree, branch, value, &format!("{}.{}", path, keyword))?;
                continue;
            }
        }

        let (name, deprecated) = keywords::resolve_keyword_name(tree, node, key).ok_or_else(
            || StructuredError::UnknownKeyword {
                node: node_name.clone(),
                keyword: key.clone(),
            },
        )?;
        let template = tree
            .node(node)
            .and_then(|n| n.keywords.get(name))
            .cloned()
            .ok_or_else(|| StructuredError::UnknownKeyword {
                node: node_name.clone(),
                keyword: key.clone(),
            })?;
        let data = keywords::from_toml(tree, node, &template, value).map_err(|reason| {
            StructuredError::InvalidKeyword {
                node: node_name.clone(),
                keyword: name.to_string(),
                reason,
            }
        })?;
        if deprecated {
            warn!("Keyword '{}' is deprecated; use '{}' instead", key, name);
        }
        if let Some(n) = tree.node_mut(node) {
            n.keywords.set(name, data);
        }
    }

    Ok(())
}

fn read_parameters(
    tree: &mut ProcedureTree,
    node: NodeId,
    node_name: &str,
    value: &Value,
    path: &str,
) -> Result<(), StructuredError> {
    let declared = value.as_table().ok_or_else(|| StructuredError::UnexpectedType {
        path: format!("{}.{}", path, PARAMETERS_FIELD),
        expected: "a table of parameter values",
    })?;

    for (name, value) in declared {
        let value = match value {
            Value::Integer(i) => ExpressionValue::Integer(*i),
            Value::Float(f) => ExpressionValue::Double(*f),
            _ => {
                return Err(StructuredError::UnexpectedType {
                    path: format!("{}.{}.{}", path, PARAMETERS_FIELD, name),
                    expected: "a number",
                });
            }
        };
        parameters::declare(tree, node, name, value).map_err(|reason| {
            StructuredError::InvalidKeyword {
                node: node_name.to_string(),
                keyword: parameters::PARAMETER_KEYWORD.to_string(),
                reason,
            }
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::NodeContext;

    fn parse(text: &str) -> Result<(ProcedureTree, SequenceId), StructuredError> {
        let document: Table = toml::from_str(text)?;
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(NodeContext::Analysis, None, "Analyser");
        let nodes = document.get("nodes").cloned().unwrap_or(Value::Array(Vec::new()));
        sequence_from_toml(&mut tree, root, &nodes, "nodes")?;
        Ok((tree, root))
    }

    const DOCUMENT: &str = r#"
[[nodes]]
type = "Parameters"
name = "Globals"

[nodes.parameters]
rMax = 8.0
nBins = 40

[[nodes]]
type = "Select"
name = "A"
Site = ["COM"]

[[nodes.ForEach]]
type = "CalculateDistance"
name = "D"
I = "A"
J = "A"

[[nodes.ForEach]]
type = "Collect1D"
name = "H"
QuantityX = "D"
RangeX = [0, 8.0, 0.2]
"#;

    #[test]
    fn nested_tables_build_the_tree() {
        let (tree, root) = parse(DOCUMENT).unwrap();

        let nodes = tree.sequence(root).unwrap().nodes();
        assert_eq!(nodes.len(), 2);
        let globals = tree.node(nodes[0]).unwrap();
        assert_eq!(globals.parameters().len(), 2);
        assert_eq!(globals.parameters()[1].value(), ExpressionValue::Integer(40));

        let for_each = tree.node(nodes[1]).unwrap().branch().unwrap();
        let d = tree.node_in_sequence(for_each, "D").unwrap();
        let h = tree.node_in_sequence(for_each, "H").unwrap();
        assert_eq!(tree.node(d).unwrap().keywords.node("I"), Some(nodes[1]));
        assert_eq!(tree.node(h).unwrap().keywords.node("QuantityX"), Some(d));
        assert_eq!(
            tree.node(h).unwrap().keywords.bins("RangeX"),
            Some((0.0, 8.0, 0.2))
        );
    }

    #[test]
    fn written_tables_read_back_to_the_same_form() {
        let (tree, root) = parse(DOCUMENT).unwrap();
        let written = sequence_to_toml(&tree, root);

        let mut copy = ProcedureTree::new();
        let copy_root = copy.create_sequence(NodeContext::Analysis, None, "Analyser");
        sequence_from_toml(&mut copy, copy_root, &written, "nodes").unwrap();

        assert_eq!(sequence_to_toml(&copy, copy_root), written);
    }

    #[test]
    fn problems_are_located() {
        let unknown_type = parse("[[nodes]]\ntype = \"Teleport\"\n").unwrap_err();
        assert!(matches!(unknown_type, StructuredError::UnknownNodeType(t) if t == "Teleport"));

        let missing_type = parse("[[nodes]]\nname = \"A\"\n").unwrap_err();
        assert!(matches!(missing_type, StructuredError::MissingField { ref path, .. } if path == "nodes[0]"));

        let bad_reference = parse(
            "[[nodes]]\ntype = \"CalculateDistance\"\nname = \"D\"\nI = \"Nowhere\"\n",
        )
        .unwrap_err();
        assert!(matches!(bad_reference, StructuredError::InvalidKeyword { ref keyword, .. } if keyword == "I"));

        let wrong_context = parse("[[nodes]]\ntype = \"Temperature\"\n").unwrap_err();
        assert!(matches!(wrong_context, StructuredError::Structural(_)));
    }
}
