//! Text and TOML codecs for keyword data.
//!
//! Node references are held as arena keys but written as node names, so every codec
//! needs the tree: names are resolved on read through the scoped or global lookup the
//! keyword asks for.

use crate::core::expression::NodeValue;
use crate::core::ids::NodeId;
use crate::core::io::script::ScriptLine;
use crate::core::keywords::{
    KeywordData, NodeReference, NodeReferenceList, ParseResult, deprecated_replacement,
};
use crate::engine::error::Diagnostics;
use crate::engine::tree::ProcedureTree;
use crate::nodes::NodeType;
use toml::Value;
use tracing::warn;

/// Quotes a text argument so that it survives tokenization as a single argument.
pub(crate) fn quote(text: &str) -> String {
    if text.contains('\'') {
        format!("\"{}\"", text)
    } else {
        format!("'{}'", text)
    }
}

fn target_name(tree: &ProcedureTree, target: NodeId) -> Option<&str> {
    tree.node(target).map(|n| n.name())
}

/// Formats keyword data as script-line arguments. Returns `None` when there is
/// nothing to write, such as an empty list or a reference to a removed node.
pub(crate) fn format_arguments(tree: &ProcedureTree, data: &KeywordData) -> Option<String> {
    match data {
        KeywordData::Integer(i) => Some(i.to_string()),
        KeywordData::Double(d) => Some(d.to_string()),
        KeywordData::Text(text) => Some(quote(text)),
        KeywordData::TextList(items) if items.is_empty() => None,
        KeywordData::TextList(items) => Some(
            items
                .iter()
                .map(|item| quote(item))
                .collect::<Vec<_>>()
                .join("  "),
        ),
        KeywordData::Range { min, max } => Some(format!("{}  {}", min, max)),
        KeywordData::Bins { min, max, width } => Some(format!("{}  {}  {}", min, max, width)),
        KeywordData::Value(NodeValue::Constant(c)) => Some(c.to_string()),
        KeywordData::Value(NodeValue::Expression(text)) => Some(quote(text)),
        KeywordData::Node(reference) => reference
            .target
            .and_then(|target| target_name(tree, target))
            .map(quote),
        KeywordData::NodeList(list) => {
            let names: Vec<String> = list
                .targets
                .iter()
                .filter_map(|&target| target_name(tree, target))
                .map(quote)
                .collect();
            (!names.is_empty()).then(|| names.join("  "))
        }
    }
}

fn describe_types(allowed: &[NodeType]) -> String {
    if allowed.is_empty() {
        "node".to_string()
    } else {
        allowed
            .iter()
            .map(NodeType::keyword)
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Resolves a node name from a keyword of `node`.
fn resolve_reference(
    tree: &ProcedureTree,
    node: NodeId,
    name: &str,
    allowed: &'static [NodeType],
    only_in_scope: bool,
) -> Result<NodeId, String> {
    let found = if only_in_scope {
        tree.get_node(node, name, allowed)
    } else {
        tree.node(node)
            .and_then(|n| n.scope())
            .and_then(|scope| tree.node_exists(scope, name, None, allowed))
    };
    found.ok_or_else(|| {
        format!(
            "no {} named '{}' {}",
            describe_types(allowed),
            name,
            if only_in_scope {
                "is in scope"
            } else {
                "exists"
            }
        )
    })
}

fn expect_args(line: &ScriptLine, count: usize) -> Result<(), String> {
    let given = line.n_args().saturating_sub(1);
    if given == count {
        Ok(())
    } else {
        Err(format!(
            "expected {} argument(s) but found {}",
            count, given
        ))
    }
}

fn number(line: &ScriptLine, index: usize) -> Result<f64, String> {
    line.arg_f64(index)
        .ok_or_else(|| format!("'{}' is not a number", line.arg_str(index)))
}

fn parse_value(text: &str) -> Result<NodeValue, String> {
    let value = NodeValue::from_text(text);
    value.validate(|_| true).map_err(|e| e.to_string())?;
    Ok(value)
}

/// Parses the arguments of a script line into data shaped like `template`.
fn parse_arguments(
    tree: &ProcedureTree,
    node: NodeId,
    template: &KeywordData,
    line: &ScriptLine,
) -> Result<KeywordData, String> {
    match template {
        KeywordData::Integer(_) => {
            expect_args(line, 1)?;
            line.arg_i64(1)
                .map(KeywordData::Integer)
                .ok_or_else(|| format!("'{}' is not an integer", line.arg_str(1)))
        }
        KeywordData::Double(_) => {
            expect_args(line, 1)?;
            number(line, 1).map(KeywordData::Double)
        }
        KeywordData::Text(_) => {
            expect_args(line, 1)?;
            Ok(KeywordData::Text(line.arg_str(1).to_string()))
        }
        KeywordData::TextList(_) => {
            if line.n_args() < 2 {
                return Err("expected at least one argument".into());
            }
            Ok(KeywordData::TextList(line.args_from(1).to_vec()))
        }
        KeywordData::Range { .. } => {
            expect_args(line, 2)?;
            let (min, max) = (number(line, 1)?, number(line, 2)?);
            if min > max {
                return Err(format!("minimum {} exceeds maximum {}", min, max));
            }
            Ok(KeywordData::Range { min, max })
        }
        KeywordData::Bins { .. } => {
            expect_args(line, 3)?;
            Ok(KeywordData::Bins {
                min: number(line, 1)?,
                max: number(line, 2)?,
                width: number(line, 3)?,
            })
        }
        KeywordData::Value(_) => {
            if line.n_args() < 2 {
                return Err("expected a value".into());
            }
            parse_value(&line.args_from(1).join(" ")).map(KeywordData::Value)
        }
        KeywordData::Node(reference) => {
            expect_args(line, 1)?;
            let target = resolve_reference(
                tree,
                node,
                line.arg_str(1),
                reference.allowed,
                reference.only_in_scope,
            )?;
            Ok(KeywordData::Node(NodeReference {
                target: Some(target),
                ..reference.clone()
            }))
        }
        KeywordData::NodeList(list) => {
            if line.n_args() < 2 {
                return Err("expected at least one node name".into());
            }
            let targets = line
                .args_from(1)
                .iter()
                .map(|name| resolve_reference(tree, node, name, list.allowed, list.only_in_scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(KeywordData::NodeList(NodeReferenceList {
                targets,
                ..list.clone()
            }))
        }
    }
}

/// Finds the keyword of `node` addressed by `given`, following deprecated aliases.
///
/// Returns the canonical keyword name and whether an alias was used.
pub(crate) fn resolve_keyword_name(
    tree: &ProcedureTree,
    node: NodeId,
    given: &str,
) -> Option<(&'static str, bool)> {
    let keywords = &tree.node(node)?.keywords;
    if let Some(keyword) = keywords.find(given) {
        return Some((keyword.name(), false));
    }
    let replacement = deprecated_replacement(given)?;
    keywords.find(replacement).map(|k| (k.name(), true))
}

/// Offers one body line to the keywords of `node`.
///
/// A line addressing no keyword is `Unrecognised` and left for the caller to report;
/// a line that fails to parse is reported here and yields `Failed`.
pub(crate) fn deserialise_keyword(
    tree: &mut ProcedureTree,
    node: NodeId,
    line: &ScriptLine,
    diagnostics: &mut Diagnostics,
) -> ParseResult {
    let given = line.arg_str(0);
    let Some((name, deprecated)) = resolve_keyword_name(tree, node, given) else {
        return ParseResult::Unrecognised;
    };
    let Some(template) = tree
        .node(node)
        .and_then(|n| n.keywords.get(name))
        .cloned()
    else {
        return ParseResult::Unrecognised;
    };

    match parse_arguments(tree, node, &template, line) {
        Ok(data) => {
            if let Some(n) = tree.node_mut(node) {
                n.keywords.set(name, data);
            }
            if deprecated {
                warn!(
                    line = line.number,
                    "Keyword '{}' is deprecated; use '{}' instead",
                    given,
                    name
                );
                ParseResult::Deprecated
            } else {
                ParseResult::Success
            }
        }
        Err(message) => {
            let node_name = tree.node(node).map(|n| n.name()).unwrap_or_default();
            diagnostics.report(
                line.number,
                format!(
                    "Failed to parse keyword '{}' of node '{}': {}",
                    name, node_name, message
                ),
            );
            ParseResult::Failed
        }
    }
}

/// Converts keyword data to a TOML value. Returns `None` when there is nothing to store.
pub(crate) fn to_toml(tree: &ProcedureTree, data: &KeywordData) -> Option<Value> {
    let value = match data {
        KeywordData::Integer(i) => Value::Integer(*i),
        KeywordData::Double(d) => Value::Float(*d),
        KeywordData::Text(text) => Value::String(text.clone()),
        KeywordData::TextList(items) if items.is_empty() => return None,
        KeywordData::TextList(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        KeywordData::Range { min, max } => Value::Array(vec![Value::Float(*min), Value::Float(*max)]),
        KeywordData::Bins { min, max, width } => Value::Array(vec![
            Value::Float(*min),
            Value::Float(*max),
            Value::Float(*width),
        ]),
        KeywordData::Value(NodeValue::Constant(c)) => Value::Float(*c),
        KeywordData::Value(NodeValue::Expression(text)) => Value::String(text.clone()),
        KeywordData::Node(reference) => {
            Value::String(target_name(tree, reference.target?)?.to_string())
        }
        KeywordData::NodeList(list) => {
            let names: Vec<Value> = list
                .targets
                .iter()
                .filter_map(|&target| target_name(tree, target))
                .map(|name| Value::String(name.to_string()))
                .collect();
            if names.is_empty() {
                return None;
            }
            Value::Array(names)
        }
    };
    Some(value)
}

fn toml_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        other => Err(format!("expected a number, found {}", other.type_str())),
    }
}

fn toml_string(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, found {}", value.type_str()))
}

fn toml_numbers<const N: usize>(value: &Value) -> Result<[f64; N], String> {
    let items = value
        .as_array()
        .filter(|items| items.len() == N)
        .ok_or_else(|| format!("expected an array of {} numbers", N))?;
    let mut numbers = [0.0; N];
    for (slot, item) in numbers.iter_mut().zip(items) {
        *slot = toml_number(item)?;
    }
    Ok(numbers)
}

fn toml_strings(value: &Value) -> Result<Vec<&str>, String> {
    match value {
        Value::Array(items) => items.iter().map(toml_string).collect(),
        other => Ok(vec![toml_string(other)?]),
    }
}

/// Reads a TOML value into data shaped like `template`.
pub(crate) fn from_toml(
    tree: &ProcedureTree,
    node: NodeId,
    template: &KeywordData,
    value: &Value,
) -> Result<KeywordData, String> {
    match template {
        KeywordData::Integer(_) => value
            .as_integer()
            .map(KeywordData::Integer)
            .ok_or_else(|| format!("expected an integer, found {}", value.type_str())),
        KeywordData::Double(_) => toml_number(value).map(KeywordData::Double),
        KeywordData::Text(_) => Ok(KeywordData::Text(toml_string(value)?.to_string())),
        KeywordData::TextList(_) => Ok(KeywordData::TextList(
            toml_strings(value)?
                .into_iter()
                .map(str::to_string)
                .collect(),
        )),
        KeywordData::Range { .. } => {
            let [min, max] = toml_numbers::<2>(value)?;
            Ok(KeywordData::Range { min, max })
        }
        KeywordData::Bins { .. } => {
            let [min, max, width] = toml_numbers::<3>(value)?;
            Ok(KeywordData::Bins { min, max, width })
        }
        KeywordData::Value(_) => match value {
            Value::String(text) => parse_value(text).map(KeywordData::Value),
            other => toml_number(other).map(|c| KeywordData::Value(NodeValue::Constant(c))),
        },
        KeywordData::Node(reference) => {
            let target = resolve_reference(
                tree,
                node,
                toml_string(value)?,
                reference.allowed,
                reference.only_in_scope,
            )?;
            Ok(KeywordData::Node(NodeReference {
                target: Some(target),
                ..reference.clone()
            }))
        }
        KeywordData::NodeList(list) => {
            let targets = toml_strings(value)?
                .into_iter()
                .map(|name| resolve_reference(tree, node, name, list.allowed, list.only_in_scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(KeywordData::NodeList(NodeReferenceList {
                targets,
                ..list.clone()
            }))
        }
    }
}
