//! The textual block form of a sequence.
//!
//! A sequence is written as its node blocks followed by `End<BlockKeyword>`; the opening
//! keyword belongs to whoever owns the sequence (a branching node, or the procedure for
//! its root). Each node block is headed by the node's type keyword, carries its set
//! keywords one per line and closes with `End<TypeKeyword>`.
//!
//! Reading is recoverable: problems are collected as diagnostics and reading carries on
//! with the next line, so a single pass reports every error in the block.

use super::keywords::{self, quote};
use crate::core::ids::{NodeId, SequenceId};
use crate::core::io::script::ScriptReader;
use crate::core::keywords::ParseResult;
use crate::engine::error::{Diagnostics, ParseError};
use crate::engine::registry::NodeRegistry;
use crate::engine::tree::ProcedureTree;
use crate::nodes::{NodeType, parameters};
use std::fmt::{self, Write};
use tracing::{debug, error};

const INDENT: &str = "  ";

fn indent(depth: usize) -> String {
    INDENT.repeat(depth)
}

/// Writes the nodes of `sequence` at `depth` followed by its end keyword one level out.
pub fn write_sequence(
    tree: &ProcedureTree,
    sequence: SequenceId,
    out: &mut String,
    depth: usize,
) -> fmt::Result {
    let Some(seq) = tree.sequence(sequence) else {
        return Ok(());
    };
    for &node in seq.nodes() {
        write_node(tree, node, out, depth)?;
    }
    writeln!(out, "{}{}", indent(depth.saturating_sub(1)), seq.end_keyword())
}

fn write_node(tree: &ProcedureTree, id: NodeId, out: &mut String, depth: usize) -> fmt::Result {
    let Some(node) = tree.node(id) else {
        return Ok(());
    };
    let type_keyword = node.node_type().keyword();
    let pad = indent(depth);
    let inner = indent(depth + 1);

    if !node.name().is_empty() {
        writeln!(out, "{}{}  {}", pad, type_keyword, quote(node.name()))?;
    } else {
        writeln!(out, "{}{}", pad, type_keyword)?;
    }

    if node.node_type() == NodeType::Parameters {
        for line in parameters::serialise_lines(node) {
            writeln!(out, "{}{}", inner, line)?;
        }
    }

    for keyword in node.keywords.iter().filter(|k| k.is_set()) {
        if let Some(arguments) = keywords::format_arguments(tree, &keyword.data) {
            writeln!(out, "{}{}  {}", inner, keyword.name(), arguments)?;
        }
    }

    if let (Some(branch), Some(spec)) = (node.branch(), node.node_type().branch()) {
        if tree.sequence(branch).is_some_and(|s| !s.is_empty()) {
            writeln!(out, "{}{}", inner, spec.keyword)?;
            write_sequence(tree, branch, out, depth + 2)?;
        }
    }

    writeln!(out, "{}End{}", pad, type_keyword)
}

/// Renders a sequence as text, with its nodes indented by one level.
pub fn sequence_to_string(tree: &ProcedureTree, sequence: SequenceId) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_sequence(tree, sequence, &mut out, 1);
    out
}

/// Keyword of the innermost block still open when the input ran out.
struct Unterminated(String);

/// Reads node blocks into `sequence` until its end keyword.
///
/// The opening block keyword must already have been consumed from `reader`.
///
/// # Errors
///
/// Returns [`ParseError::Unterminated`] if the input ends inside any open block, or
/// [`ParseError::Block`] carrying every diagnostic collected if any line was rejected.
/// Nodes read successfully before an error remain in the sequence.
pub fn read_sequence(
    tree: &mut ProcedureTree,
    sequence: SequenceId,
    reader: &mut ScriptReader,
) -> Result<(), ParseError> {
    let keyword = tree
        .sequence(sequence)
        .map(|s| s.block_keyword().to_string())
        .unwrap_or_default();
    let mut diagnostics = Diagnostics::new();

    match read_sequence_body(tree, sequence, reader, &mut diagnostics) {
        Err(Unterminated(open)) => {
            error!(
                line = reader.last_line_number(),
                "Input ended before 'End{}' was found",
                open
            );
            Err(ParseError::Unterminated {
                keyword: open,
                diagnostics: diagnostics.into_vec(),
            })
        }
        Ok(()) if diagnostics.is_empty() => {
            debug!(
                nodes = tree.sequence(sequence).map_or(0, |s| s.len()),
                "Read '{}' block",
                keyword
            );
            Ok(())
        }
        Ok(()) => {
            error!(
                errors = diagnostics.len(),
                "Errors encountered while reading '{}' block",
                keyword
            );
            Err(ParseError::Block {
                keyword,
                diagnostics: diagnostics.into_vec(),
            })
        }
    }
}

fn read_sequence_body(
    tree: &mut ProcedureTree,
    sequence: SequenceId,
    reader: &mut ScriptReader,
    diagnostics: &mut Diagnostics,
) -> Result<(), Unterminated> {
    let Some((block, end)) = tree
        .sequence(sequence)
        .map(|s| (s.block_keyword().to_string(), s.end_keyword()))
    else {
        return Ok(());
    };

    loop {
        let Some(line) = reader.next_line() else {
            return Err(Unterminated(block));
        };
        if line.is(&end) {
            return Ok(());
        }

        let Some(node_type) = NodeType::from_keyword(line.arg_str(0)) else {
            diagnostics.report(
                line.number,
                format!(
                    "'{}' is not a valid node type within a '{}' block",
                    line.arg_str(0),
                    block
                ),
            );
            continue;
        };

        let node = NodeRegistry::create(tree, node_type);
        if line.has_arg(1) {
            tree.set_name(node, line.arg_str(1));
            let name = tree.node(node).map(|n| n.name().to_string()).unwrap_or_default();
            let last = tree.sequence(sequence).and_then(|s| s.last());
            if tree.node_in_scope(sequence, last, &name, None, &[]).is_some() {
                diagnostics.report(
                    line.number,
                    format!("A node named '{}' is already in scope", name),
                );
                NodeRegistry::discard(tree, node);
                skip_block(reader, node_type.keyword())?;
                continue;
            }
        } else if node_type.must_be_named() {
            diagnostics.report(
                line.number,
                format!(
                    "A name must be given explicitly to a node of type '{}'",
                    node_type
                ),
            );
        }

        if let Err(e) = tree.try_append(sequence, node, None) {
            diagnostics.report(line.number, e.to_string());
            NodeRegistry::discard(tree, node);
            skip_block(reader, node_type.keyword())?;
            continue;
        }

        read_node_body(tree, node, reader, diagnostics)?;
    }
}

fn read_node_body(
    tree: &mut ProcedureTree,
    node: NodeId,
    reader: &mut ScriptReader,
    diagnostics: &mut Diagnostics,
) -> Result<(), Unterminated> {
    let Some((node_type, branch)) = tree.node(node).map(|n| (n.node_type(), n.branch())) else {
        return Ok(());
    };
    let end = format!("End{}", node_type.keyword());
    let branch_keyword = node_type.branch().map(|b| b.keyword);

    loop {
        let Some(line) = reader.next_line() else {
            return Err(Unterminated(node_type.keyword().to_string()));
        };
        if line.is(&end) {
            return Ok(());
        }

        match (branch, branch_keyword) {
            (Some(branch), Some(keyword)) if line.is(keyword) => {
                read_sequence_body(tree, branch, reader, diagnostics)?;
                continue;
            }
            _ => {}
        }

        if node_type == NodeType::Parameters && line.is(parameters::PARAMETER_KEYWORD) {
            parameters::deserialise_line(tree, node, &line, diagnostics);
            continue;
        }

        if keywords::deserialise_keyword(tree, node, &line, diagnostics) == ParseResult::Unrecognised
        {
            let name = tree.node(node).map(|n| n.name().to_string()).unwrap_or_default();
            diagnostics.report(
                line.number,
                format!(
                    "Unrecognised keyword '{}' found in node '{}' (type '{}')",
                    line.arg_str(0),
                    name,
                    node_type
                ),
            );
        }
    }
}

/// Consumes lines up to and including the `End<keyword>` matching an already-read
/// `<keyword>` header, allowing for nested blocks of the same kind.
fn skip_block(reader: &mut ScriptReader, keyword: &str) -> Result<(), Unterminated> {
    let end = format!("End{}", keyword);
    let mut depth = 0usize;
    loop {
        let Some(line) = reader.next_line() else {
            return Err(Unterminated(keyword.to_string()));
        };
        if line.is(&end) {
            if depth == 0 {
                return Ok(());
            }
            depth -= 1;
        } else if line.is(keyword) {
            depth += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::NodeContext;

    fn read(text: &str) -> (ProcedureTree, SequenceId, Result<(), ParseError>) {
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(NodeContext::Analysis, None, "Analyser");
        let mut reader = ScriptReader::new(text);
        let result = read_sequence(&mut tree, root, &mut reader);
        (tree, root, result)
    }

    fn names(tree: &ProcedureTree, sequence: SequenceId) -> Vec<String> {
        tree.sequence(sequence)
            .unwrap()
            .nodes()
            .iter()
            .map(|&id| tree.node(id).unwrap().name().to_string())
            .collect()
    }

    const RDF: &str = "  Select  'A'
    Site  'COM'
    ForEach
      Select  'B'
        Site  'COM'
        ExcludeSameSite  'A'
        ForEach
          CalculateDistance  'rAB'
            I  'A'
            J  'B'
          EndCalculateDistance
          Collect1D  'Histo'
            QuantityX  'rAB'
            RangeX  0  10  0.05
          EndCollect1D
        EndForEach
      EndSelect
    EndForEach
  EndSelect
  Process1D  'RDF'
    SourceData  'Histo'
    Normalisation
      OperateDivide  'OperateDivide01'
        Value  4
      EndOperateDivide
    EndNormalisation
  EndProcess1D
EndAnalyser
";

    #[test]
    fn nested_blocks_are_read_and_written_back_identically() {
        let (tree, root, result) = read(RDF);
        result.unwrap();

        assert_eq!(names(&tree, root), vec!["A", "RDF"]);
        let a = tree.sequence(root).unwrap().nodes()[0];
        let for_each = tree.node(a).unwrap().branch().unwrap();
        assert_eq!(names(&tree, for_each), vec!["B"]);
        assert_eq!(tree.effective_context(for_each), NodeContext::Analysis);

        assert_eq!(sequence_to_string(&tree, root), RDF);
    }

    #[test]
    fn explicit_names_of_optionally_named_nodes_are_kept() {
        let text = "\
Select  'A'
  Site  'COM'
  ForEach
    IfValueInRange  'Cond'
      Value  2
      ValueRange  0  5
    EndIfValueInRange
    IfValueInRange
      Value  3
    EndIfValueInRange
  EndForEach
EndSelect
EndAnalyser
";
        let (tree, root, result) = read(text);
        result.unwrap();
        let written = sequence_to_string(&tree, root);
        assert!(written.contains("    IfValueInRange  'Cond'\n"));
        assert!(written.contains("    IfValueInRange  'IfValueInRange01'\n"));

        let (reread, reread_root, result) = read(&written);
        result.unwrap();
        let a = reread.sequence(reread_root).unwrap().nodes()[0];
        let for_each = reread.node(a).unwrap().branch().unwrap();
        assert_eq!(names(&reread, for_each), vec!["Cond", "IfValueInRange01"]);
        assert_eq!(sequence_to_string(&reread, reread_root), written);
    }

    #[test]
    fn every_error_in_a_block_is_reported() {
        let text = "\
Bogus
EndBogus
Select  'A'
  Site  'COM'
EndSelect
Select  'A'
  Site  'Other'
EndSelect
Temperature
EndTemperature
CalculateDistance  'D'
  I  'Missing'
  Colour  'red'
EndCalculateDistance
EndAnalyser
";
        let (tree, root, result) = read(text);

        let err = result.unwrap_err();
        let lines: Vec<usize> = err.diagnostics().iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2, 6, 9, 12, 13]);
        assert!(matches!(err, ParseError::Block { ref keyword, .. } if keyword == "Analyser"));
        assert_eq!(names(&tree, root), vec!["A", "D"]);
    }

    #[test]
    fn missing_names_are_generated() {
        let (tree, root, result) = read("Select\n  Site  'COM'\nEndSelect\nEndAnalyser\n");

        assert_eq!(result.unwrap_err().diagnostics().len(), 1);
        assert_eq!(names(&tree, root), vec!["Select01"]);
    }

    #[test]
    fn truncated_input_names_the_open_block() {
        let (_, _, result) = read("Select  'A'\n  ForEach\n    Select  'B'\n");

        match result.unwrap_err() {
            ParseError::Unterminated { keyword, .. } => assert_eq!(keyword, "Select"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
