use crate::core::context::NodeContext;
use crate::core::ids::{NodeId, SequenceId};
use crate::core::io::script::ScriptReader;
use crate::engine::context::ProcedureContext;
use crate::engine::error::{CheckError, NodeError, ParseError, StructuralError, StructuredError};
use crate::engine::registry::NodeRegistry;
use crate::engine::serialise::{structured, text};
use crate::engine::tree::ProcedureTree;
use crate::nodes::NodeType;
use std::str::FromStr;
use toml::{Table, Value};
use tracing::{info, instrument};

const CONTEXT_FIELD: &str = "context";
const BLOCK_FIELD: &str = "block";
const NODES_FIELD: &str = "nodes";

/// A complete workflow: a tree of nodes under one root sequence.
#[derive(Debug, Clone)]
pub struct Procedure {
    tree: ProcedureTree,
    root: SequenceId,
}

impl Procedure {
    /// Creates an empty procedure.
    ///
    /// # Arguments
    ///
    /// * `context` - The context every root node must be relevant to.
    /// * `block_keyword` - The keyword framing the procedure in text, e.g. `Analyser`.
    ///
    /// # Panics
    ///
    /// Panics if `context` is [`NodeContext::Inherit`]: a root sequence has no owner to
    /// inherit from.
    pub fn new(context: NodeContext, block_keyword: &str) -> Self {
        assert!(
            context != NodeContext::Inherit,
            "A procedure's root sequence cannot inherit its context"
        );
        let mut tree = ProcedureTree::new();
        let root = tree.create_sequence(context, None, block_keyword);
        Self { tree, root }
    }

    pub fn root(&self) -> SequenceId {
        self.root
    }

    pub fn tree(&self) -> &ProcedureTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ProcedureTree {
        &mut self.tree
    }

    pub fn context(&self) -> NodeContext {
        self.tree.effective_context(self.root)
    }

    pub fn block_keyword(&self) -> &str {
        self.tree
            .sequence(self.root)
            .map(|s| s.block_keyword())
            .unwrap_or_default()
    }

    /// Creates a node and appends it to `sequence`, which may be the root or any branch.
    ///
    /// # Arguments
    ///
    /// * `sequence` - The sequence to append to.
    /// * `node_type` - The kind of node to create.
    /// * `name` - An explicit name, or `None` for a generated `<Type>NN` name.
    ///
    /// # Errors
    ///
    /// Returns the [`StructuralError`] rejecting the append; the node is discarded.
    pub fn add_node(
        &mut self,
        sequence: SequenceId,
        node_type: NodeType,
        name: Option<&str>,
    ) -> Result<NodeId, StructuralError> {
        let node = NodeRegistry::create(&mut self.tree, node_type);
        if let Some(name) = name {
            self.tree.set_name(node, name);
        }
        match self.tree.try_append(sequence, node, None) {
            Ok(()) => Ok(node),
            Err(e) => {
                NodeRegistry::discard(&mut self.tree, node);
                Err(e)
            }
        }
    }

    /// Creates a node at the end of the root sequence.
    pub fn create_root_node(
        &mut self,
        node_type: NodeType,
        name: Option<&str>,
    ) -> Result<NodeId, StructuralError> {
        self.add_node(self.root, node_type, name)
    }

    #[instrument(skip_all, name = "procedure_prepare")]
    pub fn prepare(&mut self, ctx: &mut ProcedureContext) -> Result<(), NodeError> {
        self.tree.prepare_sequence(self.root, ctx)
    }

    #[instrument(skip_all, name = "procedure_execute", fields(iteration = ctx.iteration()))]
    pub fn execute(&mut self, ctx: &mut ProcedureContext) -> Result<(), NodeError> {
        self.tree.execute_sequence(self.root, ctx)
    }

    #[instrument(skip_all, name = "procedure_finalise")]
    pub fn finalise(&mut self, ctx: &mut ProcedureContext) -> Result<(), NodeError> {
        self.tree.finalise_sequence(self.root, ctx)
    }

    /// Resets keywords whose node references are no longer reachable.
    ///
    /// # Return
    ///
    /// Returns `true` if every reference was valid.
    pub fn validate(&mut self) -> bool {
        self.tree.validate_node_keywords(self.root)
    }

    pub fn check(&self) -> Result<(), CheckError> {
        self.tree.check(self.root)
    }

    /// Writes the procedure as a text block framed by its block keyword.
    pub fn serialise(&self) -> String {
        format!(
            "{}\n{}",
            self.block_keyword(),
            text::sequence_to_string(&self.tree, self.root)
        )
    }

    /// Replaces the procedure's nodes with those read from `reader`.
    ///
    /// The first line must be the block keyword. On error, nodes read successfully
    /// before the failure remain in the procedure.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnexpectedHeader`] when the first line is not the block keyword,
    /// [`ParseError::Unterminated`] for empty input, and otherwise
    /// whatever [`text::read_sequence`] reports.
    pub fn deserialise(&mut self, reader: &mut ScriptReader) -> Result<(), ParseError> {
        let keyword = self.block_keyword().to_string();
        let Some(header) = reader.next_line() else {
            return Err(ParseError::Unterminated {
                keyword,
                diagnostics: Vec::new(),
            });
        };
        if !header.is(&keyword) {
            return Err(ParseError::UnexpectedHeader {
                expected: keyword,
                found: header.arg_str(0).to_string(),
                line: header.number,
            });
        }

        self.tree.clear(self.root);
        text::read_sequence(&mut self.tree, self.root, reader)?;
        info!(
            nodes = self.tree.node_count(),
            "Read procedure '{}'",
            keyword
        );
        Ok(())
    }

    /// Builds a procedure from script text.
    pub fn from_text(
        context: NodeContext,
        block_keyword: &str,
        source: &str,
    ) -> Result<Self, ParseError> {
        let mut procedure = Self::new(context, block_keyword);
        procedure.deserialise(&mut ScriptReader::new(source))?;
        Ok(procedure)
    }

    /// Writes the structured form as a TOML document.
    pub fn to_toml(&self) -> Result<String, StructuredError> {
        let mut document = Table::new();
        document.insert(
            CONTEXT_FIELD.into(),
            Value::String(self.context().keyword().into()),
        );
        document.insert(
            BLOCK_FIELD.into(),
            Value::String(self.block_keyword().into()),
        );
        document.insert(
            NODES_FIELD.into(),
            structured::sequence_to_toml(&self.tree, self.root),
        );
        Ok(toml::to_string(&document)?)
    }

    /// Builds a procedure from a TOML document written by [`Self::to_toml`].
    pub fn from_toml(source: &str) -> Result<Self, StructuredError> {
        let document: Table = toml::from_str(source)?;

        let context_name = string_field(&document, CONTEXT_FIELD)?;
        let context = NodeContext::from_str(context_name)
            .ok()
            .filter(|c| *c != NodeContext::Inherit)
            .ok_or_else(|| StructuredError::UnknownContext(context_name.to_string()))?;
        let mut procedure = Self::new(context, string_field(&document, BLOCK_FIELD)?);

        if let Some(nodes) = document.get(NODES_FIELD) {
            structured::sequence_from_toml(&mut procedure.tree, procedure.root, nodes, NODES_FIELD)?;
        }
        Ok(procedure)
    }
}

fn string_field<'a>(document: &'a Table, name: &'static str) -> Result<&'a str, StructuredError> {
    document
        .get(name)
        .ok_or_else(|| StructuredError::MissingField {
            path: "procedure".into(),
            field: name,
        })?
        .as_str()
        .ok_or_else(|| StructuredError::UnexpectedType {
            path: name.into(),
            expected: "a string",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::NodeValue;
    use crate::core::keywords::KeywordData;
    use crate::core::parameter::ExpressionValue;

    const SCRIPT: &str = "\
Analyser
  Parameters  'Globals'
    Parameter  rMax  4.5
  EndParameters
  Select  'A'
    Site  'COM'
    ForEach
      Select  'B'
        Site  'COM'
        ExcludeSameMolecule  'A'
        ForEach
          CalculateDistance  'rAB'
            I  'A'
            J  'B'
          EndCalculateDistance
          IfValueInRange
            Value  'rAB.value * 2'
            ValueRange  0  9
            Then
              Collect1D  'Histo'
                QuantityX  'rAB'
                RangeX  0  5  0.5
              EndCollect1D
            EndThen
          EndIfValueInRange
        EndForEach
      EndSelect
    EndForEach
  EndSelect
EndAnalyser
";

    /// `(type, name)` for every node in depth-first order.
    fn signature(procedure: &Procedure) -> Vec<(NodeType, String)> {
        let tree = procedure.tree();
        tree.nodes(procedure.root(), &[])
            .into_iter()
            .map(|id| {
                let node = tree.node(id).unwrap();
                (node.node_type(), node.name().to_string())
            })
            .collect()
    }

    #[test]
    fn text_form_round_trips_through_nested_branches() {
        let procedure = Procedure::from_text(NodeContext::Analysis, "Analyser", SCRIPT).unwrap();

        let written = procedure.serialise();
        let reread = Procedure::from_text(NodeContext::Analysis, "Analyser", &written).unwrap();

        assert_eq!(signature(&reread), signature(&procedure));
        assert_eq!(reread.serialise(), written);
        assert!(signature(&procedure).contains(&(NodeType::IfValueInRange, "IfValueInRange01".into())));
    }

    #[test]
    fn toml_form_round_trips() {
        let procedure = Procedure::from_text(NodeContext::Analysis, "Analyser", SCRIPT).unwrap();

        let document = procedure.to_toml().unwrap();
        let restored = Procedure::from_toml(&document).unwrap();

        assert_eq!(restored.context(), NodeContext::Analysis);
        assert_eq!(restored.block_keyword(), "Analyser");
        assert_eq!(restored.serialise(), procedure.serialise());
    }

    #[test]
    fn parameters_nodes_expose_unprefixed_names() {
        let mut procedure = Procedure::new(NodeContext::Analysis, "Analyser");
        let globals = procedure
            .create_root_node(NodeType::Parameters, Some("Globals"))
            .unwrap();
        let calc = procedure
            .create_root_node(NodeType::CalculateDistance, Some("Calc01"))
            .unwrap();

        let tree = procedure.tree_mut();
        let x = tree.add_parameter(globals, "x", ExpressionValue::Double(1.0));
        let y = tree.add_parameter(calc, "x", ExpressionValue::Double(2.0));

        assert_eq!(tree.parameter(x).unwrap().name(), "x");
        assert_eq!(tree.parameter(y).unwrap().name(), "Calc01.x");
        assert_eq!(tree.get_parameter(calc, "Calc01.x"), Some(y));
    }

    #[test]
    fn programmatic_construction_rejects_structural_faults() {
        let mut procedure = Procedure::new(NodeContext::Analysis, "Analyser");
        procedure.create_root_node(NodeType::Select, Some("A")).unwrap();

        assert!(matches!(
            procedure.create_root_node(NodeType::Select, Some("a")),
            Err(StructuralError::DuplicateName { .. })
        ));
        assert!(matches!(
            procedure.create_root_node(NodeType::Temperature, None),
            Err(StructuralError::ContextMismatch { .. })
        ));
        assert_eq!(procedure.tree().node_count(), 1);
    }

    #[test]
    fn removed_references_are_reset_by_validation() {
        let mut procedure = Procedure::from_text(NodeContext::Analysis, "Analyser", SCRIPT).unwrap();
        let tree = procedure.tree();
        let a = tree.node_in_sequence(procedure.root(), "A").unwrap();
        let for_each = tree.node(a).unwrap().branch().unwrap();
        let b = tree.node_in_sequence(for_each, "B").unwrap();
        let inner = tree.node(b).unwrap().branch().unwrap();
        let r_ab = tree.node_in_sequence(inner, "rAB").unwrap();
        let histo = tree.node_in_sequence(inner, "Histo").unwrap();

        assert!(procedure.tree_mut().remove(inner, r_ab));

        assert!(!procedure.validate());
        assert!(!procedure.tree().node(histo).unwrap().keywords.is_set("QuantityX"));
        assert!(procedure.validate());
    }

    #[test]
    fn header_must_match_the_block_keyword() {
        let err = Procedure::from_text(NodeContext::Generation, "Generator", SCRIPT).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedHeader { ref found, line: 1, .. } if found == "Analyser"
        ));
    }

    #[test]
    fn unknown_contexts_are_rejected_from_toml() {
        let err = Procedure::from_toml("context = \"Inherit\"\nblock = \"Analyser\"\n").unwrap_err();
        assert!(matches!(err, StructuredError::UnknownContext(c) if c == "Inherit"));
    }

    #[test]
    #[should_panic(expected = "cannot inherit")]
    fn root_sequence_cannot_inherit() {
        Procedure::new(NodeContext::Inherit, "Analyser");
    }

    #[test]
    fn keyword_values_survive_programmatic_edits() {
        let mut procedure = Procedure::new(NodeContext::Generation, "Generator");
        let temperature = procedure
            .create_root_node(NodeType::Temperature, None)
            .unwrap();
        procedure
            .tree_mut()
            .node_mut(temperature)
            .unwrap()
            .keywords
            .set("Temperature", KeywordData::Value(NodeValue::Constant(250.0)));

        assert_eq!(
            procedure.serialise(),
            "Generator\n  Temperature  'Temperature01'\n    Temperature  250\n  EndTemperature\nEndGenerator\n"
        );
    }
}
