use super::context::NodeContext;
use super::ids::SequenceId;
use super::keywords::KeywordStore;
use super::parameter::{ExpressionValue, Parameter};
use crate::nodes::{NodeState, NodeType};

const DISALLOWED_NAME_CHARACTERS: [char; 8] = [' ', '/', '\\', '#', '*', '$', '\'', '"'];

/// Replaces characters that cannot appear in a node name with underscores.
pub fn sanitise_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if DISALLOWED_NAME_CHARACTERS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// One step of a procedure.
///
/// A node is identified by its kind and an optional name, is configured through its
/// [`KeywordStore`], and may declare parameters visible to nodes after it. Structural
/// links are non-owning arena keys: `scope` is the sequence holding the node, and
/// `branch` is the child sequence the node exclusively owns, if its kind has one.
#[derive(Debug, Clone)]
pub struct ProcedureNode {
    node_type: NodeType,
    name: String,
    /// Keyword configuration of the node.
    pub keywords: KeywordStore,
    parameters: Vec<Parameter>,
    pub(crate) scope: Option<SequenceId>,
    pub(crate) branch: Option<SequenceId>,
    /// Runtime state owned by the concrete node kind.
    pub state: NodeState,
}

impl ProcedureNode {
    /// Creates an unnamed, unscoped node with default keywords.
    ///
    /// Nodes are normally created through the registry, which also allocates the
    /// node's branch and declares its parameters.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            name: String::new(),
            keywords: KeywordStore::from_specs(node_type.keyword_specs()),
            parameters: Vec::new(),
            scope: None,
            branch: None,
            state: NodeState::for_type(node_type),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive comparison against the node's name.
    pub fn has_name(&self, name: &str) -> bool {
        !self.name.is_empty() && self.name.eq_ignore_ascii_case(name)
    }

    /// Stores a sanitised name and re-prefixes the node's own parameters with it.
    ///
    /// Parameters of a `Parameters` node are global and keep their bare names.
    pub fn set_name(&mut self, raw: &str) {
        self.name = sanitise_name(raw);
        let prefix = self.parameter_prefix().map(str::to_string);
        for parameter in &mut self.parameters {
            parameter.set_prefix(prefix.as_deref());
        }
    }

    fn parameter_prefix(&self) -> Option<&str> {
        if self.node_type == NodeType::Parameters || self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }

    /// The sequence that contains this node, once it has been appended to one.
    pub fn scope(&self) -> Option<SequenceId> {
        self.scope
    }

    /// The child sequence owned by this node, if its kind has one.
    pub fn branch(&self) -> Option<SequenceId> {
        self.branch
    }

    pub fn relevant_contexts(&self) -> &'static [NodeContext] {
        self.node_type.relevant_contexts()
    }

    /// Returns whether the node may be placed in a sequence of the given context.
    ///
    /// # Panics
    ///
    /// Panics if `context` is [`NodeContext::Inherit`], which must always be resolved
    /// to a concrete context before reaching this check.
    pub fn is_context_relevant(&self, context: NodeContext) -> bool {
        if context == NodeContext::Inherit {
            panic!(
                "The 'inherit' context must be resolved before checking relevance of node '{}' ({})",
                self.name, self.node_type
            );
        }

        let contexts = self.relevant_contexts();
        context == NodeContext::Any
            || contexts.contains(&context)
            || contexts.contains(&NodeContext::Any)
    }

    pub fn must_be_named(&self) -> bool {
        self.node_type.must_be_named()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    /// Declares a new parameter on this node and returns its index.
    pub fn add_parameter(&mut self, base_name: &str, initial_value: ExpressionValue) -> usize {
        let mut parameter = Parameter::new(base_name, initial_value);
        parameter.set_prefix(self.parameter_prefix());
        self.parameters.push(parameter);
        self.parameters.len() - 1
    }

    /// Finds one of this node's parameters by its base (unprefixed) name.
    pub fn find_parameter(&self, base_name: &str) -> Option<(usize, &Parameter)> {
        self.parameters
            .iter()
            .enumerate()
            .find(|(_, p)| p.base_name().eq_ignore_ascii_case(base_name))
    }

    /// Updates the value of one of this node's parameters. Returns false if the node
    /// declares no parameter with that base name.
    pub fn set_parameter(&mut self, base_name: &str, value: ExpressionValue) -> bool {
        match self
            .parameters
            .iter_mut()
            .find(|p| p.base_name().eq_ignore_ascii_case(base_name))
        {
            Some(parameter) => {
                parameter.set_value(value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitise_replaces_disallowed_characters() {
        assert_eq!(sanitise_name(" my site/a\\b#c*d$e "), "my_site_a_b_c_d_e");
        assert_eq!(sanitise_name("Clean-Name.1"), "Clean-Name.1");
    }

    #[test]
    fn sanitise_strips_quote_characters() {
        assert_eq!(sanitise_name("it's \"A\""), "it_s__A_");
    }

    #[test]
    fn renaming_moves_existing_parameters_to_the_new_prefix() {
        let mut node = ProcedureNode::new(NodeType::Select);
        node.set_name("A");
        let index = node.add_parameter("nSelected", ExpressionValue::default());
        assert_eq!(node.parameters()[index].name(), "A.nSelected");

        node.set_name("B");
        assert_eq!(node.parameters()[index].name(), "B.nSelected");
    }

    #[test]
    fn set_name_prefixes_parameters_of_ordinary_nodes() {
        let mut node = ProcedureNode::new(NodeType::CalculateDistance);
        node.add_parameter("x", ExpressionValue::default());
        assert_eq!(node.parameters()[0].name(), "x");

        node.set_name("Calc01");
        assert_eq!(node.parameters()[0].name(), "Calc01.x");

        let index = node.add_parameter("y", ExpressionValue::Integer(2));
        assert_eq!(node.parameters()[index].name(), "Calc01.y");
    }

    #[test]
    fn parameters_node_keeps_bare_names() {
        let mut node = ProcedureNode::new(NodeType::Parameters);
        node.set_name("Globals");
        let index = node.add_parameter("x", ExpressionValue::Double(1.0));
        assert_eq!(node.parameters()[index].name(), "x");
        node.set_name("Renamed");
        assert_eq!(node.parameters()[index].name(), "x");
    }

    #[test]
    fn context_relevance_follows_declared_contexts() {
        let select = ProcedureNode::new(NodeType::Select);
        assert!(select.is_context_relevant(NodeContext::Analysis));
        assert!(select.is_context_relevant(NodeContext::Generation));
        assert!(select.is_context_relevant(NodeContext::Any));
        assert!(!select.is_context_relevant(NodeContext::Operate));

        let parameters = ProcedureNode::new(NodeType::Parameters);
        assert!(parameters.is_context_relevant(NodeContext::Operate));
    }

    #[test]
    #[should_panic(expected = "inherit")]
    fn context_relevance_panics_on_inherit() {
        ProcedureNode::new(NodeType::Select).is_context_relevant(NodeContext::Inherit);
    }

    #[test]
    fn set_parameter_updates_by_base_name() {
        let mut node = ProcedureNode::new(NodeType::CalculateDistance);
        node.set_name("D");
        node.add_parameter("value", ExpressionValue::default());
        assert!(node.set_parameter("VALUE", ExpressionValue::Double(2.5)));
        assert!(!node.set_parameter("missing", ExpressionValue::Double(1.0)));
        assert_eq!(
            node.find_parameter("value").unwrap().1.value(),
            ExpressionValue::Double(2.5)
        );
    }
}
