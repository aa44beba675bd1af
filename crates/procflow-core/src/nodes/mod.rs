//! # Nodes Module
//!
//! The closed set of concrete node kinds.
//!
//! ## Overview
//!
//! Each kind is a variant of [`NodeType`] and contributes, through static tables, its
//! canonical keyword, the contexts it may be placed in, whether it must be named, its
//! keyword definitions and its optional branch. Runtime behaviour is dispatched by tag
//! from [`prepare`], [`execute`] and [`finalise`]; per-kind runtime state lives in
//! [`NodeState`].
//!
//! | Kind | Contexts | Branch |
//! |------|----------|--------|
//! | `Parameters` | Any | - |
//! | `Select` | Analysis, Generation | `ForEach` (inherit) |
//! | `CalculateDistance` | Analysis | - |
//! | `Collect1D` | Analysis | `SubCollect` (Analysis) |
//! | `IfValueInRange` | Any | `Then` (inherit) |
//! | `Process1D` | Analysis | `Normalisation` (Operate) |
//! | `OperateDivide` | Operate | - |
//! | `Temperature` | Generation | - |

pub mod calculate;
pub mod collect;
pub mod conditional;
pub mod operate;
pub mod parameters;
pub mod process;
pub mod select;
pub mod temperature;

use crate::core::context::NodeContext;
use crate::core::data::{Data1D, Histogram1D};
use crate::core::ids::NodeId;
use crate::core::keywords::KeywordSpec;
use crate::engine::context::ProcedureContext;
use crate::engine::error::NodeError;
use crate::engine::tree::ProcedureTree;
use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;

/// Tag identifying a concrete node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Parameters,
    Select,
    CalculateDistance,
    Collect1D,
    IfValueInRange,
    Process1D,
    OperateDivide,
    Temperature,
}

static NODE_TYPE_KEYWORDS: Map<&'static str, NodeType> = phf_map! {
    "parameters" => NodeType::Parameters,
    "select" => NodeType::Select,
    "calculatedistance" => NodeType::CalculateDistance,
    "collect1d" => NodeType::Collect1D,
    "ifvalueinrange" => NodeType::IfValueInRange,
    "process1d" => NodeType::Process1D,
    "operatedivide" => NodeType::OperateDivide,
    "temperature" => NodeType::Temperature,
};

/// Static description of the branch a node kind owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchSpec {
    /// Block keyword of the branch (`ForEach` ... `EndForEach`).
    pub keyword: &'static str,
    pub context: NodeContext,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Parameters,
        NodeType::Select,
        NodeType::CalculateDistance,
        NodeType::Collect1D,
        NodeType::IfValueInRange,
        NodeType::Process1D,
        NodeType::OperateDivide,
        NodeType::Temperature,
    ];

    /// The canonical keyword heading the node's block.
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeType::Parameters => "Parameters",
            NodeType::Select => "Select",
            NodeType::CalculateDistance => "CalculateDistance",
            NodeType::Collect1D => "Collect1D",
            NodeType::IfValueInRange => "IfValueInRange",
            NodeType::Process1D => "Process1D",
            NodeType::OperateDivide => "OperateDivide",
            NodeType::Temperature => "Temperature",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<NodeType> {
        NODE_TYPE_KEYWORDS
            .get(keyword.to_lowercase().as_str())
            .copied()
    }

    pub fn relevant_contexts(&self) -> &'static [NodeContext] {
        match self {
            NodeType::Parameters | NodeType::IfValueInRange => &[NodeContext::Any],
            NodeType::Select => &[NodeContext::Analysis, NodeContext::Generation],
            NodeType::CalculateDistance | NodeType::Collect1D | NodeType::Process1D => {
                &[NodeContext::Analysis]
            }
            NodeType::OperateDivide => &[NodeContext::Operate],
            NodeType::Temperature => &[NodeContext::Generation],
        }
    }

    /// Whether a name must be given explicitly in the textual form.
    pub fn must_be_named(&self) -> bool {
        !matches!(
            self,
            NodeType::IfValueInRange | NodeType::OperateDivide | NodeType::Temperature
        )
    }

    pub fn branch(&self) -> Option<BranchSpec> {
        match self {
            NodeType::Select => Some(BranchSpec {
                keyword: "ForEach",
                context: NodeContext::Inherit,
            }),
            NodeType::Collect1D => Some(BranchSpec {
                keyword: "SubCollect",
                context: NodeContext::Analysis,
            }),
            NodeType::IfValueInRange => Some(BranchSpec {
                keyword: "Then",
                context: NodeContext::Inherit,
            }),
            NodeType::Process1D => Some(BranchSpec {
                keyword: "Normalisation",
                context: NodeContext::Operate,
            }),
            _ => None,
        }
    }

    pub fn keyword_specs(&self) -> &'static [KeywordSpec] {
        match self {
            NodeType::Parameters => &[],
            NodeType::Select => &select::KEYWORDS,
            NodeType::CalculateDistance => &calculate::KEYWORDS,
            NodeType::Collect1D => &collect::KEYWORDS,
            NodeType::IfValueInRange => &conditional::KEYWORDS,
            NodeType::Process1D => &process::KEYWORDS,
            NodeType::OperateDivide => &operate::KEYWORDS,
            NodeType::Temperature => &temperature::KEYWORDS,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for NodeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::from_keyword(s).ok_or(())
    }
}

/// Runtime state owned by a node, shaped by its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Stateless,
    Select(select::SelectState),
    Collect1D(Option<Histogram1D>),
    Process1D(Data1D),
}

impl NodeState {
    pub fn for_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Select => NodeState::Select(select::SelectState::default()),
            NodeType::Collect1D => NodeState::Collect1D(None),
            NodeType::Process1D => NodeState::Process1D(Data1D::default()),
            _ => NodeState::Stateless,
        }
    }
}

/// Declares the parameters a freshly created node exposes.
pub(crate) fn initialise(tree: &mut ProcedureTree, node: NodeId) {
    match tree.node(node).map(|n| n.node_type()) {
        Some(NodeType::Select) => select::initialise(tree, node),
        Some(NodeType::CalculateDistance) => calculate::initialise(tree, node),
        _ => {}
    }
}

pub fn prepare(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let Some(node_type) = tree.node(node).map(|n| n.node_type()) else {
        return Ok(());
    };
    match node_type {
        NodeType::Parameters | NodeType::OperateDivide | NodeType::Temperature => Ok(()),
        NodeType::Select => select::prepare(tree, node, ctx),
        NodeType::CalculateDistance => calculate::prepare(tree, node),
        NodeType::Collect1D => collect::prepare(tree, node, ctx),
        NodeType::IfValueInRange => conditional::prepare(tree, node, ctx),
        NodeType::Process1D => process::prepare(tree, node, ctx),
    }
}

pub fn execute(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let Some(node_type) = tree.node(node).map(|n| n.node_type()) else {
        return Ok(());
    };
    match node_type {
        NodeType::Parameters => Ok(()),
        NodeType::Select => select::execute(tree, node, ctx),
        NodeType::CalculateDistance => calculate::execute(tree, node, ctx),
        NodeType::Collect1D => collect::execute(tree, node, ctx),
        NodeType::IfValueInRange => conditional::execute(tree, node, ctx),
        NodeType::Process1D => process::execute(tree, node, ctx),
        NodeType::OperateDivide => operate::execute(tree, node),
        NodeType::Temperature => temperature::execute(tree, node, ctx),
    }
}

pub fn finalise(
    tree: &mut ProcedureTree,
    node: NodeId,
    ctx: &mut ProcedureContext,
) -> Result<(), NodeError> {
    let Some(node_type) = tree.node(node).map(|n| n.node_type()) else {
        return Ok(());
    };
    match node_type {
        NodeType::Parameters
        | NodeType::CalculateDistance
        | NodeType::OperateDivide
        | NodeType::Temperature => Ok(()),
        NodeType::Select => select::finalise(tree, node, ctx),
        NodeType::Collect1D => collect::finalise(tree, node, ctx),
        NodeType::IfValueInRange => conditional::finalise(tree, node, ctx),
        NodeType::Process1D => process::finalise(tree, node, ctx),
    }
}

/// Evaluates a value keyword with identifiers resolved from the node's scope.
pub(crate) fn evaluate_keyword(
    tree: &ProcedureTree,
    node: NodeId,
    keyword: &'static str,
) -> Result<f64, NodeError> {
    let value = tree
        .node(node)
        .and_then(|n| n.keywords.value(keyword))
        .ok_or(NodeError::MissingKeyword { keyword })?;
    tree.evaluate(node, value)
        .map_err(|source| NodeError::InvalidValue { keyword, source })
}

/// Returns the live target of a node-reference keyword.
pub(crate) fn referenced_node(
    tree: &ProcedureTree,
    node: NodeId,
    keyword: &'static str,
) -> Result<NodeId, NodeError> {
    tree.node(node)
        .and_then(|n| n.keywords.node(keyword))
        .filter(|&target| tree.node(target).is_some())
        .ok_or(NodeError::MissingKeyword { keyword })
}

pub(crate) fn node_name(tree: &ProcedureTree, node: NodeId) -> String {
    tree.node(node)
        .map(|n| n.name().to_string())
        .unwrap_or_default()
}
