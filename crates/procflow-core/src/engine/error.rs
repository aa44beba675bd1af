use crate::core::context::NodeContext;
use crate::core::expression::ExpressionError;
use crate::nodes::NodeType;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

/// A fault in how the procedure tree was built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error(
        "Node '{node}' (type '{node_type}') is not relevant to the '{context}' context of its sequence"
    )]
    ContextMismatch {
        node: String,
        node_type: NodeType,
        context: NodeContext,
    },

    #[error("A node named '{name}' already exists in the procedure; duplicate node names are not allowed")]
    DuplicateName { name: String },

    #[error("Node '{name}' already belongs to a sequence")]
    AlreadyScoped { name: String },

    #[error("Sequence does not exist in this procedure")]
    UnknownSequence,

    #[error("Node does not exist in this procedure")]
    UnknownNode,
}

/// A recoverable failure raised by a node's lifecycle hook.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Required keyword '{keyword}' has not been set")]
    MissingKeyword { keyword: &'static str },

    #[error("Site stack '{0}' does not exist in the configuration")]
    MissingSiteStack(String),

    #[error("Invalid value for keyword '{keyword}': {reason}")]
    InvalidKeyword {
        keyword: &'static str,
        reason: String,
    },

    #[error("Failed to evaluate keyword '{keyword}': {source}")]
    InvalidValue {
        keyword: &'static str,
        #[source]
        source: ExpressionError,
    },

    #[error("No data available: {0}")]
    NoData(String),

    #[error("I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write CSV data to '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Node '{name}' ({node_type}) failed: {source}")]
    Node {
        name: String,
        node_type: NodeType,
        #[source]
        source: Box<NodeError>,
    },
}

impl NodeError {
    /// Attaches the failing node's identity, unless an inner node already did.
    pub fn attributed(self, name: &str, node_type: NodeType) -> Self {
        match self {
            NodeError::Node { .. } => self,
            other => NodeError::Node {
                name: name.to_string(),
                node_type,
                source: Box::new(other),
            },
        }
    }
}

/// One problem found while reading a procedure script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number of the offending line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Collector for parse diagnostics. Every report is also emitted as an `error!` event.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        error!(line, "{}", message);
        self.entries.push(Diagnostic { line, message });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(
        "Found {} error(s) in '{keyword}' block:\n{}",
        .diagnostics.len(),
        join_diagnostics(.diagnostics)
    )]
    Block {
        keyword: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Input ended before 'End{keyword}' was found")]
    Unterminated {
        keyword: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Expected '{expected}' at line {line} but found '{found}'")]
    UnexpectedHeader {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("Failed to read procedure script: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ParseError::Block { diagnostics, .. } | ParseError::Unterminated { diagnostics, .. } => {
                diagnostics
            }
            _ => &[],
        }
    }
}

/// An inconsistency found by the recursive structural check.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("Node '{node}' does not point back to the sequence that contains it")]
    ScopeMismatch { node: String },

    #[error("Node '{node}' (type '{node_type}') is not relevant to the '{context}' context")]
    ContextMismatch {
        node: String,
        node_type: NodeType,
        context: NodeContext,
    },

    #[error("Keyword '{keyword}' of node '{node}' holds an invalid expression: {source}")]
    InvalidExpression {
        node: String,
        keyword: &'static str,
        #[source]
        source: ExpressionError,
    },
}

/// A failure reading or writing the structured (TOML) form.
#[derive(Debug, Error)]
pub enum StructuredError {
    #[error("Expected {expected} at '{path}'")]
    UnexpectedType { path: String, expected: &'static str },

    #[error("Missing field '{field}' at '{path}'")]
    MissingField { path: String, field: &'static str },

    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Unknown context '{0}'")]
    UnknownContext(String),

    #[error("Unrecognised keyword '{keyword}' for node '{node}'")]
    UnknownKeyword { node: String, keyword: String },

    #[error("Invalid value for keyword '{keyword}' of node '{node}': {reason}")]
    InvalidKeyword {
        node: String,
        keyword: String,
        reason: String,
    },

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("Failed to parse TOML: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Failed to write TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}
