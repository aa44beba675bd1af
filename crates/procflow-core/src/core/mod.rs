//! # Core Module
//!
//! Stateless building blocks shared by the engine and the node kinds.
//!
//! - [`ids`] - Arena keys for nodes and sequences
//! - [`context`] - Context tags restricting where node kinds may be placed
//! - [`node`] - The per-node record (identity, keywords, parameters, links)
//! - [`sequence`] - The per-sequence record (context, owner, ordered nodes)
//! - [`parameter`] - Named scalar variables declared by nodes
//! - [`keywords`] - The typed keyword store configuring each node
//! - [`expression`] - Node values and the small expression evaluator behind them
//! - [`configuration`] - The mutable system a procedure runs against
//! - [`data`] - Histogram and processed data containers used by node kinds
//! - [`io`] - Tokenizing procedure scripts

pub mod configuration;
pub mod context;
pub mod data;
pub mod expression;
pub mod ids;
pub mod io;
pub mod keywords;
pub mod node;
pub mod parameter;
pub mod sequence;
