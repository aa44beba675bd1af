//! # procflow
//!
//! A procedure-node execution engine for the configuration generation and data
//! analysis stages of a molecular-simulation package.
//!
//! Users author a small, block-structured workflow language ("select this site, for
//! each occurrence calculate this distance, collect it into a histogram...") which is
//! parsed into a tree of typed nodes and later executed, possibly many times, against
//! a mutable simulation state.
//!
//! ## Architectural Philosophy
//!
//! The library follows a layered layout so that each concern stays testable on its own:
//!
//! - **[`core`]: The Foundation.** Arena identifiers, node contexts, the node and
//!   sequence records, parameters, the typed keyword store, node values and their
//!   expressions, the line tokenizer, and the configuration a procedure acts upon.
//!
//! - **[`engine`]: The Logic Core.** The [`engine::tree::ProcedureTree`] arena that owns
//!   every node and sequence, the declare-before-use scoping rules, keyword validation,
//!   the prepare/execute/finalise lifecycle, the node-type registry, and the textual and
//!   structured serialization of whole blocks.
//!
//! - **[`nodes`]: The Node Kinds.** The closed set of concrete node kinds, each
//!   contributing its keywords, parameters, optional branch, and lifecycle behaviour.
//!
//! - **[`workflows`]: The Public API.** The [`workflows::procedure::Procedure`] aggregate
//!   which owns a root sequence and forwards the lifecycle and serialization to it, and
//!   [`workflows::run::run`] which drives a procedure over many iterations with progress
//!   reporting.

pub mod core;
pub mod engine;
pub mod nodes;
pub mod workflows;
