//! # Engine Module
//!
//! The node/sequence engine: tree ownership, scope resolution, validation, the
//! three-phase lifecycle and serialization.
//!
//! ## Overview
//!
//! All nodes and sequences of a procedure live in a single [`tree::ProcedureTree`]
//! arena. Strong ownership flows one way only (a sequence owns its nodes, a node owns
//! at most one branch sequence), and every back-reference is a plain arena key, so the
//! node → scope → owner → scope chain never forms an ownership cycle.
//!
//! ## Architecture
//!
//! - **Arena** ([`tree`]) - Node and sequence storage, append/remove and context resolution
//! - **Queries** ([`query`]) - Declare-before-use scoped lookup and whole-tree lookup
//! - **Validation** ([`validation`]) - Keyword reference repair and structural checks
//! - **Lifecycle** ([`lifecycle`]) - Prepare, execute and finalise over a sequence
//! - **Registry** ([`registry`]) - The single constructor for node kinds
//! - **Serialization** ([`serialise`]) - Text block and TOML forms
//! - **Errors** ([`error`]) - Structural, domain, parse and check errors
//!
//! ## Error Tiers
//!
//! Structural errors (context mismatch, duplicate names, an unresolved "inherit"
//! context) indicate a tree built incorrectly and abort construction: the panicking
//! entry points raise them as contract failures, and `try_*` variants hand them back to
//! callers such as the parser that turn them into diagnostics. Everything else is a
//! domain error returned as an ordinary `Result`.

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod progress;
pub mod query;
pub mod registry;
pub mod serialise;
pub mod tree;
pub mod validation;
