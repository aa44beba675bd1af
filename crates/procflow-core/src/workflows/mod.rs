//! # Workflows Module
//!
//! The public entry points for building, loading and running a procedure.
//!
//! ## Overview
//!
//! A [`procedure::Procedure`] owns one [`ProcedureTree`](crate::engine::tree::ProcedureTree)
//! and its root sequence, together with the context the whole workflow runs in and the
//! block keyword that frames it in text (`Analyser ... EndAnalyser`). It forwards the
//! lifecycle, validation and serialization to the engine.
//!
//! ## Architecture
//!
//! - **Procedure** ([`procedure`]) - Construction, lifecycle, text and TOML forms
//! - **Run** ([`run`]) - Prepare once, execute for a number of iterations, finalise,
//!   reporting progress as it goes

pub mod procedure;
pub mod run;
