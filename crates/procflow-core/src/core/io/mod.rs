//! # I/O Module
//!
//! Line-oriented reading of procedure scripts. The [`script`] module turns raw text into
//! tokenized argument lines, tracking the line number of each so that diagnostics can
//! point back into the source.

pub mod script;
