//! Serialization of node sequences.
//!
//! - [`text`] - The block-structured script form (`<Block> ... End<Block>`)
//! - [`structured`] - A TOML form carrying the same information
//!
//! Keyword values are converted by the shared codecs in `keywords`.

pub(crate) mod keywords;
pub mod structured;
pub mod text;
