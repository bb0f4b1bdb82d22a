//! Shared functionality
//!
//! This crate supplies the pieces that are shared between the quill crates: the buffered
//! character reader that feeds the tokenizer, source locations, node ids and the generic error
//! types.
//!

pub mod character_reader;
pub mod node;
pub mod types;
