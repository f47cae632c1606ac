//! Consistency-preserving editor for HuggingFace-style BPE `tokenizer.json`
//! files.
//!
//! A BPE tokenizer file couples a vocabulary (token string <-> numeric id)
//! with an ordered list of merge rules (`left ++ right -> result`). Editing
//! either in isolation is easy to get wrong: adding a token needs a
//! consistent way to derive it from what is already there, and removing a
//! token can silently orphan every merge rule that produced it from pieces
//! that no longer exist. [`BpeTokenizerEditor`] keeps both in lockstep.

mod addition;
mod document;
mod editor;
mod error;
mod merges;
mod removal;
mod stats;
mod validator;
mod vocab;

pub use addition::{AdditionMethod, AdditionResult};
pub use editor::BpeTokenizerEditor;
pub use error::{Error, Result};
pub use merges::Merge;
pub use removal::{RemovalResult, ShrinkResult};
pub use stats::TokenizerStats;
pub use validator::{InvalidMerge, ValidationResult};
pub use vocab::{Token, TokenId};
