//! Synthetic page model: a mutable DOM arena with HTML parsing, selector
//! queries, mutation observation and click dispatch.

pub mod dom_utils;

mod builder;
mod document;
mod entities;
mod error;
mod selector;
mod tokenizer;
mod types;

pub use crate::builder::parse_document;
pub use crate::document::{Ancestors, Descendants, Document};
pub use crate::error::{DomError, SelectorError};
pub use crate::selector::SelectorList;
pub use crate::tokenizer::tokenize;
pub use crate::types::{Activation, ClickOutcome, MutationRecord, NodeId, ObserverId, Token};
