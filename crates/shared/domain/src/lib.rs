//! Domain layer - Core notes entities and payload types.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! The document store and the repository built on top of it share these types.

pub mod constants;
pub mod error;
pub mod note;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use note::{now_millis, Document, Note, NoteDraft, NotePatch, Timestamp};
