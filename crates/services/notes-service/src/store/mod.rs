//! Document store layer.

mod document_store;
mod memory;
mod path;

pub use document_store::{
    ChangeType, DocumentChange, DocumentSnapshot, DocumentStore, SnapshotStream,
};
#[cfg(any(test, feature = "test-utils"))]
pub use document_store::MockDocumentStore;
pub use memory::MemoryStore;
pub use path::{CollectionPath, Direction, DocumentRef, OrderBy, Query};
