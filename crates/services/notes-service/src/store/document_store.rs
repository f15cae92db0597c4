//! Document store abstraction.
//!
//! The store owns persistence, consistency and the wire protocol. Callers see
//! per-document writes plus push-based snapshot subscriptions.

use async_trait::async_trait;
use futures::stream::BoxStream;

use common::AppResult;
use domain::Document;

use super::path::{CollectionPath, DocumentRef, Query};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Live snapshot subscription. Dropping the stream unsubscribes.
pub type SnapshotStream<T> = BoxStream<'static, AppResult<T>>;

/// Kind of change that produced a document payload in a query snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

/// State of a single document at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    /// `None` when the document does not exist
    pub data: Option<Document>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }
}

/// One document of a query snapshot with its change marker.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub change_type: ChangeType,
    pub id: String,
    pub data: Document,
}

/// Document store trait for dependency injection.
///
/// Subscriptions are lazy: nothing is registered with the store until the
/// returned stream is first polled. The first item is the current state.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id
    async fn add(&self, collection: &CollectionPath, data: Document) -> AppResult<DocumentRef>;

    /// Merge fields into an existing document
    async fn update(&self, doc: &DocumentRef, data: Document) -> AppResult<()>;

    /// Remove a document
    async fn delete(&self, doc: &DocumentRef) -> AppResult<()>;

    /// Subscribe to every change of one document
    fn document_changes(&self, doc: &DocumentRef) -> SnapshotStream<DocumentSnapshot>;

    /// Subscribe to full result snapshots of a query
    fn query_changes(&self, query: &Query) -> SnapshotStream<Vec<DocumentChange>>;
}
