//! Notes repository scoped to the signed-in user.
//!
//! Every call resolves the current user's `users/{uid}/notes` collection and
//! forwards to the document store. Store failures are returned as-is.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use common::{AppError, AppResult};
use domain::{Note, NoteDraft, NotePatch, NOTES_ORDER_FIELD};

use super::clock::{Clock, SystemClock};
use crate::auth::Authenticator;
use crate::config::NotesServiceConfig;
use crate::store::{
    ChangeType, CollectionPath, Direction, DocumentChange, DocumentRef, DocumentSnapshot,
    DocumentStore, Query,
};

/// Live stream of one note; `None` while the note does not exist.
pub type NoteStream = BoxStream<'static, AppResult<Option<Note>>>;

/// Live stream of the full note list, newest update first.
pub type NotesStream = BoxStream<'static, AppResult<Vec<Note>>>;

/// Data access for the signed-in user's notes.
pub struct NotesRepository {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn Authenticator>,
    clock: Arc<dyn Clock>,
    users_collection: String,
    notes_collection: String,
    loading: Arc<watch::Sender<bool>>,
}

impl NotesRepository {
    /// Create a repository with the default collection layout and wall-clock time
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn Authenticator>) -> Self {
        Self::with_config(
            store,
            auth,
            Arc::new(SystemClock),
            &NotesServiceConfig::default(),
        )
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
        config: &NotesServiceConfig,
    ) -> Self {
        let (loading, _) = watch::channel(true);
        Self {
            store,
            auth,
            clock,
            users_collection: config.users_collection.clone(),
            notes_collection: config.notes_collection.clone(),
            loading: Arc::new(loading),
        }
    }

    /// The signed-in user's notes collection, resolved now.
    pub fn notes_collection(&self) -> AppResult<CollectionPath> {
        let user_id = self.auth.current_user_id()?;
        CollectionPath::new(&[
            self.users_collection.as_str(),
            user_id.as_str(),
            self.notes_collection.as_str(),
        ])
    }

    fn note_ref(&self, id: &str) -> AppResult<DocumentRef> {
        self.notes_collection()?.doc(id)
    }

    /// `true` until the first note list has been delivered.
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Observe the loading state.
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Add a note. `created_at` and `updated_at` share one call-time timestamp.
    pub async fn add_note(&self, draft: NoteDraft) -> AppResult<DocumentRef> {
        let collection = self.notes_collection()?;
        let now = self.clock.now();
        debug!(collection = %collection, "Adding note");

        self.store.add(&collection, draft.into_document(now)).await
    }

    /// Apply `patch` to a note and refresh its `updated_at`.
    pub async fn edit_note(&self, id: &str, patch: NotePatch) -> AppResult<()> {
        let doc = self.note_ref(id)?;
        let now = self.clock.now();
        debug!(document = %doc, "Editing note");

        self.store.update(&doc, patch.into_document(now)).await
    }

    pub async fn delete_note(&self, id: &str) -> AppResult<()> {
        let doc = self.note_ref(id)?;
        debug!(document = %doc, "Deleting note");

        self.store.delete(&doc).await
    }

    /// Subscribe to one note. Each store change event yields one item.
    pub fn get_note(&self, id: &str) -> NoteStream {
        let doc = match self.note_ref(id) {
            Ok(doc) => doc,
            Err(e) => return stream::iter([Err(e)]).boxed(),
        };
        debug!(document = %doc, "Subscribing to note");

        self.store
            .document_changes(&doc)
            .map(|snapshot| snapshot.and_then(snapshot_to_note))
            .boxed()
    }

    /// Subscribe to all notes ordered by `updated_at` descending.
    ///
    /// The first successful emission clears the loading flag.
    pub fn get_notes(&self) -> NotesStream {
        let collection = match self.notes_collection() {
            Ok(collection) => collection,
            Err(e) => return stream::iter([Err(e)]).boxed(),
        };
        debug!(collection = %collection, "Subscribing to notes");

        let query = Query::new(collection).order_by(NOTES_ORDER_FIELD, Direction::Descending);
        let loading = Arc::clone(&self.loading);

        self.store
            .query_changes(&query)
            .map(move |changes| -> AppResult<Vec<Note>> {
                let notes = changes_to_notes(changes?);
                mark_loaded(&loading);
                Ok(notes)
            })
            .boxed()
    }
}

fn snapshot_to_note(snapshot: DocumentSnapshot) -> AppResult<Option<Note>> {
    let DocumentSnapshot { id, data } = snapshot;
    data.map(|data| Note::from_document(&id, data))
        .transpose()
        .map_err(AppError::from)
}

fn changes_to_notes(changes: Vec<DocumentChange>) -> Vec<Note> {
    changes
        .into_iter()
        .filter(|change| change.change_type != ChangeType::Removed)
        .filter_map(|change| match Note::from_document(&change.id, change.data) {
            Ok(note) => Some(note),
            Err(e) => {
                warn!(error = %e, "Skipping malformed note");
                None
            }
        })
        .collect()
}

fn mark_loaded(loading: &watch::Sender<bool>) {
    let cleared = loading.send_if_modified(|loading| std::mem::replace(loading, false));
    if cleared {
        info!("Initial note list loaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthenticator;
    use crate::repository::ManualClock;
    use crate::store::MockDocumentStore;
    use domain::Document;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn signed_in(user_id: &'static str) -> MockAuthenticator {
        let mut auth = MockAuthenticator::new();
        auth.expect_current_user_id()
            .returning(move || Ok(user_id.to_string()));
        auth
    }

    fn repository(store: MockDocumentStore, auth: MockAuthenticator, now: i64) -> NotesRepository {
        NotesRepository::with_config(
            Arc::new(store),
            Arc::new(auth),
            Arc::new(ManualClock::new(now)),
            &NotesServiceConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_add_note_writes_both_timestamps() {
        let mut store = MockDocumentStore::new();
        store.expect_add().times(1).returning(|collection, data| {
            assert_eq!(collection.as_str(), "users/u1/notes");
            assert_eq!(
                Value::Object(data),
                json!({ "title": "A", "content": "x", "created_at": 1000, "updated_at": 1000 })
            );
            collection.doc("n1")
        });

        let repo = repository(store, signed_in("u1"), 1000);
        let reference = repo.add_note(NoteDraft::new("A", "x")).await.unwrap();

        assert_eq!(reference.id(), "n1");
    }

    #[tokio::test]
    async fn test_edit_note_refreshes_updated_at_only() {
        let mut store = MockDocumentStore::new();
        store.expect_update().times(1).returning(|doc, data| {
            assert_eq!(doc.path(), "users/u1/notes/n1");
            assert_eq!(Value::Object(data), json!({ "title": "B", "updated_at": 2000 }));
            Ok(())
        });

        let repo = repository(store, signed_in("u1"), 2000);
        assert!(repo.edit_note("n1", NotePatch::title("B")).await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_note_passes_not_found_through() {
        let mut store = MockDocumentStore::new();
        store
            .expect_update()
            .returning(|doc, _| Err(AppError::not_found(doc.path())));

        let repo = repository(store, signed_in("u1"), 0);
        let err = repo.edit_note("gone", NotePatch::default()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref p) if p == "users/u1/notes/gone"));
    }

    #[tokio::test]
    async fn test_add_note_passes_store_error_through() {
        let mut store = MockDocumentStore::new();
        store
            .expect_add()
            .returning(|collection, _| Err(AppError::permission_denied(collection.as_str())));

        let repo = repository(store, signed_in("u1"), 0);
        let err = repo.add_note(NoteDraft::new("A", "x")).await.unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied(ref p) if p == "users/u1/notes"));
    }

    #[tokio::test]
    async fn test_delete_note_passes_store_error_through() {
        let mut store = MockDocumentStore::new();
        store
            .expect_delete()
            .returning(|doc| Err(AppError::permission_denied(doc.path())));

        let repo = repository(store, signed_in("u1"), 0);
        let err = repo.delete_note("n1").await.unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied(ref p) if p == "users/u1/notes/n1"));
    }

    #[tokio::test]
    async fn test_delete_note_targets_user_collection() {
        let mut store = MockDocumentStore::new();
        store.expect_delete().times(1).returning(|doc| {
            assert_eq!(doc.path(), "users/u2/notes/n9");
            Ok(())
        });

        let repo = repository(store, signed_in("u2"), 0);
        assert!(repo.delete_note("n9").await.is_ok());
    }

    #[tokio::test]
    async fn test_signed_out_user_never_reaches_store() {
        let store = MockDocumentStore::new();
        let mut auth = MockAuthenticator::new();
        auth.expect_current_user_id()
            .returning(|| Err(AppError::Unauthorized));

        let repo = repository(store, auth, 0);

        assert!(matches!(
            repo.add_note(NoteDraft::default()).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            repo.get_notes().next().await,
            Some(Err(AppError::Unauthorized))
        ));
        assert!(repo.is_loading());
    }

    #[tokio::test]
    async fn test_get_note_merges_id_and_maps_missing_to_none() {
        let mut store = MockDocumentStore::new();
        store.expect_document_changes().returning(|doc| {
            let id = doc.id().to_string();
            stream::iter(vec![
                Ok(DocumentSnapshot {
                    id: id.clone(),
                    data: Some(doc_with_times("A", 5, 5)),
                }),
                Ok(DocumentSnapshot { id, data: None }),
            ])
            .boxed()
        });

        let repo = repository(store, signed_in("u1"), 0);
        let items: Vec<_> = repo.get_note("n1").collect().await;

        let note = items[0].as_ref().unwrap().as_ref().unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.title, "A");
        assert!(items[1].as_ref().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_note_forwards_store_error_unchanged() {
        let mut store = MockDocumentStore::new();
        store.expect_document_changes().returning(|_| {
            stream::iter(vec![Err(AppError::permission_denied("users/u1/notes"))]).boxed()
        });

        let repo = repository(store, signed_in("u1"), 0);
        let first = repo.get_note("n1").next().await.unwrap();

        assert!(matches!(first, Err(AppError::PermissionDenied(ref p)) if p == "users/u1/notes"));
    }

    #[tokio::test]
    async fn test_get_notes_queries_by_updated_at_desc() {
        let mut store = MockDocumentStore::new();
        store.expect_query_changes().times(1).returning(|query| {
            assert_eq!(query.collection().as_str(), "users/u1/notes");
            let ordering = query.ordering().unwrap();
            assert_eq!(ordering.field, "updated_at");
            assert_eq!(ordering.direction, Direction::Descending);
            stream::iter(vec![Ok(Vec::new())]).boxed()
        });

        let repo = repository(store, signed_in("u1"), 0);
        let notes = repo.get_notes().next().await.unwrap().unwrap();
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn test_get_notes_skips_removed_and_malformed() {
        let mut store = MockDocumentStore::new();
        store.expect_query_changes().returning(|_| {
            stream::iter(vec![Ok(vec![
                DocumentChange {
                    change_type: ChangeType::Added,
                    id: "a".to_string(),
                    data: doc_with_times("A", 1, 9),
                },
                DocumentChange {
                    change_type: ChangeType::Removed,
                    id: "b".to_string(),
                    data: doc_with_times("B", 1, 8),
                },
                DocumentChange {
                    change_type: ChangeType::Added,
                    id: "c".to_string(),
                    data: doc(json!({ "title": ["not", "text"], "updated_at": 7 })),
                },
            ])])
            .boxed()
        });

        let repo = repository(store, signed_in("u1"), 0);
        let notes = repo.get_notes().next().await.unwrap().unwrap();

        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_loading_flag_clears_once_on_first_list() {
        let mut store = MockDocumentStore::new();
        store.expect_query_changes().returning(|_| {
            stream::iter(vec![
                Err(AppError::unavailable("offline")),
                Ok(Vec::new()),
                Ok(Vec::new()),
            ])
            .boxed()
        });

        let repo = repository(store, signed_in("u1"), 0);
        let mut loading = repo.loading();
        let mut notes = repo.get_notes();
        assert!(repo.is_loading());

        assert!(notes.next().await.unwrap().is_err());
        assert!(repo.is_loading());
        assert!(!loading.has_changed().unwrap());

        notes.next().await.unwrap().unwrap();
        assert!(!repo.is_loading());
        assert!(loading.has_changed().unwrap());
        assert!(!*loading.borrow_and_update());

        notes.next().await.unwrap().unwrap();
        assert!(!repo.is_loading());
        assert!(!loading.has_changed().unwrap());
    }

    fn doc_with_times(title: &str, created_at: i64, updated_at: i64) -> Document {
        doc(json!({
            "title": title,
            "content": "",
            "created_at": created_at,
            "updated_at": updated_at,
        }))
    }
}
