//! In-process document store with live subscriptions.
//!
//! Follows hosted document-store semantics: ids are assigned on add, updates
//! merge top-level fields and fail on missing documents, deletes of missing
//! documents succeed, ordered queries skip documents lacking the order field.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::Document;

use super::document_store::{
    ChangeType, DocumentChange, DocumentSnapshot, DocumentStore, SnapshotStream,
};
use super::path::{CollectionPath, Direction, DocumentRef, Query};

/// In-memory [`DocumentStore`]. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<CollectionPath, BTreeMap<String, Document>>,
    denied: HashSet<CollectionPath>,
    document_watchers: Vec<DocumentWatcher>,
    query_watchers: Vec<QueryWatcher>,
}

struct DocumentWatcher {
    target: DocumentRef,
    tx: UnboundedSender<AppResult<DocumentSnapshot>>,
}

struct QueryWatcher {
    query: Query,
    last_rows: Vec<(String, Document)>,
    last_types: HashMap<String, ChangeType>,
    tx: UnboundedSender<AppResult<Vec<DocumentChange>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny all access to `collection`. Open subscriptions on it receive a
    /// permission error and are closed.
    pub fn deny(&self, collection: &CollectionPath) {
        let mut state = self.state.lock();
        state.denied.insert(collection.clone());

        state.document_watchers.retain(|watcher| {
            if watcher.target.collection() == collection {
                let _ = watcher.tx.send(Err(AppError::permission_denied(collection.as_str())));
                false
            } else {
                true
            }
        });
        state.query_watchers.retain(|watcher| {
            if watcher.query.collection() == collection {
                let _ = watcher.tx.send(Err(AppError::permission_denied(collection.as_str())));
                false
            } else {
                true
            }
        });

        info!(collection = %collection, "Access denied");
    }

    /// Lift a previous [`MemoryStore::deny`].
    pub fn allow(&self, collection: &CollectionPath) {
        self.state.lock().denied.remove(collection);
    }

    /// Raw stored payload of a document, if present.
    pub fn document(&self, doc: &DocumentRef) -> Option<Document> {
        let state = self.state.lock();
        state
            .collections
            .get(doc.collection())
            .and_then(|docs| docs.get(doc.id()))
            .cloned()
    }

    /// Number of documents stored in `collection`.
    pub fn count(&self, collection: &CollectionPath) -> usize {
        let state = self.state.lock();
        state.collections.get(collection).map_or(0, BTreeMap::len)
    }

    fn subscribe_document(
        &self,
        target: DocumentRef,
    ) -> AppResult<UnboundedReceiver<AppResult<DocumentSnapshot>>> {
        let mut state = self.state.lock();
        state.check_access(target.collection())?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Ok(state.snapshot(&target)));
        debug!(document = %target, "Document subscription opened");
        state.document_watchers.push(DocumentWatcher { target, tx });

        Ok(rx)
    }

    fn subscribe_query(
        &self,
        query: Query,
    ) -> AppResult<UnboundedReceiver<AppResult<Vec<DocumentChange>>>> {
        let mut state = self.state.lock();
        state.check_access(query.collection())?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = QueryWatcher {
            query,
            last_rows: Vec::new(),
            last_types: HashMap::new(),
            tx,
        };
        let rows = state.run_query(&watcher.query);
        let changes = watcher.diff(rows);
        let _ = watcher.tx.send(Ok(changes));
        debug!(collection = %watcher.query.collection(), "Query subscription opened");
        state.query_watchers.push(watcher);

        Ok(rx)
    }
}

impl StoreState {
    fn check_access(&self, collection: &CollectionPath) -> AppResult<()> {
        if self.denied.contains(collection) {
            return Err(AppError::permission_denied(collection.as_str()));
        }
        Ok(())
    }

    fn snapshot(&self, target: &DocumentRef) -> DocumentSnapshot {
        DocumentSnapshot {
            id: target.id().to_string(),
            data: self
                .collections
                .get(target.collection())
                .and_then(|docs| docs.get(target.id()))
                .cloned(),
        }
    }

    fn run_query(&self, query: &Query) -> Vec<(String, Document)> {
        let Some(docs) = self.collections.get(query.collection()) else {
            return Vec::new();
        };

        let Some(ordering) = query.ordering() else {
            return docs.iter().map(|(id, data)| (id.clone(), data.clone())).collect();
        };

        let mut rows: Vec<(String, Document)> = docs
            .iter()
            .filter(|(_, data)| data.contains_key(&ordering.field))
            .map(|(id, data)| (id.clone(), data.clone()))
            .collect();

        rows.sort_by(|(a_id, a), (b_id, b)| {
            let by_field = compare_values(&a[&ordering.field], &b[&ordering.field]);
            let order = by_field.then_with(|| a_id.cmp(b_id));
            match ordering.direction {
                Direction::Ascending => order,
                Direction::Descending => order.reverse(),
            }
        });
        rows
    }

    /// Push fresh snapshots to every live subscription affected by a write to
    /// `target`. Closed subscriptions are dropped.
    fn notify(&mut self, target: &DocumentRef) {
        let snapshot = self.snapshot(target);
        self.document_watchers.retain(|watcher| {
            if watcher.target != *target {
                return !watcher.tx.is_closed();
            }
            watcher.tx.send(Ok(snapshot.clone())).is_ok()
        });

        let mut watchers = std::mem::take(&mut self.query_watchers);
        watchers.retain_mut(|watcher| {
            if watcher.query.collection() != target.collection() {
                return !watcher.tx.is_closed();
            }
            let rows = self.run_query(&watcher.query);
            if rows == watcher.last_rows {
                return !watcher.tx.is_closed();
            }
            let changes = watcher.diff(rows);
            watcher.tx.send(Ok(changes)).is_ok()
        });
        self.query_watchers = watchers;
    }
}

impl QueryWatcher {
    /// Mark every row against the previous emission and remember this one.
    fn diff(&mut self, rows: Vec<(String, Document)>) -> Vec<DocumentChange> {
        let previous: HashMap<&str, &Document> = self
            .last_rows
            .iter()
            .map(|(id, data)| (id.as_str(), data))
            .collect();

        let mut types = HashMap::with_capacity(rows.len());
        let changes: Vec<DocumentChange> = rows
            .iter()
            .map(|(id, data)| {
                let change_type = match previous.get(id.as_str()) {
                    None => ChangeType::Added,
                    Some(prev) if *prev == data => self
                        .last_types
                        .get(id)
                        .copied()
                        .unwrap_or(ChangeType::Added),
                    Some(_) => ChangeType::Modified,
                };
                types.insert(id.clone(), change_type);
                DocumentChange {
                    change_type,
                    id: id.clone(),
                    data: data.clone(),
                }
            })
            .collect();

        self.last_rows = rows;
        self.last_types = types;
        changes
    }
}

/// Total order over JSON values: null < bool < number < string < array < object.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Turn a subscription outcome into a stream: the receiver's items, or the
/// single subscription error.
fn into_stream<T: Send + 'static>(
    subscribed: AppResult<UnboundedReceiver<AppResult<T>>>,
) -> SnapshotStream<T> {
    match subscribed {
        Ok(rx) => stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed(),
        Err(e) => stream::iter([Err(e)]).boxed(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &CollectionPath, data: Document) -> AppResult<DocumentRef> {
        let mut state = self.state.lock();
        state.check_access(collection)?;

        let doc = collection.doc(&Uuid::new_v4().simple().to_string())?;
        state
            .collections
            .entry(collection.clone())
            .or_default()
            .insert(doc.id().to_string(), data);
        debug!(document = %doc, "Document added");

        state.notify(&doc);
        Ok(doc)
    }

    async fn update(&self, doc: &DocumentRef, data: Document) -> AppResult<()> {
        let mut state = self.state.lock();
        state.check_access(doc.collection())?;

        let stored = state
            .collections
            .get_mut(doc.collection())
            .and_then(|docs| docs.get_mut(doc.id()))
            .ok_or_not_found(doc.path())?;
        stored.extend(data);
        debug!(document = %doc, "Document updated");

        state.notify(doc);
        Ok(())
    }

    async fn delete(&self, doc: &DocumentRef) -> AppResult<()> {
        let mut state = self.state.lock();
        state.check_access(doc.collection())?;

        let removed = state
            .collections
            .get_mut(doc.collection())
            .and_then(|docs| docs.remove(doc.id()));

        if removed.is_some() {
            debug!(document = %doc, "Document deleted");
            state.notify(doc);
        }
        Ok(())
    }

    fn document_changes(&self, doc: &DocumentRef) -> SnapshotStream<DocumentSnapshot> {
        let store = self.clone();
        let target = doc.clone();
        stream::once(async move { store.subscribe_document(target) })
            .flat_map(into_stream)
            .boxed()
    }

    fn query_changes(&self, query: &Query) -> SnapshotStream<Vec<DocumentChange>> {
        let store = self.clone();
        let query = query.clone();
        stream::once(async move { store.subscribe_query(query) })
            .flat_map(into_stream)
            .boxed()
    }
}
