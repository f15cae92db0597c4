//! Collection paths, document references and ordered queries.

use std::fmt;

use common::{AppError, AppResult};

const SEPARATOR: char = '/';

/// Slash-separated path to a collection, e.g. `users/{uid}/notes`.
///
/// A collection path always has an odd number of non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Build a collection path from its segments.
    pub fn new(segments: &[&str]) -> AppResult<Self> {
        if segments.len() % 2 == 0 {
            return Err(AppError::invalid_argument(format!(
                "collection path needs an odd number of segments, got {}",
                segments.len()
            )));
        }
        for segment in segments {
            validate_segment(segment)?;
        }

        Ok(Self(segments.join("/")))
    }

    /// Parse a slash-separated collection path.
    pub fn parse(path: &str) -> AppResult<Self> {
        let segments: Vec<&str> = path.split(SEPARATOR).collect();
        Self::new(&segments)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reference a document inside this collection.
    pub fn doc(&self, id: &str) -> AppResult<DocumentRef> {
        validate_segment(id)?;
        Ok(DocumentRef {
            collection: self.clone(),
            id: id.to_string(),
        })
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_segment(segment: &str) -> AppResult<()> {
    if segment.is_empty() {
        return Err(AppError::invalid_argument("path segment must not be empty"));
    }
    if segment.contains(SEPARATOR) {
        return Err(AppError::invalid_argument(format!(
            "path segment '{}' must not contain '{}'",
            segment, SEPARATOR
        )));
    }
    Ok(())
}

/// Reference to a single document inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    collection: CollectionPath,
    id: String,
}

impl DocumentRef {
    /// Store-assigned document identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    /// Full slash-separated document path
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Sort direction of an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Field ordering applied to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Live query over a whole collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    collection: CollectionPath,
    order_by: Option<OrderBy>,
}

impl Query {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            order_by: None,
        }
    }

    /// Order results by `field`. Documents lacking the field are excluded.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }
}
