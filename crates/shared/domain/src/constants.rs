//! Domain-level constants.
//!
//! These constants define where notes live in the document store and
//! which fields carry the note timestamps.

// =============================================================================
// Collection layout
// =============================================================================

/// Top-level collection holding one document per user
pub const USERS_COLLECTION: &str = "users";

/// Per-user subcollection holding the user's notes
pub const NOTES_COLLECTION: &str = "notes";

// =============================================================================
// Note fields
// =============================================================================

/// Field name of the note identifier when merged into a payload
pub const FIELD_ID: &str = "id";

/// Field name of the note title
pub const FIELD_TITLE: &str = "title";

/// Field name of the note body
pub const FIELD_CONTENT: &str = "content";

/// Creation timestamp field (epoch milliseconds, written once)
pub const FIELD_CREATED_AT: &str = "created_at";

/// Last-mutation timestamp field (epoch milliseconds)
pub const FIELD_UPDATED_AT: &str = "updated_at";

/// Field the note list is ordered by (descending)
pub const NOTES_ORDER_FIELD: &str = FIELD_UPDATED_AT;
