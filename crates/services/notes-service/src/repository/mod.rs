//! Repository layer for notes data access.

mod clock;
mod notes_repository;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notes_repository::{NoteStream, NotesRepository, NotesStream};
