//! Notes Service Library
//!
//! This crate provides per-user notes data access on top of a document store:
//! add, edit and delete calls plus live subscriptions to one note or the
//! whole list.

pub mod auth;
pub mod config;
pub mod repository;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::info;

use domain::{Note, NoteDraft, NotePatch, Timestamp};

use crate::auth::StaticAuthenticator;
use crate::config::NotesServiceConfig;
use crate::repository::{NotesRepository, NotesStream, SystemClock};
use crate::store::MemoryStore;

/// Run a scripted session against an in-memory store, printing every note
/// list the subscription delivers.
pub async fn run_demo(
    user_id: &str,
    config: &NotesServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let auth = Arc::new(StaticAuthenticator::new(user_id));
    let repo = NotesRepository::with_config(store, auth, Arc::new(SystemClock), config);

    info!(collection = %repo.notes_collection()?, "Starting demo session");
    let mut notes = repo.get_notes();
    print_next(&mut notes, "initial load").await?;
    info!(loading = repo.is_loading(), "Loading state after first list");

    let groceries = repo
        .add_note(NoteDraft::new("Groceries", "milk, eggs"))
        .await?;
    print_next(&mut notes, "added groceries").await?;

    let ideas = repo
        .add_note(NoteDraft::new("Ideas", "write a notes app"))
        .await?;
    print_next(&mut notes, "added ideas").await?;

    repo.edit_note(groceries.id(), NotePatch::content("milk, eggs, bread"))
        .await?;
    print_next(&mut notes, "edited groceries").await?;

    repo.delete_note(ideas.id()).await?;
    print_next(&mut notes, "deleted ideas").await?;

    Ok(())
}

async fn print_next(
    notes: &mut NotesStream,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(list) = notes.next().await else {
        return Err("note subscription ended".into());
    };
    let list = list?;

    println!("-- {} ({} notes)", label, list.len());
    for note in &list {
        println!("{}", format_note(note));
    }
    Ok(())
}

fn format_note(note: &Note) -> String {
    format!(
        "{}  {:<12} {:<24} created {}  updated {}",
        note.id,
        note.title,
        note.content,
        format_timestamp(note.created_at),
        format_timestamp(note.updated_at),
    )
}

fn format_timestamp(ts: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| ts.to_string())
}
