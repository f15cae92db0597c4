//! Notes service configuration.

use std::env;

use common::ServiceConfig;
use domain::{NOTES_COLLECTION, USERS_COLLECTION};

/// Notes service configuration.
#[derive(Debug, Clone)]
pub struct NotesServiceConfig {
    /// Base service settings
    pub service: ServiceConfig,
    /// Top-level collection keyed by user id
    pub users_collection: String,
    /// Per-user notes subcollection
    pub notes_collection: String,
}

impl NotesServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service: ServiceConfig {
                service_name: defaults.service.service_name,
                log_level: env::var("RUST_LOG").unwrap_or(defaults.service.log_level),
            },
            users_collection: env::var("NOTES_USERS_COLLECTION")
                .unwrap_or(defaults.users_collection),
            notes_collection: env::var("NOTES_COLLECTION").unwrap_or(defaults.notes_collection),
        }
    }
}

impl Default for NotesServiceConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                service_name: "notes-service".to_string(),
                ..ServiceConfig::default()
            },
            users_collection: USERS_COLLECTION.to_string(),
            notes_collection: NOTES_COLLECTION.to_string(),
        }
    }
}
