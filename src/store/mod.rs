//! Persistence accessors
//!
//! Two record families live in the managed store:
//! - `webinar_transcriptions`: one growing transcript per webinar
//! - `webinars`: the catalogue of scheduled sessions
//!
//! `MemoryStore` keeps both in-process; `RestStore` talks to the
//! PostgREST endpoint of the managed database.

mod memory;
mod records;
mod rest;

pub use memory::MemoryStore;
pub use records::{slugify, NewWebinar, TranscriptRecord, Webinar};
pub use rest::RestStore;

use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Create-or-append access to the single transcript record of a webinar.
///
/// Implementations must not lose fragments when several appends for the same
/// webinar run concurrently.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Most recently updated record for the webinar, if any
    async fn get(&self, webinar_id: &str) -> Result<Option<TranscriptRecord>>;

    /// Append `text` (space-separated) to the webinar's transcript, creating
    /// the record on the first fragment.
    async fn upsert_append(&self, webinar_id: &str, text: &str) -> Result<TranscriptRecord>;
}

#[async_trait]
pub trait WebinarStore: Send + Sync {
    async fn create_webinar(&self, webinar: Webinar) -> Result<Webinar>;

    async fn get_webinar(&self, id: Uuid) -> Result<Option<Webinar>>;

    /// All webinars, earliest start first
    async fn list_webinars(&self) -> Result<Vec<Webinar>>;
}

/// Joins an existing transcript and a new fragment.
pub fn append_fragment(existing: &str, fragment: &str) -> String {
    format!("{} {}", existing, fragment)
}
