use super::{append_fragment, TranscriptRecord, TranscriptStore, Webinar, WebinarStore};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-process store for local runs and tests.
///
/// Appends run entirely under the write lock, so concurrent fragments for the
/// same webinar are serialized.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// webinar_id → transcript record
    transcripts: Arc<RwLock<HashMap<String, TranscriptRecord>>>,

    /// id → webinar
    webinars: Arc<RwLock<HashMap<Uuid, Webinar>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn get(&self, webinar_id: &str) -> Result<Option<TranscriptRecord>> {
        let transcripts = self.transcripts.read().await;
        Ok(transcripts.get(webinar_id).cloned())
    }

    async fn upsert_append(&self, webinar_id: &str, text: &str) -> Result<TranscriptRecord> {
        let mut transcripts = self.transcripts.write().await;
        let now = Utc::now();

        let record = match transcripts.get_mut(webinar_id) {
            Some(existing) => {
                existing.transcript = append_fragment(&existing.transcript, text);
                existing.updated_at = Some(now);
                existing.clone()
            }
            None => {
                let record = TranscriptRecord {
                    id: Uuid::new_v4().to_string(),
                    webinar_id: webinar_id.to_string(),
                    transcript: text.to_string(),
                    created_at: now,
                    updated_at: Some(now),
                };
                transcripts.insert(webinar_id.to_string(), record.clone());
                record
            }
        };

        debug!(
            "Transcript for {} is now {} bytes",
            webinar_id,
            record.transcript.len()
        );

        Ok(record)
    }
}

#[async_trait]
impl WebinarStore for MemoryStore {
    async fn create_webinar(&self, webinar: Webinar) -> Result<Webinar> {
        let mut webinars = self.webinars.write().await;

        if webinars.values().any(|w| w.room_name == webinar.room_name) {
            return Err(AgentError::validation(format!(
                "Room {} is already taken",
                webinar.room_name
            )));
        }

        webinars.insert(webinar.id, webinar.clone());
        Ok(webinar)
    }

    async fn get_webinar(&self, id: Uuid) -> Result<Option<Webinar>> {
        let webinars = self.webinars.read().await;
        Ok(webinars.get(&id).cloned())
    }

    async fn list_webinars(&self) -> Result<Vec<Webinar>> {
        let webinars = self.webinars.read().await;
        let mut all: Vec<Webinar> = webinars.values().cloned().collect();
        all.sort_by_key(|w| w.start_time);
        Ok(all)
    }
}
