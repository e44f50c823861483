use super::{append_fragment, TranscriptRecord, TranscriptStore, Webinar, WebinarStore};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

const TRANSCRIPTS_TABLE: &str = "webinar_transcriptions";
const WEBINARS_TABLE: &str = "webinars";

/// PostgREST client for the managed database.
///
/// Appends use optimistic concurrency: the record's `updated_at` is the
/// version token, the update is conditional on it, and a lost race re-reads
/// and tries again. First fragments rely on a unique index over
/// `webinar_transcriptions.webinar_id` to turn a concurrent insert into a
/// `409 Conflict`.
pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
    key: SecretString,
    max_write_attempts: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WebinarRow {
    id: Uuid,
    title: String,
    description: String,
    start_time: DateTime<Utc>,
    host_name: String,
    room_name: String,
}

impl From<WebinarRow> for Webinar {
    fn from(row: WebinarRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            host_name: row.host_name,
            room_name: row.room_name,
        }
    }
}

impl From<Webinar> for WebinarRow {
    fn from(webinar: Webinar) -> Self {
        Self {
            id: webinar.id,
            title: webinar.title,
            description: webinar.description,
            start_time: webinar.start_time,
            host_name: webinar.host_name,
            room_name: webinar.room_name,
        }
    }
}

#[derive(Serialize)]
struct NewTranscriptRow<'a> {
    webinar_id: &'a str,
    transcript: &'a str,
    created_at: String,
    updated_at: String,
}

#[derive(Serialize)]
struct TranscriptPatch<'a> {
    transcript: &'a str,
    updated_at: String,
}

/// Timestamps are written at microsecond precision so they compare equal to
/// what Postgres stores when reused as a filter.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl RestStore {
    /// `endpoint` is the project base URL; tables live under `/rest/v1/`.
    pub fn new(endpoint: &str, key: SecretString, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AgentError::Configuration(
                    "Failed to build HTTP client".to_string(),
                    Some(e.to_string()),
                )
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
            max_write_attempts: 5,
        })
    }

    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let key = self.key.expose_secret();
        self.client
            .request(method, format!("{}/rest/v1/{}", self.endpoint, table))
            .header("apikey", key)
            .bearer_auth(key)
    }

    async fn send(&self, req: RequestBuilder, action: &str) -> Result<Response> {
        req.send().await.map_err(|e| {
            error!("Persistence request failed ({}): {}", action, e);
            let message = if e.is_timeout() {
                format!("Timed out trying to {}", action)
            } else {
                format!("Failed to {}", action)
            };
            AgentError::infrastructure(message, e)
        })
    }

    async fn read_rows<T: DeserializeOwned>(response: Response, action: &str) -> Result<Vec<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Persistence gateway returned {} ({}): {}", status, action, body);
            return Err(AgentError::infrastructure(
                format!("Failed to {}", action),
                format!("{}: {}", status, body),
            ));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| AgentError::infrastructure(format!("Failed to {}", action), e))
    }

    async fn fetch_transcript(&self, webinar_id: &str) -> Result<Option<TranscriptRecord>> {
        let req = self.request(Method::GET, TRANSCRIPTS_TABLE).query(&[
            ("select", "*".to_string()),
            ("webinar_id", format!("eq.{}", webinar_id)),
            ("order", "updated_at.desc.nullslast,created_at.desc".to_string()),
            ("limit", "1".to_string()),
        ]);

        let response = self.send(req, "read transcript").await?;
        let rows: Vec<TranscriptRecord> = Self::read_rows(response, "read transcript").await?;
        Ok(rows.into_iter().next())
    }

    /// `None` when a concurrent insert for the same webinar won.
    async fn try_insert(&self, webinar_id: &str, text: &str) -> Result<Option<TranscriptRecord>> {
        let now = timestamp(Utc::now());
        let req = self
            .request(Method::POST, TRANSCRIPTS_TABLE)
            .header("Prefer", "return=representation")
            .json(&NewTranscriptRow {
                webinar_id,
                transcript: text,
                created_at: now.clone(),
                updated_at: now,
            });

        let response = self.send(req, "create transcript").await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(None);
        }

        let rows: Vec<TranscriptRecord> = Self::read_rows(response, "create transcript").await?;
        rows.into_iter().next().map(Some).ok_or_else(|| {
            AgentError::infrastructure("Failed to create transcript", "insert returned no row")
        })
    }

    /// `None` when the record changed since `existing` was read.
    async fn try_append(
        &self,
        existing: &TranscriptRecord,
        text: &str,
    ) -> Result<Option<TranscriptRecord>> {
        let version = match existing.updated_at {
            Some(at) => format!("eq.{}", timestamp(at)),
            None => "is.null".to_string(),
        };

        let transcript = append_fragment(&existing.transcript, text);
        let req = self
            .request(Method::PATCH, TRANSCRIPTS_TABLE)
            .query(&[
                ("id", format!("eq.{}", existing.id)),
                ("updated_at", version),
            ])
            .header("Prefer", "return=representation")
            .json(&TranscriptPatch {
                transcript: &transcript,
                updated_at: timestamp(Utc::now()),
            });

        let response = self.send(req, "update transcript").await?;
        let rows: Vec<TranscriptRecord> = Self::read_rows(response, "update transcript").await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl TranscriptStore for RestStore {
    async fn get(&self, webinar_id: &str) -> Result<Option<TranscriptRecord>> {
        self.fetch_transcript(webinar_id).await
    }

    async fn upsert_append(&self, webinar_id: &str, text: &str) -> Result<TranscriptRecord> {
        for attempt in 1..=self.max_write_attempts {
            let written = match self.fetch_transcript(webinar_id).await? {
                Some(existing) => self.try_append(&existing, text).await?,
                None => self.try_insert(webinar_id, text).await?,
            };

            if let Some(record) = written {
                return Ok(record);
            }

            debug!(
                "Write conflict on transcript for {} (attempt {}/{})",
                webinar_id, attempt, self.max_write_attempts
            );
        }

        warn!(
            "Giving up on transcript append for {} after {} conflicting writes",
            webinar_id, self.max_write_attempts
        );
        Err(AgentError::infrastructure(
            "Failed to save transcript",
            format!("{} conflicting concurrent writes", self.max_write_attempts),
        ))
    }
}

#[async_trait]
impl WebinarStore for RestStore {
    async fn create_webinar(&self, webinar: Webinar) -> Result<Webinar> {
        let room_name = webinar.room_name.clone();
        let req = self
            .request(Method::POST, WEBINARS_TABLE)
            .header("Prefer", "return=representation")
            .json(&WebinarRow::from(webinar));

        let response = self.send(req, "create webinar").await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(AgentError::validation(format!(
                "Room {} is already taken",
                room_name
            )));
        }

        let rows: Vec<WebinarRow> = Self::read_rows(response, "create webinar").await?;
        rows.into_iter().next().map(Webinar::from).ok_or_else(|| {
            AgentError::infrastructure("Failed to create webinar", "insert returned no row")
        })
    }

    async fn get_webinar(&self, id: Uuid) -> Result<Option<Webinar>> {
        let req = self.request(Method::GET, WEBINARS_TABLE).query(&[
            ("select", "*".to_string()),
            ("id", format!("eq.{}", id)),
            ("limit", "1".to_string()),
        ]);

        let response = self.send(req, "read webinar").await?;
        let rows: Vec<WebinarRow> = Self::read_rows(response, "read webinar").await?;
        Ok(rows.into_iter().next().map(Webinar::from))
    }

    async fn list_webinars(&self) -> Result<Vec<Webinar>> {
        let req = self
            .request(Method::GET, WEBINARS_TABLE)
            .query(&[("select", "*"), ("order", "start_time.asc")]);

        let response = self.send(req, "list webinars").await?;
        let rows: Vec<WebinarRow> = Self::read_rows(response, "list webinars").await?;
        Ok(rows.into_iter().map(Webinar::from).collect())
    }
}
