//! Access tokens for the live video rooms
//!
//! Tokens follow the LiveKit claim layout: the API key is the issuer, the
//! participant is the subject, and a `video` grant names the room.

use crate::error::{AgentError, Result};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub trait RoomTokenIssuer: Send + Sync {
    fn issue(&self, room_name: &str, participant_name: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// Signs HS256 room tokens with the configured key/secret pair.
pub struct LiveKitTokenIssuer {
    api_key: String,
    api_secret: SecretString,
    ttl: Duration,
}

impl LiveKitTokenIssuer {
    pub fn new(api_key: impl Into<String>, api_secret: SecretString, ttl: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
            ttl,
        }
    }
}

impl RoomTokenIssuer for LiveKitTokenIssuer {
    fn issue(&self, room_name: &str, participant_name: &str) -> Result<String> {
        let room_name = room_name.trim();
        let participant_name = participant_name.trim();
        if room_name.is_empty() || participant_name.is_empty() {
            return Err(AgentError::validation(
                "roomName and participantName are required",
            ));
        }

        let now = Utc::now().timestamp();
        let claims = RoomClaims {
            iss: self.api_key.clone(),
            sub: participant_name.to_string(),
            name: participant_name.to_string(),
            nbf: now,
            exp: now + self.ttl.as_secs() as i64,
            video: VideoGrant {
                room: room_name.to_string(),
                room_join: true,
                can_publish: true,
                can_subscribe: true,
            },
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes()),
        )
        .map_err(|e| {
            AgentError::Configuration("Failed to sign room token".to_string(), Some(e.to_string()))
        })?;

        info!("Issued room token for {} in {}", participant_name, room_name);
        Ok(token)
    }
}
