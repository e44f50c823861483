use super::SpeechToText;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{error, info};

const TRANSCRIPTION_FAILED: &str = "Error processing audio";

/// Browser recordings arrive as WebM/Opus
const AUDIO_FILE_NAME: &str = "audio.webm";
const AUDIO_MIME: &str = "audio/webm";

/// Client for OpenAI-compatible `/audio/transcriptions` endpoints.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    language: String,
}

impl WhisperClient {
    pub fn new(api_key: SecretString, base_url: &str, timeout: Duration) -> Result<Self> {
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
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "whisper-1".to_string(),
            language: "es".to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Language hint sent with every clip
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String> {
        let audio_len = audio.len();

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(AUDIO_FILE_NAME)
            .mime_str(AUDIO_MIME)
            .map_err(|e| AgentError::transcription(TRANSCRIPTION_FAILED, e))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        info!("Sending {} bytes of audio for transcription", audio_len);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Transcription request failed: {}", e);
                AgentError::transcription(TRANSCRIPTION_FAILED, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Transcription API error {}: {}", status, body);
            return Err(AgentError::transcription(
                TRANSCRIPTION_FAILED,
                format!("Transcription failed: {}", body),
            ));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::transcription(TRANSCRIPTION_FAILED, e))?;

        json.get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AgentError::transcription(TRANSCRIPTION_FAILED, "response has no text field")
            })
    }
}
