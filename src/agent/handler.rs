use super::request::{AgentRequest, AgentResponse, SavedTranscript};
use crate::completion::CompletionClient;
use crate::error::{AgentError, Result};
use crate::store::TranscriptStore;
use crate::transcription::SpeechToText;
use base64::Engine;
use std::sync::Arc;
use tracing::{info, warn};

/// Stateless dispatcher behind the agent endpoint.
///
/// Holds only handles to its collaborators; every call is an independent
/// lookup-then-mutate or lookup-then-query.
#[derive(Clone)]
pub struct SessionHandler {
    transcripts: Arc<dyn TranscriptStore>,
    completion: Arc<dyn CompletionClient>,
    speech: Arc<dyn SpeechToText>,
}

impl SessionHandler {
    pub fn new(
        transcripts: Arc<dyn TranscriptStore>,
        completion: Arc<dyn CompletionClient>,
        speech: Arc<dyn SpeechToText>,
    ) -> Self {
        Self {
            transcripts,
            completion,
            speech,
        }
    }

    pub async fn handle(&self, request: AgentRequest) -> Result<AgentResponse> {
        match request {
            AgentRequest::SaveTranscript { webinar_id, text } => {
                let data = self
                    .save_transcript(
                        webinar_id.as_deref().unwrap_or_default(),
                        text.as_deref().unwrap_or_default(),
                    )
                    .await?;
                Ok(AgentResponse::Saved {
                    success: true,
                    data,
                })
            }
            AgentRequest::AskQuestion {
                webinar_id,
                question,
            } => {
                let answer = self
                    .ask_question(
                        webinar_id.as_deref().unwrap_or_default(),
                        question.as_deref().unwrap_or_default(),
                    )
                    .await?;
                Ok(AgentResponse::Answer { answer })
            }
            AgentRequest::TranscribeAudio { audio } => {
                let text = self.transcribe_audio(audio.as_deref().unwrap_or_default()).await?;
                Ok(AgentResponse::Transcription { text })
            }
        }
    }

    /// Append a fragment to the webinar's transcript, creating it on first use.
    pub async fn save_transcript(&self, webinar_id: &str, text: &str) -> Result<SavedTranscript> {
        if webinar_id.trim().is_empty() || text.trim().is_empty() {
            return Err(AgentError::validation("webinarId and text are required"));
        }

        info!("Saving transcript fragment for webinar: {}", webinar_id);

        let record = self.transcripts.upsert_append(webinar_id, text).await?;

        Ok(SavedTranscript {
            id: record.id,
            transcript: record.transcript,
        })
    }

    /// Answer a question grounded in everything transcribed so far.
    pub async fn ask_question(&self, webinar_id: &str, question: &str) -> Result<String> {
        if webinar_id.trim().is_empty() || question.trim().is_empty() {
            return Err(AgentError::validation("webinarId and question are required"));
        }

        info!("Answering question for webinar: {}", webinar_id);

        let record = self
            .transcripts
            .get(webinar_id)
            .await?
            .ok_or_else(|| {
                warn!("No transcript yet for webinar: {}", webinar_id);
                AgentError::not_found("No transcript available")
            })?;

        self.completion.answer(&record.transcript, question).await
    }

    /// Transcribe a base64-encoded audio clip.
    pub async fn transcribe_audio(&self, audio_base64: &str) -> Result<String> {
        let audio_base64 = audio_base64.trim();
        if audio_base64.is_empty() {
            return Err(AgentError::Validation(
                "No audio data provided".to_string(),
                Some("Audio data is missing or invalid".to_string()),
            ));
        }

        let audio = base64::engine::general_purpose::STANDARD
            .decode(audio_base64)
            .map_err(|e| AgentError::transcription("Error processing audio", e))?;

        info!("Transcribing {} bytes of audio", audio.len());

        self.speech.transcribe(audio).await
    }
}
