use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};

/// One call to the webinar agent, discriminated by its `action` field.
///
/// String fields are optional on the wire so that a missing field reaches
/// per-operation validation instead of failing as a decode error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentRequest {
    SaveTranscript {
        #[serde(default, rename = "webinarId")]
        webinar_id: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    AskQuestion {
        #[serde(default, rename = "webinarId")]
        webinar_id: Option<String>,
        #[serde(default)]
        question: Option<String>,
    },
    TranscribeAudio {
        /// Base64-encoded audio clip
        #[serde(default)]
        audio: Option<String>,
    },
}

impl AgentRequest {
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| {
            AgentError::Validation("Invalid request body".to_string(), Some(e.to_string()))
        })
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::SaveTranscript { .. } => "save_transcript",
            Self::AskQuestion { .. } => "ask_question",
            Self::TranscribeAudio { .. } => "transcribe_audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTranscript {
    pub id: String,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Saved { success: bool, data: SavedTranscript },
    Answer { answer: String },
    Transcription { text: String },
}
