//! Speech-to-text for short audio clips recorded in the browser

mod whisper;

pub use whisper::WhisperClient;

use crate::error::Result;
use async_trait::async_trait;

/// Turns one encoded audio clip into text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String>;
}
