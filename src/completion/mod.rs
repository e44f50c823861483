//! Question answering over the accumulated transcript

mod openai;

pub use openai::OpenAiCompletionClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Instruction preceding the transcript in every prompt
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant answering questions about a webinar. \
Use the following transcript as context for your answer:";

/// Answers a question given transcript context; one upstream call per answer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn answer(&self, context: &str, question: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// System turn carrying the whole transcript, followed by the question.
pub fn build_messages(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: format!("{}\n{}", SYSTEM_INSTRUCTION, context),
        },
        ChatMessage {
            role: "user".to_string(),
            content: question.to_string(),
        },
    ]
}
