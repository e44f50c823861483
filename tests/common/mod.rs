// Shared stubs for integration tests
//
// Upstream collaborators (completion API, speech-to-text, persistence
// gateway) are replaced either by in-process trait impls or by small axum
// servers bound to an ephemeral localhost port.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use webinar_agent::{AgentError, CompletionClient, SpeechToText};

/// Serve `app` on 127.0.0.1 and return its base URL.
pub async fn spawn_server(app: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok(format!("http://{}", addr))
}

/// Completion stub that answers with the context it was given.
#[derive(Default)]
pub struct EchoCompletion {
    pub calls: AtomicUsize,
    pub questions: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionClient for EchoCompletion {
    async fn answer(&self, context: &str, question: &str) -> webinar_agent::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.questions.lock().unwrap().push(question.to_string());
        Ok(context.to_string())
    }
}

/// Completion stub with a canned answer.
pub struct FixedCompletion {
    pub answer: String,
    pub calls: AtomicUsize,
}

impl FixedCompletion {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionClient for FixedCompletion {
    async fn answer(&self, _context: &str, _question: &str) -> webinar_agent::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// Speech-to-text stub that records the decoded audio it receives.
#[derive(Default)]
pub struct RecordingSpeech {
    pub calls: AtomicUsize,
    pub received: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl SpeechToText for RecordingSpeech {
    async fn transcribe(&self, audio: Vec<u8>) -> webinar_agent::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = format!("{} bytes of audio", audio.len());
        self.received.lock().unwrap().push(audio);
        Ok(text)
    }
}

/// Speech-to-text stub that always fails upstream.
pub struct FailingSpeech;

#[async_trait]
impl SpeechToText for FailingSpeech {
    async fn transcribe(&self, _audio: Vec<u8>) -> webinar_agent::Result<String> {
        Err(AgentError::transcription(
            "Error processing audio",
            "upstream returned 503",
        ))
    }
}
