use crate::agent::SessionHandler;
use crate::completion::OpenAiCompletionClient;
use crate::config::{Config, StoreKind, DEFAULT_MAX_BODY_BYTES};
use crate::error::{AgentError, Result};
use crate::rooms::{LiveKitTokenIssuer, RoomTokenIssuer};
use crate::store::{MemoryStore, RestStore, TranscriptStore, WebinarStore};
use crate::transcription::WhisperClient;
use std::sync::Arc;
use tracing::info;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Transcript, question and audio actions
    pub agent: SessionHandler,

    /// Webinar catalogue
    pub webinars: Arc<dyn WebinarStore>,

    /// Unset when no room credentials are configured
    pub rooms: Option<Arc<dyn RoomTokenIssuer>>,

    /// Request body cap applied by the router
    pub body_limit: usize,
}

impl AppState {
    pub fn new(agent: SessionHandler, webinars: Arc<dyn WebinarStore>) -> Self {
        Self {
            agent,
            webinars,
            rooms: None,
            body_limit: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn with_rooms(mut self, rooms: Arc<dyn RoomTokenIssuer>) -> Self {
        self.rooms = Some(rooms);
        self
    }

    /// Wire stores and upstream clients from a validated configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let timeout = config.request_timeout;

        let (transcripts, webinars): (Arc<dyn TranscriptStore>, Arc<dyn WebinarStore>) =
            match (config.store, config.persistence) {
                (StoreKind::Rest, Some(persistence)) => {
                    info!("Using persistence gateway at {}", persistence.endpoint);
                    let store = Arc::new(
                        RestStore::new(&persistence.endpoint, persistence.key, timeout)?
                            .with_max_write_attempts(persistence.max_write_attempts),
                    );
                    (
                        store.clone() as Arc<dyn TranscriptStore>,
                        store as Arc<dyn WebinarStore>,
                    )
                }
                (StoreKind::Rest, None) => {
                    return Err(AgentError::configuration(
                        "Persistence settings are required for the rest store",
                    ))
                }
                (StoreKind::Memory, _) => {
                    info!("Using in-memory store; data is lost on restart");
                    let store = Arc::new(MemoryStore::new());
                    (
                        store.clone() as Arc<dyn TranscriptStore>,
                        store as Arc<dyn WebinarStore>,
                    )
                }
            };

        let completion = OpenAiCompletionClient::new(
            config.completion.api_key,
            &config.completion.base_url,
            timeout,
        )?
        .with_model(config.completion.model)
        .with_sampling(config.completion.temperature, config.completion.max_tokens);

        let speech = WhisperClient::new(
            config.transcription.api_key,
            &config.transcription.base_url,
            timeout,
        )?
        .with_model(config.transcription.model)
        .with_language(config.transcription.language);

        let agent = SessionHandler::new(transcripts, Arc::new(completion), Arc::new(speech));
        let state = Self::new(agent, webinars).with_body_limit(config.server.max_body_bytes);

        Ok(match config.rooms {
            Some(rooms) => state.with_rooms(Arc::new(LiveKitTokenIssuer::new(
                rooms.api_key,
                rooms.api_secret,
                rooms.token_ttl,
            ))),
            None => state,
        })
    }
}
