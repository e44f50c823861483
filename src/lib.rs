pub mod agent;
pub mod completion;
pub mod config;
pub mod error;
pub mod http;
pub mod rooms;
pub mod store;
pub mod transcription;

pub use agent::{AgentRequest, AgentResponse, SavedTranscript, SessionHandler};
pub use completion::{CompletionClient, OpenAiCompletionClient};
pub use config::Config;
pub use error::{AgentError, Result};
pub use http::{create_router, AppState};
pub use rooms::{LiveKitTokenIssuer, RoomTokenIssuer};
pub use store::{MemoryStore, RestStore, TranscriptRecord, TranscriptStore, Webinar, WebinarStore};
pub use transcription::{SpeechToText, WhisperClient};
