//! The webinar agent: transcript accumulation and question answering
//!
//! Three actions share one endpoint:
//! - `save_transcript` appends a live fragment to the webinar's transcript
//! - `ask_question` answers from the accumulated transcript
//! - `transcribe_audio` turns a recorded clip into text

mod handler;
mod request;

pub use handler::SessionHandler;
pub use request::{AgentRequest, AgentResponse, SavedTranscript};
