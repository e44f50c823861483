//! HTTP API for the webinar front end
//!
//! - POST /agent - Transcript, question and audio actions
//! - POST /rooms/token - Issue a video room access token
//! - GET/POST /webinars - List or schedule webinars
//! - GET /webinars/:id - Fetch one webinar
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{RoomTokenRequest, RoomTokenResponse};
pub use routes::create_router;
pub use state::AppState;
