use super::state::AppState;
use crate::agent::{AgentRequest, AgentResponse};
use crate::error::{AgentError, Result};
use crate::store::{NewWebinar, Webinar};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTokenRequest {
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub participant_name: String,
}

#[derive(Debug, Serialize)]
pub struct RoomTokenResponse {
    pub token: String,
}

/// Unwrap a buffered body, reporting an oversized or unreadable one in the
/// service's own error shape.
fn read_body(body: std::result::Result<Bytes, BytesRejection>) -> Result<Bytes> {
    body.map_err(|rejection| {
        let message = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            "Request body too large"
        } else {
            "Invalid request body"
        };
        AgentError::Validation(message.to_string(), Some(rejection.body_text()))
    })
}

/// Decode a JSON body, reporting failures in the service's own error shape.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        AgentError::Validation("Invalid JSON in request body".to_string(), Some(e.to_string()))
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /agent
/// Dispatch one transcript, question or audio action
pub async fn run_agent(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<AgentResponse>> {
    let request = AgentRequest::from_json(&read_body(body)?)?;
    info!("Agent action: {}", request.action());

    let response = state.agent.handle(request).await?;
    Ok(Json(response))
}

/// POST /rooms/token
/// Issue an access token for a live video room
pub async fn issue_room_token(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<RoomTokenResponse>> {
    let req: RoomTokenRequest = parse_body(&read_body(body)?)?;

    let issuer = state
        .rooms
        .as_ref()
        .ok_or_else(|| AgentError::configuration("Room token credentials are not configured"))?;

    let token = issuer.issue(&req.room_name, &req.participant_name)?;
    Ok(Json(RoomTokenResponse { token }))
}

/// POST /webinars
/// Schedule a new webinar
pub async fn create_webinar(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse> {
    let form: NewWebinar = parse_body(&read_body(body)?)?;
    let webinar = state.webinars.create_webinar(form.into_webinar()?).await?;

    info!("Created webinar {} in room {}", webinar.id, webinar.room_name);
    Ok((StatusCode::CREATED, Json(webinar)))
}

/// GET /webinars
/// List webinars, earliest first
pub async fn list_webinars(State(state): State<AppState>) -> Result<Json<Vec<Webinar>>> {
    Ok(Json(state.webinars.list_webinars().await?))
}

/// GET /webinars/:webinar_id
/// Fetch a single webinar
pub async fn get_webinar(
    State(state): State<AppState>,
    Path(webinar_id): Path<String>,
) -> Result<Json<Webinar>> {
    let not_found = || AgentError::not_found(format!("Webinar {} not found", webinar_id));

    // Malformed ids can never match a row
    let id = Uuid::parse_str(&webinar_id).map_err(|_| not_found())?;

    state
        .webinars
        .get_webinar(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
