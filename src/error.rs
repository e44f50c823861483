use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, AgentError>;

/// Every failure an operation can surface to a caller.
///
/// The first field is the short message shown to users, the second carries
/// whatever the underlying cause reported.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{0}")]
    Validation(String, Option<String>),

    #[error("{0}")]
    NotFound(String, Option<String>),

    #[error("{0}")]
    Infrastructure(String, Option<String>),

    #[error("{0}")]
    Generation(String, Option<String>),

    #[error("{0}")]
    Transcription(String, Option<String>),

    #[error("{0}")]
    Configuration(String, Option<String>),
}

impl AgentError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into(), None)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into(), None)
    }

    pub fn infrastructure(message: impl Into<String>, details: impl ToString) -> Self {
        Self::Infrastructure(message.into(), Some(details.to_string()))
    }

    pub fn generation(message: impl Into<String>, details: impl ToString) -> Self {
        Self::Generation(message.into(), Some(details.to_string()))
    }

    pub fn transcription(message: impl Into<String>, details: impl ToString) -> Self {
        Self::Transcription(message.into(), Some(details.to_string()))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into(), None)
    }

    /// Application-level failures are 400, configuration and upstream
    /// infrastructure failures are 500.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(..) | Self::NotFound(..) | Self::Generation(..) => {
                StatusCode::BAD_REQUEST
            }
            Self::Infrastructure(..) | Self::Transcription(..) | Self::Configuration(..) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Validation(_, d)
            | Self::NotFound(_, d)
            | Self::Infrastructure(_, d)
            | Self::Generation(_, d)
            | Self::Transcription(_, d)
            | Self::Configuration(_, d) => d.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&AgentError> for ErrorResponse {
    fn from(err: &AgentError) -> Self {
        Self {
            error: err.to_string(),
            details: err.details().map(str::to_string),
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{} ({})", self, self.details().unwrap_or("no details"));
        } else {
            warn!("{} ({})", self, self.details().unwrap_or("no details"));
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AgentError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::not_found("none").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::generation("llm", "502").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::infrastructure("db", "timeout").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AgentError::transcription("stt", "bad audio").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AgentError::configuration("missing").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = ErrorResponse::from(&AgentError::validation("webinarId and text are required"));
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"webinarId and text are required"}"#);

        let err = AgentError::infrastructure("Failed to save transcript", "connection refused");
        let body = ErrorResponse::from(&err);
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"details\":\"connection refused\""));
    }
}
