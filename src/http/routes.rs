use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    // Browser clients call straight from the webinar room page
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Transcript, question and audio actions
        .route("/agent", post(handlers::run_agent))
        // Video room access
        .route("/rooms/token", post(handlers::issue_room_token))
        // Webinar catalogue
        .route(
            "/webinars",
            get(handlers::list_webinars).post(handlers::create_webinar),
        )
        .route("/webinars/:webinar_id", get(handlers::get_webinar))
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(cors)
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
