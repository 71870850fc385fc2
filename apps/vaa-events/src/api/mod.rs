use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::EventsError;

pub mod health;
pub mod messages;
pub mod state;

pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/readyz", get(health::readyz))
        .route("/totals", get(messages::totals))
        .route("/recent", get(messages::recent))
        .route("/transaction", get(messages::transaction))
        .route("/readrow", get(messages::read_row))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for EventsError {
    fn into_response(self) -> Response {
        let status = match &self {
            EventsError::NotFound(_) => StatusCode::NOT_FOUND,
            EventsError::InvalidArgument(_) | EventsError::MalformedIdentity(_) => {
                StatusCode::BAD_REQUEST
            }
            e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
