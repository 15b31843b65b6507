//! Agrow Helpline Server
//!
//! Twilio voice webhooks, the audio artifacts they play, and monitoring
//! endpoints over the turn orchestrator.

pub mod audio_store;
pub mod http;
pub mod metrics;
pub mod recording;
pub mod state;
pub mod twiml;

pub use audio_store::AudioStore;
pub use http::create_router;
pub use metrics::init_metrics;
pub use recording::RecordingFetcher;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Call(#[from] agrow_core::Error),

    #[error("Recording download failed: {0}")]
    Recording(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An adapter or exporter could not be built at startup
    #[error("Startup error: {0}")]
    Startup(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Call(err) => match err {
                agrow_core::Error::SessionClosed(_) | agrow_core::Error::Cancelled => {
                    StatusCode::CONFLICT
                }
                agrow_core::Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
                agrow_core::Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Recording(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Startup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Call(err) => err.kind(),
            Self::Recording(_) => "RecordingDownload",
            Self::NotFound(_) => "NotFound",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Startup(_) => "Startup",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
