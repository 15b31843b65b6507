//! HTTP Endpoints
//!
//! Twilio voice webhooks answer with TwiML; everything else is JSON.

use std::time::Duration;

use agrow_agent::{CloseReason, TurnOutcome};
use agrow_core::{AudioClip, AudioFormat, Error, Language};
use axum::{
    extract::{Form, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::{metrics_handler, track_requests};
use crate::state::AppState;
use crate::twiml::{say_voice, Twiml};
use crate::ServerError;

/// Twilio call statuses that end a call
const TERMINAL_CALL_STATUSES: &[&str] = &["completed", "busy", "failed", "no-answer", "canceled"];

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.get_config();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    let timeout = Duration::from_secs(config.server.timeout_seconds);

    Router::new()
        // Telephony webhooks
        .route("/voice/incoming", post(incoming_call))
        .route("/voice/recording", post(recording_ready))
        .route("/voice/status", post(call_status))
        // Call control
        .route("/calls/:call_id/hangup", post(hangup))
        // Synthesized audio
        .route("/audio/:artifact_id", get(serve_audio))
        // Monitoring
        .route("/status", get(list_status))
        .route("/status/:call_id", get(call_status_snapshot))
        .route("/summaries/:call_id", get(summary_outcome))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .route_layer(axum::middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let allowed = if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        tracing::info!("CORS configured with {} origins", parsed_origins.len());
        parsed_origins
    };

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

fn twiml_response(status: StatusCode, twiml: Twiml) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/xml")],
        twiml.render(),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct IncomingCall {
    #[serde(rename = "CallSid")]
    call_sid: String,
    #[serde(rename = "From", default)]
    from: String,
}

#[derive(Debug, Deserialize)]
struct RecordingCallback {
    #[serde(rename = "CallSid")]
    call_sid: String,
    #[serde(rename = "RecordingUrl", default)]
    recording_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusCallback {
    #[serde(rename = "CallSid")]
    call_sid: String,
    #[serde(rename = "CallStatus", default)]
    call_status: String,
}

/// Play the clip if there is one, otherwise speak `text`
fn speak(
    twiml: Twiml,
    state: &AppState,
    base: &str,
    call_id: &str,
    clip: Option<AudioClip>,
    text: &str,
    language: Language,
) -> Twiml {
    match clip {
        Some(clip) if !clip.is_empty() => {
            let id = state.audio.put(call_id, clip);
            twiml.play(&format!("{}/audio/{}", base, id))
        }
        _ => twiml.say(
            text,
            language,
            &say_voice(language, &state.config.telephony.say_voice),
        ),
    }
}

fn listen(twiml: Twiml, state: &AppState, base: &str) -> Twiml {
    let telephony = &state.config.telephony;
    twiml.record(
        &format!("{}/voice/recording", base),
        telephony.record_max_length_secs,
        telephony.record_silence_timeout_secs,
    )
}

/// POST /voice/incoming
///
/// Opens the session and greets the caller in the resolved language.
async fn incoming_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(call): Form<IncomingCall>,
) -> Result<Response, ServerError> {
    if call.call_sid.trim().is_empty() {
        return Err(ServerError::InvalidRequest("missing CallSid".into()));
    }
    let greeting = match state.orchestrator.start_call(&call.call_sid, &call.from) {
        Ok(greeting) => greeting,
        Err(Error::SessionClosed(_)) => {
            return Ok(twiml_response(StatusCode::CONFLICT, Twiml::new().hangup()));
        }
        Err(e) => return Err(e.into()),
    };

    let base = state.base_url(&headers);
    let twiml = speak(
        Twiml::new(),
        &state,
        &base,
        &call.call_sid,
        greeting.cue.audio.clone(),
        greeting.cue.text,
        greeting.language,
    );
    Ok(twiml_response(StatusCode::OK, listen(twiml, &state, &base)))
}

/// POST /voice/recording
///
/// Runs one turn over the recorded question and plays the answer.
async fn recording_ready(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(callback): Form<RecordingCallback>,
) -> Result<Response, ServerError> {
    let call_id = callback.call_sid;
    let snapshot = match state.orchestrator.status(&call_id) {
        Ok(s) if s.stage.is_terminal() => {
            return Ok(twiml_response(StatusCode::CONFLICT, Twiml::new().hangup()));
        }
        Ok(s) => s,
        Err(Error::SessionClosed(_)) => {
            return Ok(twiml_response(StatusCode::CONFLICT, Twiml::new().hangup()));
        }
        Err(e) => return Err(e.into()),
    };
    let base = state.base_url(&headers);

    let audio = match callback.recording_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => match state.recordings.fetch(url).await {
            Ok(clip) => clip,
            Err(e) => {
                // The call stays usable; ask again without touching the session
                tracing::warn!(call_id = %call_id, error = %e, "Recording unavailable");
                let language = snapshot.language;
                let apology = state.orchestrator.cues().cue(agrow_agent::CueKind::Apology, language);
                let twiml = speak(Twiml::new(), &state, &base, &call_id, apology.audio, apology.text, language);
                return Ok(twiml_response(StatusCode::OK, listen(twiml, &state, &base)));
            }
        },
        None => AudioClip::new(Vec::new(), AudioFormat::Wav),
    };

    match state.orchestrator.handle_audio(&call_id, audio).await {
        Ok(outcome) => Ok(twiml_response(
            StatusCode::OK,
            turn_twiml(&state, &base, &call_id, outcome),
        )),
        Err(Error::SessionClosed(_)) | Err(Error::Cancelled) => {
            Ok(twiml_response(StatusCode::CONFLICT, Twiml::new().hangup()))
        }
        Err(e) => Err(e.into()),
    }
}

fn turn_twiml(state: &AppState, base: &str, call_id: &str, outcome: TurnOutcome) -> Twiml {
    let language = outcome.language;
    let twiml = speak(
        Twiml::new(),
        state,
        base,
        call_id,
        Some(outcome.audio),
        &outcome.spoken_text,
        language,
    );
    match outcome.goodbye {
        Some(goodbye) => speak(twiml, state, base, call_id, goodbye.audio, goodbye.text, language).hangup(),
        None => listen(twiml, state, base),
    }
}

/// POST /voice/status
async fn call_status(
    State(state): State<AppState>,
    Form(callback): Form<StatusCallback>,
) -> Result<StatusCode, ServerError> {
    let status = callback.call_status.to_ascii_lowercase();
    if !TERMINAL_CALL_STATUSES.contains(&status.as_str()) {
        tracing::debug!(call_id = %callback.call_sid, status = %status, "Call status update");
        return Ok(StatusCode::NO_CONTENT);
    }
    state
        .orchestrator
        .terminate(&callback.call_sid, CloseReason::Hangup)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /calls/:call_id/hangup
async fn hangup(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.orchestrator.terminate(&call_id, CloseReason::Hangup).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /audio/:artifact_id
async fn serve_audio(
    State(state): State<AppState>,
    Path(artifact_id): Path<String>,
) -> Result<Response, ServerError> {
    let clip = state
        .audio
        .get(&artifact_id)
        .ok_or_else(|| ServerError::NotFound(format!("audio {}", artifact_id)))?;
    Ok(([(header::CONTENT_TYPE, clip.mime_type())], clip.bytes).into_response())
}

/// GET /status
async fn list_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let calls = state.orchestrator.statuses();
    Json(serde_json::json!({
        "count": calls.len(),
        "active": state.orchestrator.sessions().active_count(),
        "calls": calls,
    }))
}

/// GET /status/:call_id
async fn call_status_snapshot(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<agrow_agent::StatusSnapshot>, ServerError> {
    Ok(Json(state.orchestrator.status(&call_id)?))
}

/// GET /summaries/:call_id
async fn summary_outcome(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<agrow_agent::DispatchRecord>, ServerError> {
    state
        .orchestrator
        .summary_outcome(&call_id)
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("summary for {}", call_id)))
}

/// Liveness with a few cheap internal checks
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.orchestrator.sessions();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "sessions": {
                "status": "ok",
                "retained": sessions.len(),
                "active": sessions.active_count(),
            },
            "audio_artifacts": {
                "status": "ok",
                "count": state.audio.len(),
                "oldest_secs": state.audio.oldest_secs(),
            },
        }
    }))
}

/// Ready once startup work (cue pre-rendering) has finished
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let ready = state.is_ready();
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "cues": if ready { "ok" } else { "rendering" },
            }
        })),
    )
}
