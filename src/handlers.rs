/// Axum handlers for the relay server
use crate::AppState;
use crate::auth::validate_bearer_header;
use crate::client::HttpClient;
use crate::errors::RelayError;
use crate::models::{AnalysisRequest, HealthResponse, RootResponse, SpeechRequest};
use crate::relay::relay;
use axum::{
    Json,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, instrument, warn};

/// Route layer guarding the relayed endpoints. Runs before the body is read, so a bad
/// token is rejected even when the body is malformed.
pub async fn require_frontend_key<T: HttpClient + Clone + Send + Sync + 'static>(
    State(state): State<AppState<T>>,
    req: Request,
    next: Next,
) -> Result<Response, RelayError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !validate_bearer_header(&state.config.frontend_key, header) {
        warn!("Rejected {} {}: invalid API key", req.method(), req.uri().path());
        return Err(RelayError::Unauthorized);
    }

    Ok(next.run(req).await)
}

/// `POST /tts`: forwards text to the speech synthesis model.
#[instrument(skip_all)]
pub async fn synthesize_speech<T: HttpClient + Clone + Send + Sync + 'static>(
    State(state): State<AppState<T>>,
    Json(request): Json<SpeechRequest>,
) -> Result<Response, RelayError> {
    info!(
        "Synthesizing {} chars with voice {} ({})",
        request.text.chars().count(),
        request.voice,
        request.language_type
    );
    relay(
        &state,
        state.config.speech_upstream(),
        SpeechRequest::into_payload,
        request,
    )
    .await
}

/// `POST /ttt`: asks the chat model to grade the student's answers.
#[instrument(skip_all)]
pub async fn analyze_text<T: HttpClient + Clone + Send + Sync + 'static>(
    State(state): State<AppState<T>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Response, RelayError> {
    info!("Analyzing {} chars of answers", request.user_text.chars().count());
    relay(
        &state,
        state.config.chat_upstream(),
        AnalysisRequest::into_payload,
        request,
    )
    .await
}

pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "TTS Service is running",
        docs: "/docs",
    })
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}
