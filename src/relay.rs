//! The validate → build payload → forward → relay pipeline shared by `/tts` and `/ttt`.
//!
//! Authentication happens in a route layer before any body is parsed, so by the time
//! [`relay`] runs the caller is trusted. From there the pipeline is linear: build the
//! upstream payload, send it with a bounded timeout, and hand the upstream's answer
//! back untouched. Failures are translated into [`RelayError`] and never retried.
use crate::AppState;
use crate::auth::ConstantTimeString;
use crate::client::HttpClient;
use crate::errors::RelayError;
use crate::models::{CHAT_MODEL, SPEECH_MODEL};
use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use bon::Builder;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Serialize, de::IgnoredAny};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

pub const DEFAULT_SPEECH_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/multimodal-generation/generation";
pub const DEFAULT_CHAT_URL: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Process-wide settings, loaded once at startup and shared read-only by every request.
#[derive(Clone, Builder)]
pub struct RelayConfig {
    /// Secret the frontend presents as `Authorization: Bearer <key>`.
    #[builder(into)]
    pub frontend_key: ConstantTimeString,
    /// Credential sent to the upstream provider.
    #[builder(into)]
    pub upstream_key: String,
    pub speech_url: Url,
    pub chat_url: Url,
    #[builder(default = DEFAULT_UPSTREAM_TIMEOUT)]
    pub timeout: Duration,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("speech_url", &self.speech_url.as_str())
            .field("chat_url", &self.chat_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RelayConfig {
    pub fn speech_upstream(&self) -> Upstream<'_> {
        Upstream {
            service: Service::Speech,
            url: &self.speech_url,
            model: SPEECH_MODEL,
        }
    }

    pub fn chat_upstream(&self) -> Upstream<'_> {
        Upstream {
            service: Service::Chat,
            url: &self.chat_url,
            model: CHAT_MODEL,
        }
    }
}

/// Which upstream service a relayed call targets. Used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Speech,
    Chat,
}

impl Service {
    /// Name at the start of a sentence.
    pub fn title(&self) -> &'static str {
        match self {
            Service::Speech => "TTS",
            Service::Chat => "Chat",
        }
    }

    /// Name in the middle of a sentence.
    pub fn noun(&self) -> &'static str {
        match self {
            Service::Speech => "TTS",
            Service::Chat => "chat",
        }
    }
}

/// Where a relayed call goes and which model it asks for.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    pub service: Service,
    pub url: &'a Url,
    pub model: &'static str,
}

/// Reshapes `input` with `build` and forwards it to `upstream`.
///
/// On a 2xx/3xx answer with a JSON body the upstream status and body bytes are
/// returned as-is. The timeout covers both the request and reading the body; when it
/// fires the in-flight call is dropped.
#[instrument(skip_all, fields(service = upstream.service.title(), model = upstream.model))]
pub async fn relay<T, I, P, F>(
    state: &AppState<T>,
    upstream: Upstream<'_>,
    build: F,
    input: I,
) -> Result<Response, RelayError>
where
    T: HttpClient + Send + Sync,
    P: Serialize,
    F: FnOnce(I, &str) -> P,
{
    let service = upstream.service;
    let body = serde_json::to_vec(&build(input, upstream.model)).map_err(|e| {
        error!("Failed to serialize upstream payload: {}", e);
        RelayError::Internal(e.to_string())
    })?;

    let request = Request::builder()
        .method(Method::POST)
        .uri(upstream.url.as_str())
        .header(AUTHORIZATION, format!("Bearer {}", state.config.upstream_key))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|e| {
            error!("Failed to build upstream request for {}: {}", upstream.url, e);
            RelayError::Internal(e.to_string())
        })?;

    debug!("Forwarding request to {}", upstream.url);

    let exchange = async {
        let response = state.http_client.request(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>((status, bytes))
    };

    let (status, bytes) = match tokio::time::timeout(state.config.timeout, exchange).await {
        Ok(Ok(answer)) => answer,
        Ok(Err(e)) => {
            let message = error_chain(e.as_ref());
            error!("Request error talking to {}: {}", upstream.url, message);
            return Err(RelayError::RequestFailed { service, message });
        }
        Err(_) => {
            error!(
                "Request to {} timed out after {:?}",
                upstream.url, state.config.timeout
            );
            return Err(RelayError::RequestFailed {
                service,
                message: format!("timed out after {:?}", state.config.timeout),
            });
        }
    };

    if status.is_client_error() || status.is_server_error() {
        let body = String::from_utf8_lossy(&bytes).into_owned();
        warn!("HTTP error from upstream: {} {}", status, body);
        return Err(RelayError::Upstream {
            service,
            status,
            body,
        });
    }

    if let Err(e) = serde_json::from_slice::<IgnoredAny>(&bytes) {
        error!("Upstream returned {} with a non-JSON body: {}", status, e);
        return Err(RelayError::Internal(e.to_string()));
    }

    Ok(json_response(status, bytes))
}

/// Renders an error followed by each of its sources, joined with `": "`.
///
/// hyper's client errors only name the failing stage ("client error (Connect)"); the
/// OS-level reason lives further down the chain. Sources whose text is already part
/// of the message are skipped.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn json_response(status: StatusCode, bytes: axum::body::Bytes) -> Response {
    (status, [(CONTENT_TYPE, "application/json")], bytes).into_response()
}
