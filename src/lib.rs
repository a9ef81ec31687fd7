//! qwen-relay - an authenticated JSON relay for the DashScope speech and chat APIs
//!
//! The frontend never sees the upstream credential: it authenticates to this service
//! with a shared bearer token, and the relay re-signs each request with the upstream
//! key before forwarding it. Upstream answers are passed back unchanged.

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod auth;
pub mod client;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod relay;

use client::HttpClient;
use handlers::{analyze_text, health, require_frontend_key, root, synthesize_speech};
use relay::RelayConfig;

/// The main application state containing the HTTP client and the relay configuration
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub config: Arc<RelayConfig>,
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(config: RelayConfig, http_client: T) -> Self {
        Self {
            http_client,
            config: Arc::new(config),
        }
    }
}

/// Build the main router for the relay
/// This creates routes for:
/// - `/tts` - Speech synthesis, forwarded upstream
/// - `/ttt` - Answer analysis, forwarded upstream
/// - `/` and `/health` - Static payloads that never touch upstream
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    let relayed = Router::new()
        .route("/tts", post(synthesize_speech::<T>))
        .route("/ttt", post(analyze_text::<T>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_frontend_key::<T>,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(relayed)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Logs every request on the way in and its status on the way out.
async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    info!("Request: {} {}", method, uri);
    let response = next.run(req).await;
    info!("Response status: {} ({} {})", response.status(), method, uri);
    response
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// Installs the global recorder, so call it at most once per process.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::Mutex;
    use std::time::Duration;

    enum MockBehaviour {
        Respond { status: StatusCode, body: String },
        Fail(String),
    }

    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<MockRequest>>>,
        behaviour: Arc<MockBehaviour>,
        delay: Option<Duration>,
    }

    #[derive(Debug, Clone)]
    pub struct MockRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl MockRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).unwrap()
        }
    }

    impl MockHttpClient {
        pub fn new(status: StatusCode, body: &str) -> Self {
            Self::from_behaviour(MockBehaviour::Respond {
                status,
                body: body.to_string(),
            })
        }

        /// A client whose every request fails at the transport level.
        pub fn failing(message: &str) -> Self {
            Self::from_behaviour(MockBehaviour::Fail(message.to_string()))
        }

        /// Wait this long before answering.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn from_behaviour(behaviour: MockBehaviour) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                behaviour: Arc::new(behaviour),
                delay: None,
            }
        }

        pub fn get_requests(&self) -> Vec<MockRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl std::fmt::Debug for MockHttpClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockHttpClient")
                .field("requests", &self.requests)
                .field("delay", &self.delay)
                .finish_non_exhaustive()
        }
    }

    impl Clone for MockHttpClient {
        fn clone(&self) -> Self {
            Self {
                requests: Arc::clone(&self.requests),
                behaviour: Arc::clone(&self.behaviour),
                delay: self.delay,
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            req: axum::extract::Request,
        ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
                .to_vec();

            self.requests.lock().unwrap().push(MockRequest {
                method,
                uri,
                headers,
                body,
            });

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match self.behaviour.as_ref() {
                MockBehaviour::Respond { status, body } => Ok(axum::response::Response::builder()
                    .status(*status)
                    .body(axum::body::Body::from(body.clone()))
                    .unwrap()),
                MockBehaviour::Fail(message) => Err(message.clone().into()),
            }
        }
    }
}
