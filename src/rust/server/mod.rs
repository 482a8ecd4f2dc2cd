//! HTTP surface: `GET /` liveness and `POST /predict` uploads.

mod error;
mod routes;

pub use error::{ApiError, ErrorBody, INTERNAL_ERROR, MODEL_NOT_LOADED, NOT_AN_IMAGE};
pub use routes::{PredictionResponse, Status, LIVENESS_MESSAGE};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::classifier::ImageClassifier;

/// Outcome of the one model load attempted at startup.
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<dyn ImageClassifier>),
    Unavailable(String),
}

/// Immutable context handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub model: ModelState,
    pub expose_raw_label: bool,
}

impl AppState {
    pub fn ready(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            model: ModelState::Ready(classifier),
            expose_raw_label: true,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            model: ModelState::Unavailable(reason.into()),
            expose_raw_label: true,
        }
    }

    pub fn with_raw_label(mut self, expose: bool) -> Self {
        self.expose_raw_label = expose;
        self
    }

    pub(crate) fn classifier(&self) -> Result<Arc<dyn ImageClassifier>, ApiError> {
        match &self.model {
            ModelState::Ready(classifier) => Ok(Arc::clone(classifier)),
            ModelState::Unavailable(reason) => Err(ApiError::ModelUnavailable(reason.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::home))
        .route("/predict", post(routes::predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(state: AppState, config: &ServerConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.get_address()).await?;
        Ok(Self {
            router: router(state, config.max_upload_bytes),
            listener,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        log::info!("Starting app on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        log::info!("Server stopped");
        Ok(())
    }
}
