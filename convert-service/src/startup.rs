use crate::config::ConvertConfig;
use crate::handlers;
use crate::services::{Converter, StagingArea};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors_middleware, make_request_span, metrics_middleware, request_id_middleware,
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ConvertConfig,
    pub converter: Converter,
    pub staging: StagingArea,
}

impl AppState {
    pub fn new(config: ConvertConfig) -> Self {
        let converter = Converter::new(&config.converter.program, config.converter.timeout());
        let staging = StagingArea::new(config.staging.root.clone());
        Self {
            config,
            converter,
            staging,
        }
    }
}

/// Routes and middleware, without binding a socket.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_bytes;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/convert", post(handlers::convert_document))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(cors_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: ConvertConfig) -> Result<Self, AppError> {
        tracing::info!(
            converter = %config.converter.program,
            timeout_secs = ?config.converter.timeout_secs,
            staging_root = ?config.staging.root,
            max_upload_bytes = config.upload.max_bytes,
            "Building application"
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::new(config);

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }

    /// Serves until `signal` resolves, then drains in-flight requests.
    pub async fn run_with_shutdown<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
    }
}
