//! # Gateway Server
//!
//! Binds the fixed route table to the bridges:
//!
//! | Route                    | Handler                          |
//! |--------------------------|----------------------------------|
//! | `GET /health`            | always `200 OK`                  |
//! | `POST /call/{method}`    | [`crate::bridge::unary`]         |
//! | `GET /stream/{method}`   | [`crate::bridge::stream`]        |
//!
//! The registry is built once in [`Gateway::new`]; if that fails nothing is served.
//! Every connection is handled on its own task and no admission control is applied.
use crate::{
    bridge::{stream, unary},
    config::GatewayConfig,
    dispatcher::{ConnectError, Dispatcher},
    registry::{DescriptorRegistry, SchemaError},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    routing::{get, post},
};
use std::{future::Future, io, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Errors that prevent the gateway from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Backend(#[from] ConnectError),
}

pub struct Gateway {
    dispatcher: Dispatcher,
    config: GatewayConfig,
}

impl Gateway {
    /// Builds the registry from an encoded `FileDescriptorSet` and prepares the backend endpoint.
    pub fn new(schema: &[u8], config: GatewayConfig) -> Result<Self, StartupError> {
        let registry = DescriptorRegistry::build(schema)?;
        tracing::info!(
            methods = registry.method_count(),
            messages = registry.message_count(),
            "Descriptor registry built"
        );
        for route in registry.methods() {
            tracing::debug!(method = %route.full_name(), shape = ?route.shape(), "Registered method");
        }

        let dispatcher = Dispatcher::new(Arc::new(registry), &config)?;
        Ok(Self { dispatcher, config })
    }

    /// The route table with its middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/call/{*method}", post(unary::handle))
            .route("/stream/{*method}", get(stream::handle))
            .with_state(self.dispatcher.clone())
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(cors())
            .layer(TraceLayer::new_for_http())
    }

    /// Serves until Ctrl+C or SIGTERM is received.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serves until `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoint = %self.config.endpoint,
            "Gateway listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

async fn health() -> &'static str {
    "OK"
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(false)
        .max_age(Duration::from_secs(300))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }
}
