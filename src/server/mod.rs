//! Payload server answering `GET /download` and `POST /upload`

use crate::{
    client::UploadReceipt,
    error::{AppError, ErrorContext, Result},
    logging::Logger,
    models::ServerConfig,
    units::format_bytes,
};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// State shared by the request handlers
#[derive(Clone)]
pub struct AppState {
    /// Size of every `/download` response body
    pub payload_size: usize,
    pub logger: Logger,
}

impl AppState {
    /// Build handler state from the server configuration
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let payload_size = usize::try_from(config.payload_size)
            .map_err(|_| AppError::config("Payload size does not fit in memory on this platform"))?;

        Ok(Self {
            payload_size,
            logger: Logger::with_server_config("SRV".to_string(), config),
        })
    }
}

/// Create the router with both payload endpoints.
///
/// Other methods on either path get `405 Method Not Allowed`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/download", get(download_handler))
        .route("/upload", post(upload_handler))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn download_handler(State(state): State<AppState>) -> Response {
    // Fresh buffer per request; concurrent downloads never share one
    let body = Bytes::from(vec![0u8; state.payload_size]);

    state
        .logger
        .info(&format!("Sent {} bytes to client", state.payload_size))
        .field("bytes", state.payload_size)
        .field("endpoint", "download")
        .log()
        .await;

    ([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response()
}

async fn upload_handler(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    match drain_body(body, declared).await {
        Ok(received) => {
            state
                .logger
                .info(&format!("Received {} bytes from client", received))
                .field("bytes", received)
                .field("endpoint", "upload")
                .log()
                .await;

            (StatusCode::OK, Json(UploadReceipt { received_bytes: received })).into_response()
        }
        Err(error) => {
            state
                .logger
                .warn(&format!("Upload failed: {}", error))
                .field("endpoint", "upload")
                .error_info(&error)
                .log()
                .await;

            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

/// Read a request body to its end, or until `declared` bytes have arrived.
///
/// Counts every chunk, however the body is fragmented. A body that ends
/// before its declared length is an error.
pub async fn drain_body(body: Body, declared: Option<u64>) -> Result<u64> {
    let mut stream = body.into_data_stream();
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            AppError::server(format!("Failed to read upload body after {} bytes: {}", received, e))
        })?;
        received += chunk.len() as u64;

        if declared.is_some_and(|expected| received >= expected) {
            break;
        }
    }

    if let Some(expected) = declared {
        if received < expected {
            return Err(AppError::server(format!(
                "Upload body ended after {} of {} declared bytes",
                received, expected
            )));
        }
    }

    Ok(received)
}

/// The payload server: configuration plus the router built from it
pub struct PayloadServer {
    config: ServerConfig,
    state: AppState,
}

impl PayloadServer {
    /// Create a server for a validated configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    /// Router serving this server's payload
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.socket_addr();
        TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::io(format!("Failed to bind to {}: {}", addr, e)))
    }

    /// Serve on `listener` until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr().context("reading listener address")?;

        self.state
            .logger
            .info(&format!(
                "Payload server listening on {} ({} per download)",
                addr,
                format_bytes(self.config.payload_size)
            ))
            .field("address", addr.to_string())
            .field("payload_size", self.config.payload_size)
            .log()
            .await;

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| AppError::server(format!("Server error: {}", e)))
    }
}

/// Bind and serve until Ctrl+C
pub async fn run(config: ServerConfig) -> Result<()> {
    let server = PayloadServer::new(config)?;
    let listener = server.bind().await?;
    server.serve(listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
