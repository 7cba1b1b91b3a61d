//! HTTP transport used by the transfer driver

use crate::{
    error::{AppError, Result},
    models::Config,
    types::Direction,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body returned by `POST /upload`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Bytes the server drained from the request body
    pub received_bytes: u64,
}

/// What a single completed transfer reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    /// HTTP status of the response
    pub status: u16,
    /// Bytes read from the response, or acknowledged by the server for uploads
    pub bytes: u64,
}

/// Transport trait for abstraction and testing
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the download payload and drain it completely
    async fn download(&self, url: &Url) -> Result<TransferReceipt>;

    /// Send `payload` as the request body and read the server's receipt
    async fn upload(&self, url: &Url, payload: Bytes) -> Result<TransferReceipt>;
}

/// Connection pool settings for the shared reqwest client
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub tcp_nodelay: bool,
}

impl PoolConfig {
    /// Pool sized for the configured number of simultaneous transfers
    pub fn for_config(config: &Config) -> Self {
        Self {
            max_idle_per_host: config.concurrency as usize,
            idle_timeout: Duration::from_secs(90),
            connect_timeout: config.timeout(),
            tcp_nodelay: true,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: crate::defaults::DEFAULT_CONCURRENCY as usize,
            idle_timeout: Duration::from_secs(90),
            connect_timeout: crate::defaults::DEFAULT_TIMEOUT,
            tcp_nodelay: true,
        }
    }
}

/// reqwest-backed transport shared by every task in a batch
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport for the given configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_pool(PoolConfig::for_config(config))
    }

    /// Create a transport with explicit pool settings
    pub fn with_pool(pool: PoolConfig) -> Result<Self> {
        // No overall request timeout here; the driver applies its own deadline
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .connect_timeout(pool.connect_timeout)
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .pool_idle_timeout(pool.idle_timeout)
            .tcp_nodelay(pool.tcp_nodelay)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn download(&self, url: &Url) -> Result<TransferReceipt> {
        let response = self.client.get(url.clone()).send().await?;
        let status = check_status(url, response.status())?;
        let expected = response.content_length();

        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::network(format!("Download from {} interrupted after {} bytes: {}", url, received, e))
            })?;
            received += chunk.len() as u64;
        }

        if let Some(expected) = expected {
            if received != expected {
                return Err(AppError::transfer(format!(
                    "Download from {} ended after {} of {} bytes",
                    url, received, expected
                )));
            }
        }

        Ok(TransferReceipt {
            status: status.as_u16(),
            bytes: received,
        })
    }

    async fn upload(&self, url: &Url, payload: Bytes) -> Result<TransferReceipt> {
        let sent = payload.len() as u64;
        let response = self
            .client
            .post(url.clone())
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;
        let status = check_status(url, response.status())?;

        let receipt: UploadReceipt = response.json().await.map_err(|e| {
            AppError::http_request(format!("Invalid upload receipt from {}: {}", url, e))
        })?;

        if receipt.received_bytes != sent {
            return Err(AppError::transfer(format!(
                "Server at {} acknowledged {} of {} uploaded bytes",
                url, receipt.received_bytes, sent
            )));
        }

        Ok(TransferReceipt {
            status: status.as_u16(),
            bytes: receipt.received_bytes,
        })
    }
}

fn check_status(url: &Url, status: StatusCode) -> Result<StatusCode> {
    if status.is_success() {
        Ok(status)
    } else {
        Err(AppError::http_request(format!("{} returned HTTP {}", url, status)))
    }
}

/// Resolve the endpoint for `direction` beneath the server base URL.
///
/// A base path without a trailing slash is treated as a directory, so
/// `http://host/lst` resolves to `http://host/lst/download`.
pub fn endpoint_url(base: &Url, direction: Direction) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);

    Ok(base.join(direction.endpoint())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::with_pool(PoolConfig::default()).unwrap()
    }

    fn url(server: &MockServer, endpoint: &str) -> Url {
        Url::parse(&format!("{}/{}", server.uri(), endpoint)).unwrap()
    }

    #[test]
    fn test_endpoint_url_resolution() {
        let base = Url::parse("http://192.168.1.20:8080").unwrap();
        assert_eq!(
            endpoint_url(&base, Direction::Download).unwrap().as_str(),
            "http://192.168.1.20:8080/download"
        );

        let nested = Url::parse("http://nas.local/lst?x=1").unwrap();
        assert_eq!(
            endpoint_url(&nested, Direction::Upload).unwrap().as_str(),
            "http://nas.local/lst/upload"
        );

        let slash = Url::parse("http://nas.local/lst/").unwrap();
        assert_eq!(
            endpoint_url(&slash, Direction::Upload).unwrap().as_str(),
            "http://nas.local/lst/upload"
        );
    }

    #[tokio::test]
    async fn test_download_counts_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64 * 1024]))
            .mount(&server)
            .await;

        let receipt = transport().download(&url(&server, "download")).await.unwrap();
        assert_eq!(receipt, TransferReceipt { status: 200, bytes: 64 * 1024 });
    }

    #[tokio::test]
    async fn test_download_non_2xx_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let error = transport().download(&url(&server, "download")).await.unwrap_err();
        assert!(matches!(error, AppError::HttpRequest(_)));
        assert!(error.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_upload_reads_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_matcher("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(UploadReceipt { received_bytes: 4096 }))
            .mount(&server)
            .await;

        let receipt = transport()
            .upload(&url(&server, "upload"), Bytes::from(vec![0u8; 4096]))
            .await
            .unwrap();
        assert_eq!(receipt.bytes, 4096);
    }

    #[tokio::test]
    async fn test_upload_short_receipt_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(UploadReceipt { received_bytes: 10 }))
            .mount(&server)
            .await;

        let error = transport()
            .upload(&url(&server, "upload"), Bytes::from(vec![0u8; 4096]))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Transfer(_)));
    }

    #[tokio::test]
    async fn test_upload_rejected_method_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;

        let error = transport()
            .upload(&url(&server, "upload"), Bytes::from_static(b"abc"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("405"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_network_error() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = Url::parse(&format!("http://127.0.0.1:{}/download", port)).unwrap();
        let error = transport().download(&target).await.unwrap_err();
        assert!(matches!(error, AppError::Network(_)));
    }
}
