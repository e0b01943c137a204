//! HTTP transport seam.
//!
//! The uploader talks to the server only through [`Transport`], so tests and
//! hosts can substitute their own implementation. [`HttpTransport`] is the
//! reqwest-backed default.

use std::time::Duration;

use async_trait::async_trait;
use attach_core::UploadFile;
use bytes::Bytes;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra request headers as `(name, value)` pairs.
pub type Headers = [(String, String)];

/// A binary body downloaded from the server.
#[derive(Debug, Clone)]
pub struct RemoteBlob {
    /// `Content-Type` reported by the server, if any.
    pub content_type: Option<String>,
    /// Body bytes.
    pub data: Bytes,
}

/// Authenticated request transport.
///
/// `path` is always relative to the server base URL and starts with `/`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `file` as a multipart form under `field`, returning the parsed
    /// JSON body.
    async fn post_multipart(
        &self,
        path: &str,
        field: &str,
        file: &UploadFile,
        headers: &Headers,
    ) -> Result<Value, Error>;

    /// GET a JSON document.
    async fn get_json(&self, path: &str, headers: &Headers) -> Result<Value, Error>;

    /// GET a binary body.
    async fn get_bytes(&self, path: &str, headers: &Headers) -> Result<RemoteBlob, Error>;
}

/// Error body shape used by the server: `{"message": "...", "error": "..."}`.
#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: Option<String>,
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

/// Builder for configuring an [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    base_url: String,
    timeout: Duration,
    client: Option<Client>,
}

impl HttpTransportBuilder {
    /// Create a new builder with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom reqwest Client.
    ///
    /// Useful for configuring TLS, proxies, or other advanced settings.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport, Error> {
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Configuration(e.to_string()))?,
        };

        Ok(HttpTransport {
            client,
            base_url: self.base_url,
        })
    }
}

impl HttpTransport {
    /// Create a new transport with default configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpTransportBuilder::new(base_url)
            .build()
            .expect("default client configuration should not fail")
    }

    /// Create a builder for advanced configuration.
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(base_url)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_headers(req: reqwest::RequestBuilder, headers: &Headers) -> reqwest::RequestBuilder {
        headers
            .iter()
            .fold(req, |req, (name, value)| req.header(name.as_str(), value.as_str()))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = req.send().await.map_err(|e| {
            if e.is_builder() {
                Error::Configuration(e.to_string())
            } else {
                Error::Connection(e.to_string())
            }
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Turn a non-2xx response into [`Error::Http`], preferring the server's
/// `message` field over the raw body.
async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServerMessage>(&body)
        .ok()
        .and_then(|m| m.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });
    Error::Http {
        status: status.as_u16(),
        message,
    }
}

fn file_part(file: &UploadFile) -> Part {
    let part = Part::bytes(file.data.to_vec()).file_name(file.filename.clone());
    match part.mime_str(&file.mime_type) {
        Ok(part) => part,
        Err(_) => Part::bytes(file.data.to_vec()).file_name(file.filename.clone()),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_multipart(
        &self,
        path: &str,
        field: &str,
        file: &UploadFile,
        headers: &Headers,
    ) -> Result<Value, Error> {
        let form = Form::new().part(field.to_owned(), file_part(file));
        let req = Self::with_headers(self.client.post(self.url(path)), headers).multipart(form);

        debug!(path, size = file.len(), "posting multipart upload");
        let response = self.send(req).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    async fn get_json(&self, path: &str, headers: &Headers) -> Result<Value, Error> {
        let req = Self::with_headers(self.client.get(self.url(path)), headers);
        let response = self.send(req).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    async fn get_bytes(&self, path: &str, headers: &Headers) -> Result<RemoteBlob, Error> {
        let req = Self::with_headers(self.client.get(self.url(path)), headers);
        let response = self.send(req).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let data = response
            .bytes()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(RemoteBlob { content_type, data })
    }
}
