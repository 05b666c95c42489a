//! HTTP API client with bearer-token authentication.
//!
//! The transport verbs live here; the endpoint methods are grouped by
//! backend router in the submodules.

mod admin;
mod agents;
mod auth;
mod broadcast;
mod certificates;
mod events;
mod group_settings;
mod groups;
mod messages;
mod stats;
mod welcome;
mod whatsapp;

pub use certificates::CertificateFilter;
pub use events::EventFilter;

use std::path::{Path, PathBuf};

use groupwatch_shared::ApiError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;

/// Query string pairs; `None` values are left out.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &'static str, value: impl ToString) -> Self {
        self.0.push((key, value.to_string()));
        self
    }

    pub fn push_opt<T: ToString>(self, key: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.push(key, v),
            None => self,
        }
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Offset pagination shared by the list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// The backend caps page size at 100.
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            ..self
        }
    }

    fn apply(self, query: QueryParams) -> QueryParams {
        query.push("limit", self.limit).push("offset", self.offset)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(50, 0)
    }
}

/// A file to upload in a multipart form.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }

    fn into_part(self) -> reqwest::multipart::Part {
        reqwest::multipart::Part::bytes(self.bytes).file_name(self.file_name)
    }
}

/// A file streamed back by an export endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Write the file into `dir` under its server-provided name.
    pub fn save_in(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// Prefers RFC 5987 `filename*=UTF-8''...`, then `filename="..."` or a bare
/// `filename=...`. Path separators are stripped. Falls back to `default`.
pub fn filename_from_disposition(header: Option<&str>, default: &str) -> String {
    let Some(header) = header else {
        return default.to_string();
    };

    let mut plain = None;
    let mut extended = None;
    for part in disposition_params(header) {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("filename*=") {
            let encoded = rest
                .split_once("''")
                .map(|(_, value)| value)
                .unwrap_or(rest);
            extended = urlencoding::decode(encoded.trim_matches('"'))
                .ok()
                .map(|v| v.into_owned());
        } else if let Some(rest) = part.strip_prefix("filename=") {
            plain = Some(rest.trim_matches('"').to_string());
        }
    }

    extended
        .or(plain)
        .map(|name| name.replace(['/', '\\'], "_"))
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Split on `;` outside double quotes.
fn disposition_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in header.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}

/// HTTP client for the dashboard backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.clone(),
            token: None,
        }
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn authorize(&self, rb: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn send(&self, rb: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = self
            .authorize(rb)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;
        tracing::debug!(status, body = %body, "request rejected");
        Err(ApiError::Http { status, body })
    }

    async fn send_json<TRes: DeserializeOwned>(
        &self,
        rb: RequestBuilder,
    ) -> Result<TRes, ApiError> {
        let resp = self.send(rb).await?;
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if text.is_empty() {
            serde_json::from_str("null").map_err(|e| ApiError::Deserialize(e.to_string()))
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
        }
    }

    /// Make a GET request
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        self.get_json_with(path, &QueryParams::new()).await
    }

    /// Make a GET request with a query string
    pub async fn get_json_with<TRes: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryParams,
    ) -> Result<TRes, ApiError> {
        let rb = self.client.get(self.url(path)).query(query.pairs());
        self.send_json(rb).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let rb = self.client.post(self.url(path)).json(body);
        self.send_json(rb).await
    }

    /// Make a POST request without a body
    pub async fn post_empty<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let rb = self.client.post(self.url(path));
        self.send_json(rb).await
    }

    /// Make a PUT request with JSON body
    pub async fn put_json<TReq: Serialize + ?Sized, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let rb = self.client.put(self.url(path)).json(body);
        self.send_json(rb).await
    }

    /// Make a PUT request without a body
    pub async fn put_empty<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let rb = self.client.put(self.url(path));
        self.send_json(rb).await
    }

    /// Make a DELETE request
    pub async fn delete<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let rb = self.client.delete(self.url(path));
        self.send_json(rb).await
    }

    /// POST a multipart form
    pub async fn post_multipart<TRes: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<TRes, ApiError> {
        let rb = self.client.post(self.url(path)).multipart(form);
        self.send_json(rb).await
    }

    /// GET a file; the name comes from `Content-Disposition`.
    pub async fn download(
        &self,
        path: &str,
        query: &QueryParams,
        default_filename: &str,
    ) -> Result<Download, ApiError> {
        let rb = self.client.get(self.url(path)).query(query.pairs());
        let resp = self.send(rb).await?;

        let disposition = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let filename = filename_from_disposition(disposition.as_deref(), default_filename);

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        Ok(Download {
            filename,
            bytes: bytes.to_vec(),
        })
    }
}
