//! Client configuration from environment variables.

use std::time::Duration;

use groupwatch_shared::is_local_address;

use crate::ws::ReconnectConfig;

/// Port the backend listens on during local development.
pub const LOCAL_API_PORT: u16 = 8000;

/// Endpoints and tuning knobs for a dashboard client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base, e.g. `https://groups.example.com` (no trailing slash).
    pub api_base_url: String,
    /// WebSocket base, e.g. `wss://groups.example.com` (no trailing slash).
    pub ws_base_url: String,
    /// How long a cached query stays fresh without an invalidation.
    pub cache_stale_after: Duration,
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    /// Resolve endpoints from the host the dashboard is served from.
    ///
    /// Local hosts talk plain HTTP to the development port; anything else is
    /// assumed to sit behind TLS on the default port.
    pub fn for_host(host: &str) -> Self {
        let host = host
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/');

        let api_base_url = if host.is_empty() {
            format!("http://localhost:{LOCAL_API_PORT}")
        } else if is_local_address(host) {
            let host_only = host.split(':').next().unwrap_or(host);
            format!("http://{host_only}:{LOCAL_API_PORT}")
        } else {
            format!("https://{host}")
        };

        Self::with_api_base(api_base_url)
    }

    /// Use an explicit REST base; the WebSocket base is derived from it.
    pub fn with_api_base(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        let ws_base_url = http_to_ws(&api_base_url);
        Self {
            api_base_url,
            ws_base_url,
            cache_stale_after: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GROUPWATCH_HOST`: dashboard host name (default: "localhost")
    /// - `GROUPWATCH_API_URL`: explicit REST base, overrides the host rule
    /// - `GROUPWATCH_WS_URL`: explicit WebSocket base (default: derived from the REST base)
    /// - `GROUPWATCH_CACHE_STALE_SECS`: query freshness window (default: 30)
    pub fn from_env() -> Self {
        let mut config = match std::env::var("GROUPWATCH_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_api_base(url.trim()),
            _ => {
                let host =
                    std::env::var("GROUPWATCH_HOST").unwrap_or_else(|_| "localhost".to_string());
                Self::for_host(&host)
            }
        };

        if let Ok(ws) = std::env::var("GROUPWATCH_WS_URL") {
            if !ws.trim().is_empty() {
                config.ws_base_url = ws.trim().trim_end_matches('/').to_string();
            }
        }

        if let Some(secs) = std::env::var("GROUPWATCH_CACHE_STALE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.cache_stale_after = Duration::from_secs(secs);
        }

        config
    }

    /// Construct an API URL for a path.
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    /// Realtime endpoint for a session token.
    pub fn realtime_url(&self, token: &str) -> String {
        format!("{}/ws?token={}", self.ws_base_url, urlencoding::encode(token))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_host("localhost")
    }
}

/// Convert HTTP/HTTPS URL to WS/WSS
fn http_to_ws(url: &str) -> String {
    if url.starts_with("https://") {
        url.replacen("https://", "wss://", 1)
    } else if url.starts_with("http://") {
        url.replacen("http://", "ws://", 1)
    } else {
        url.to_string()
    }
}
