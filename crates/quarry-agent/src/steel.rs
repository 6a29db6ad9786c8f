//! Steel browser session client
//!
//! Sessions are created, used for page rendering, and released over the
//! Steel REST API. The DevTools endpoint for each session is derived from the
//! configuration so that cloud and self-hosted deployments both work.

use crate::config::{BrowserConfig, STEEL_CLOUD_CONNECT};
use crate::AgentError;
use quarry_domain::traits::SessionProvider;
use quarry_domain::BrowserSession;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "steel-api-key";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Session as returned by `POST /v1/sessions`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    id: String,
    #[serde(default)]
    websocket_url: Option<String>,
    #[serde(default)]
    session_viewer_url: Option<String>,
}

/// Steel REST client implementing [`SessionProvider`]
pub struct SteelClient {
    config: BrowserConfig,
    client: reqwest::Client,
}

impl SteelClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: BrowserConfig) -> Result<Self, AgentError> {
        config.validate().map_err(AgentError::Config)?;

        let timeout = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {}", e)))?;

        if config.is_cloud() {
            info!("Steel API key configured; using Steel cloud");
        } else {
            info!("Using self-hosted Steel at {}", config.api_base());
        }

        Ok(Self { config, client })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .post(format!("{}{}", self.config.api_base(), path));
        match self.config.api_key() {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn create_session(&self) -> Result<BrowserSession, AgentError> {
        let response = self
            .post("/v1/sessions")
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| AgentError::Session(format!("Failed to create session: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Session(format!(
                "Session creation returned HTTP {}: {}",
                status, error_text
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Session(format!("Invalid session response: {}", e)))?;

        let cdp_url = cdp_url(&self.config, &session.id, session.websocket_url.as_deref())?;
        Ok(BrowserSession {
            id: session.id,
            cdp_url,
            viewer_url: session.session_viewer_url,
        })
    }

    async fn scrape(&self, session: &BrowserSession, url: &str) -> Result<String, AgentError> {
        let response = self
            .post("/v1/scrape")
            .json(&json!({
                "url": url,
                "format": ["markdown"],
                "sessionId": session.id,
            }))
            .send()
            .await
            .map_err(|e| AgentError::Navigation(format!("Failed to render {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Navigation(format!(
                "Rendering {} returned HTTP {}: {}",
                url, status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Navigation(format!("Invalid scrape response: {}", e)))?;

        page_text(&body)
            .map(str::to_string)
            .ok_or_else(|| AgentError::Navigation(format!("No page content returned for {}", url)))
    }

    async fn release_session(&self, session: &BrowserSession) -> Result<(), AgentError> {
        let response = self
            .post(&format!("/v1/sessions/{}/release", session.id))
            .send()
            .await
            .map_err(|e| AgentError::Session(format!("Failed to release session: {}", e)))?;

        if !response.status().is_success() {
            return Err(AgentError::Session(format!(
                "Session release returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

impl SessionProvider for SteelClient {
    type Error = AgentError;

    fn open(&self) -> Result<BrowserSession, Self::Error> {
        let session = block_on(self.create_session())??;
        info!(
            "Steel session {} created (viewer: {})",
            session.id,
            session.viewer_url.as_deref().unwrap_or("n/a")
        );
        Ok(session)
    }

    fn fetch(&self, session: &BrowserSession, url: &str) -> Result<String, Self::Error> {
        let page = block_on(self.scrape(session, url))??;
        debug!("Rendered {} in session {}: {} chars", url, session.id, page.len());
        Ok(page)
    }

    fn release(&self, session: &BrowserSession) -> Result<(), Self::Error> {
        block_on(self.release_session(session))??;
        info!("Steel session {} released", session.id);
        Ok(())
    }
}

/// DevTools websocket endpoint for a session
///
/// Cloud sessions (key, no base URL) connect through the Steel connect
/// endpoint. Self-hosted sessions map the base URL's scheme to a websocket
/// scheme. Otherwise the URL reported by the session is used.
pub fn cdp_url(
    config: &BrowserConfig,
    session_id: &str,
    websocket_url: Option<&str>,
) -> Result<String, AgentError> {
    if let (Some(key), None) = (config.api_key(), config.base_url()) {
        return Ok(format!(
            "{}?apiKey={}&sessionId={}",
            STEEL_CLOUD_CONNECT, key, session_id
        ));
    }

    if let Some(base_url) = config.base_url() {
        return Ok(to_websocket_scheme(base_url));
    }

    websocket_url
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AgentError::Session("Unable to determine CDP URL for session".to_string()))
}

/// Map `http://` to `ws://` and `https://` to `wss://`; other URLs are returned as-is
pub fn to_websocket_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else {
        url.to_string()
    }
}

/// Best textual rendering in a scrape response
fn page_text(body: &Value) -> Option<&str> {
    let content = body.get("content")?;
    if let Some(text) = content.as_str() {
        return Some(text);
    }
    ["markdown", "readability", "cleaned_html", "html"]
        .iter()
        .filter_map(|key| content.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.as_str()),
            Value::Object(o) => o.get("textContent").and_then(Value::as_str),
            _ => None,
        })
}

/// Drive a future from synchronous code
///
/// Inside a runtime this must be called from a blocking-pool thread
/// (`spawn_blocking`); outside one a throwaway current-thread runtime is used.
fn block_on<F: Future>(future: F) -> Result<F::Output, AgentError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(future)),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(|runtime| runtime.block_on(future))
            .map_err(|e| AgentError::Session(format!("Failed to start runtime: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>, base_url: Option<&str>) -> BrowserConfig {
        BrowserConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.map(str::to_string),
            timeout_secs: None,
        }
    }

    #[test]
    fn test_cloud_cdp_url() {
        let url = cdp_url(&config(Some("key123"), None), "sess-1", Some("ws://ignored")).unwrap();
        assert_eq!(url, "wss://connect.steel.dev?apiKey=key123&sessionId=sess-1");
    }

    #[test]
    fn test_self_hosted_cdp_url_wins_over_session_url() {
        let url = cdp_url(
            &config(Some("key123"), Some("https://steel.internal:3000")),
            "sess-1",
            Some("ws://session-reported"),
        )
        .unwrap();
        assert_eq!(url, "wss://steel.internal:3000");

        let url = cdp_url(&config(None, Some("http://localhost:3000")), "s", None).unwrap();
        assert_eq!(url, "ws://localhost:3000");
    }

    #[test]
    fn test_session_websocket_url_fallback() {
        let url = cdp_url(&config(None, None), "s", Some("ws://from-session")).unwrap();
        assert_eq!(url, "ws://from-session");

        let err = cdp_url(&config(None, None), "s", None).unwrap_err();
        assert!(matches!(err, AgentError::Session(_)));
    }

    #[test]
    fn test_to_websocket_scheme() {
        assert_eq!(to_websocket_scheme("http://a:1/x"), "ws://a:1/x");
        assert_eq!(to_websocket_scheme("https://a"), "wss://a");
        assert_eq!(to_websocket_scheme("ws://already"), "ws://already");
    }

    #[test]
    fn test_page_text_preference() {
        let body = json!({"content": {"html": "<p>x</p>", "markdown": "# x"}});
        assert_eq!(page_text(&body), Some("# x"));

        let body = json!({"content": {"markdown": "", "html": "<p>x</p>"}});
        assert_eq!(page_text(&body), Some("<p>x</p>"));

        let body = json!({"content": "plain"});
        assert_eq!(page_text(&body), Some("plain"));

        assert_eq!(page_text(&json!({"links": []})), None);
    }

    #[test]
    fn test_new_rejects_unconfigured() {
        assert!(matches!(
            SteelClient::new(BrowserConfig::default()),
            Err(AgentError::Config(_))
        ));
        assert!(SteelClient::new(config(Some("k"), None)).is_ok());
    }

    #[test]
    fn test_unreachable_instance_is_session_error() {
        let client = SteelClient::new(config(None, Some("http://127.0.0.1:1"))).unwrap();
        assert!(matches!(client.open(), Err(AgentError::Session(_))));
    }
}
