//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the task bookkeeping and the
//! services that do the actual browsing and reasoning. Implementations live
//! in other crates.

use crate::AgentOutput;
use std::fmt;

/// Performs one browser-automation + agent-reasoning round trip
///
/// Implemented by the infrastructure layer (quarry-agent). Calls are
/// blocking; the task manager runs them on a dedicated blocking pool.
pub trait ExtractionInvoker {
    /// Error type for invocation failures
    type Error;

    /// Run the agent for one question and return its raw output
    fn invoke(&self, question: &str) -> Result<AgentOutput, Self::Error>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (quarry-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured (JSON object) output, if supported
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;
}

/// A remote browser session
///
/// `cdp_url` may carry the provider's API key as a query parameter, so the
/// `Debug` output redacts it.
#[derive(Clone, PartialEq, Eq)]
pub struct BrowserSession {
    /// Provider-assigned session id
    pub id: String,
    /// DevTools websocket endpoint for the session
    pub cdp_url: String,
    /// Live viewer URL, if the provider offers one
    pub viewer_url: Option<String>,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession")
            .field("id", &self.id)
            .field("cdp_url", &redact_api_key(&self.cdp_url))
            .field("viewer_url", &self.viewer_url)
            .finish()
    }
}

/// Replace the value of any `apiKey` query parameter
fn redact_api_key(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let query: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("apikey") => format!("{}=<redacted>", key),
            _ => pair.to_string(),
        })
        .collect();
    format!("{}?{}", base, query.join("&"))
}

/// Trait for remote browser session lifecycle
///
/// Implemented by the infrastructure layer (quarry-agent)
pub trait SessionProvider {
    /// Error type for session operations
    type Error;

    /// Open a fresh session
    fn open(&self) -> Result<BrowserSession, Self::Error>;

    /// Render a page inside the session and return its textual content
    fn fetch(&self, session: &BrowserSession, url: &str) -> Result<String, Self::Error>;

    /// Release the session; must be called exactly once per opened session
    fn release(&self, session: &BrowserSession) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_debug_hides_api_key() {
        let session = BrowserSession {
            id: "sess-1".to_string(),
            cdp_url: "wss://connect.steel.dev?apiKey=secret123&sessionId=sess-1".to_string(),
            viewer_url: None,
        };

        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret123"));
        assert!(debug.contains("apiKey=<redacted>&sessionId=sess-1"));
    }

    #[test]
    fn test_redact_leaves_plain_urls() {
        assert_eq!(redact_api_key("ws://localhost:3000"), "ws://localhost:3000");
        assert_eq!(
            redact_api_key("ws://h/?sessionId=s"),
            "ws://h/?sessionId=s"
        );
    }
}
