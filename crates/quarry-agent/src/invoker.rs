//! One browser + LLM round trip per question

use crate::config::AgentConfig;
use crate::prompt::{PromptBuilder, OUTPUT_SCHEMA};
use crate::AgentError;
use quarry_domain::traits::{ExtractionInvoker, LlmProvider, SessionProvider};
use quarry_domain::{AgentHistory, AgentOutput, AgentStep, BrowserSession, FinalResult};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Extraction invoker backed by a remote browser session and an LLM
///
/// Each call opens its own session, renders the answers page for the
/// question, and asks the model to turn the page into a JSON record. The
/// session is released on every exit path.
pub struct AgentInvoker<S, L> {
    sessions: S,
    llm: L,
    config: AgentConfig,
}

impl<S, L> AgentInvoker<S, L>
where
    S: SessionProvider,
    S::Error: Display,
    L: LlmProvider,
    L::Error: Display,
{
    /// Create a new invoker
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` if the configuration is invalid
    pub fn new(sessions: S, llm: L, config: AgentConfig) -> Result<Self, AgentError> {
        config.validate().map_err(AgentError::Config)?;
        Ok(Self {
            sessions,
            llm,
            config,
        })
    }

    /// Get the invoker configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Answers-page URL for a question
    pub fn target_url(&self, question: &str) -> Result<String, AgentError> {
        reqwest::Url::parse_with_params(
            &self.config.start_url,
            &[(self.config.query_param.as_str(), question)],
        )
        .map(String::from)
        .map_err(|e| AgentError::Config(format!("Invalid start_url: {}", e)))
    }

    fn run(&self, session: &BrowserSession, question: &str) -> Result<AgentOutput, AgentError> {
        let mut steps = Vec::with_capacity(2);

        let url = self.target_url(question)?;
        let page = self
            .sessions
            .fetch(session, &url)
            .map_err(|e| AgentError::Navigation(e.to_string()))?;
        debug!("Rendered {} ({} chars)", url, page.len());
        steps.push(AgentStep::with_result(
            "navigate",
            format!("Rendered {} ({} chars)", url, page.len()),
        ));

        let prompt = PromptBuilder::new(question, &url, &page)
            .with_max_page_chars(self.config.max_page_chars)
            .build();
        debug!("Extraction prompt: {} chars", prompt.len());

        let answer = self
            .llm
            .generate_structured(&prompt, OUTPUT_SCHEMA)
            .map_err(|e| AgentError::Llm(e.to_string()))?;
        debug!("LLM answer: {} chars", answer.len());
        steps.push(AgentStep::with_result("extract", answer.clone()));

        Ok(AgentOutput::WithHistory(AgentHistory {
            final_result: Some(FinalResult::Text(answer)),
            steps,
        }))
    }
}

impl<S, L> ExtractionInvoker for AgentInvoker<S, L>
where
    S: SessionProvider,
    S::Error: Display,
    L: LlmProvider,
    L::Error: Display,
{
    type Error = AgentError;

    fn invoke(&self, question: &str) -> Result<AgentOutput, Self::Error> {
        info!("Starting agent run for question: {}", question);

        let session = self
            .sessions
            .open()
            .map_err(|e| AgentError::Session(e.to_string()))?;
        let guard = SessionGuard {
            sessions: &self.sessions,
            session,
        };

        let output = self.run(&guard.session, question)?;
        info!("Agent run finished for question: {}", question);
        Ok(output)
    }
}

/// Releases a session when dropped
struct SessionGuard<'a, S>
where
    S: SessionProvider,
    S::Error: Display,
{
    sessions: &'a S,
    session: BrowserSession,
}

impl<S> Drop for SessionGuard<'_, S>
where
    S: SessionProvider,
    S::Error: Display,
{
    fn drop(&mut self) {
        if let Err(e) = self.sessions.release(&self.session) {
            warn!("Failed to release browser session {}: {}", self.session.id, e);
        }
    }
}
