//! Raw agent output shapes
//!
//! An agent run has no format guarantee. It may hand back a JSON object,
//! free text with JSON somewhere inside, or a recorded history of steps
//! with an optional final answer. The normalizer matches on these variants
//! instead of probing for accessors.

use serde_json::{Map, Value};

/// Raw output of one agent invocation
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// The agent already produced a JSON object
    Structured(Map<String, Value>),
    /// Free text that may embed JSON
    Text(String),
    /// A recorded run: final answer plus the steps that led to it
    WithHistory(AgentHistory),
}

/// Final answer of a recorded agent run
#[derive(Debug, Clone, PartialEq)]
pub enum FinalResult {
    /// A JSON object
    Structured(Map<String, Value>),
    /// Free text
    Text(String),
}

/// Recorded agent run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentHistory {
    /// Final answer, if the agent reached one
    pub final_result: Option<FinalResult>,
    /// Steps, oldest first
    pub steps: Vec<AgentStep>,
}

/// One recorded agent step
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentStep {
    /// Action label (e.g. "navigate", "extract")
    pub action: String,
    /// Textual result of the step
    pub result: Option<String>,
    /// Message content produced during the step
    pub content: Option<String>,
}

impl AgentStep {
    /// A step with a textual result
    pub fn with_result(action: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            result: Some(result.into()),
            content: None,
        }
    }

    /// The text worth scanning: the non-empty result, else the non-empty content
    pub fn text(&self) -> Option<&str> {
        self.result
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.content.as_deref().filter(|s| !s.is_empty()))
    }
}

impl AgentOutput {
    /// The direct final answer, if this shape exposes one
    pub fn final_result(&self) -> Option<FinalResult> {
        match self {
            AgentOutput::Structured(map) => Some(FinalResult::Structured(map.clone())),
            AgentOutput::WithHistory(history) => history.final_result.clone(),
            AgentOutput::Text(_) => None,
        }
    }

    /// Recorded steps, if this shape carries a history
    pub fn history(&self) -> Option<&[AgentStep]> {
        match self {
            AgentOutput::WithHistory(history) => Some(&history.steps),
            _ => None,
        }
    }
}

impl From<String> for AgentOutput {
    fn from(text: String) -> Self {
        AgentOutput::Text(text)
    }
}

impl From<&str> for AgentOutput {
    fn from(text: &str) -> Self {
        AgentOutput::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_text_prefers_result() {
        let step = AgentStep {
            action: "extract".to_string(),
            result: Some("result text".to_string()),
            content: Some("content text".to_string()),
        };
        assert_eq!(step.text(), Some("result text"));
    }

    #[test]
    fn test_step_text_falls_back_to_content() {
        let step = AgentStep {
            action: "extract".to_string(),
            result: Some(String::new()),
            content: Some("content text".to_string()),
        };
        assert_eq!(step.text(), Some("content text"));
        assert_eq!(AgentStep::default().text(), None);
    }

    #[test]
    fn test_final_result_per_shape() {
        let map = json!({"url": "u"}).as_object().unwrap().clone();
        let structured = AgentOutput::Structured(map.clone());
        assert_eq!(structured.final_result(), Some(FinalResult::Structured(map)));
        assert!(structured.history().is_none());

        let text = AgentOutput::from("plain");
        assert!(text.final_result().is_none());

        let history = AgentOutput::WithHistory(AgentHistory {
            final_result: Some(FinalResult::Text("done".to_string())),
            steps: vec![AgentStep::with_result("navigate", "ok")],
        });
        assert_eq!(
            history.final_result(),
            Some(FinalResult::Text("done".to_string()))
        );
        assert_eq!(history.history().map(|s| s.len()), Some(1));
    }
}
