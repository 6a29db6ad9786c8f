//! Turn raw agent output into an extraction record

use crate::coerce::normalize_fields;
use crate::config::NormalizerConfig;
use crate::recovery::JsonRecovery;
use quarry_domain::{AgentOutput, AgentStep, ExtractionResult, FinalResult};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Keys that mark a recovered history object as an extraction record
const RECORD_KEYS: [&str; 3] = ["url", "question", "sections"];

/// Best-effort normalizer for agent output
///
/// Never fails: when nothing usable is found the result is an empty record
/// carrying the configured default URL and the asked question.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    recovery: JsonRecovery,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

impl Normalizer {
    /// Create a normalizer
    pub fn new(config: NormalizerConfig) -> Self {
        let recovery = JsonRecovery::new(config.follow_attachments);
        Self { config, recovery }
    }

    /// Get the normalizer configuration
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one agent output for `question`
    pub fn normalize(&self, output: &AgentOutput, question: &str) -> ExtractionResult {
        let mut object = output
            .final_result()
            .and_then(|final_result| self.from_final_result(final_result));

        if object.as_ref().is_none_or(lacks_sections) {
            if let Some(steps) = output.history() {
                if let Some(found) = self.from_history(steps) {
                    object = Some(found);
                }
            }
        }

        if object.is_none() {
            if let AgentOutput::Text(text) = output {
                object = self.recovery.recover(text);
            }
        }

        match object {
            Some(object) => self.build(object, question),
            None => {
                warn!(
                    "No structured data recovered for question '{}'; returning empty result",
                    question
                );
                self.empty(question)
            }
        }
    }

    fn from_final_result(&self, final_result: FinalResult) -> Option<Map<String, Value>> {
        match final_result {
            FinalResult::Structured(map) => Some(map),
            FinalResult::Text(text) => self.recovery.recover(&text),
        }
    }

    fn from_history(&self, steps: &[AgentStep]) -> Option<Map<String, Value>> {
        steps.iter().rev().find_map(|step| {
            let object = self.recovery.recover(step.text()?)?;
            if RECORD_KEYS.iter().any(|key| object.contains_key(*key)) {
                debug!("Recovered extraction record from '{}' step", step.action);
                Some(object)
            } else {
                None
            }
        })
    }

    fn build(&self, mut object: Map<String, Value>, question: &str) -> ExtractionResult {
        normalize_fields(&mut object, &self.config.default_url, question);

        match serde_json::from_value::<ExtractionResult>(Value::Object(object)) {
            Ok(result) => {
                debug!(
                    "Normalized result: {} sections, {} related posts, {} sources",
                    result.sections.len(),
                    result.related_posts.len(),
                    result.sources.len()
                );
                result
            }
            Err(e) => {
                warn!("Recovered object has an unusable shape: {}", e);
                self.empty(question)
            }
        }
    }

    fn empty(&self, question: &str) -> ExtractionResult {
        ExtractionResult::empty(self.config.default_url.clone(), question)
    }
}

fn lacks_sections(object: &Map<String, Value>) -> bool {
    match object.get("sections") {
        None | Some(Value::Null) => true,
        Some(Value::Array(sections)) => sections.is_empty(),
        Some(_) => false,
    }
}
