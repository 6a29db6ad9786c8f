//! Recover a JSON object from a noisy text blob

use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)```\s*json\s*(\{[\s\S]*?\})\s*```").expect("valid json fence pattern")
});

static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[\w\-]*\s*(\{[\s\S]*?\})\s*```").expect("valid fence pattern")
});

static ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Attachment\s*:\s*(/[^\s]+\.json)").expect("valid attachment pattern")
});

/// Which recovery step produced the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// A code block tagged `json`
    JsonFence,
    /// Any code block holding an object
    AnyFence,
    /// The first balanced `{...}` that parses
    BraceScan,
    /// A referenced `.json` file on disk
    Attachment,
}

/// JSON-object recovery over arbitrary text
///
/// Steps are tried in order and the first one that yields an object wins.
/// Finding nothing is not an error; callers move on to their next source.
#[derive(Debug, Clone, Copy)]
pub struct JsonRecovery {
    follow_attachments: bool,
}

impl Default for JsonRecovery {
    fn default() -> Self {
        Self::new(true)
    }
}

impl JsonRecovery {
    /// Create a recovery pass; `follow_attachments` enables the file step
    pub fn new(follow_attachments: bool) -> Self {
        Self { follow_attachments }
    }

    /// Recover the first JSON object from `text`
    pub fn recover(&self, text: &str) -> Option<Map<String, Value>> {
        self.recover_with_strategy(text).map(|(_, object)| object)
    }

    /// Recover the first JSON object and report which step found it
    pub fn recover_with_strategy(
        &self,
        text: &str,
    ) -> Option<(RecoveryStrategy, Map<String, Value>)> {
        if text.is_empty() {
            return None;
        }

        let found = fenced(&JSON_FENCE, text)
            .map(|o| (RecoveryStrategy::JsonFence, o))
            .or_else(|| fenced(&ANY_FENCE, text).map(|o| (RecoveryStrategy::AnyFence, o)))
            .or_else(|| brace_scan(text).map(|o| (RecoveryStrategy::BraceScan, o)))
            .or_else(|| {
                if self.follow_attachments {
                    attachment(text).map(|o| (RecoveryStrategy::Attachment, o))
                } else {
                    None
                }
            });

        if let Some((strategy, object)) = &found {
            debug!(
                "Recovered JSON object via {:?} ({} top-level keys)",
                strategy,
                object.len()
            );
        }
        found
    }
}

/// Balanced `{...}` substring starting at byte offset `start`
///
/// Braces inside string literals (including escaped quotes) do not count
/// toward nesting. Returns `None` when `start` is not an opening brace or
/// the text ends before the depth returns to zero.
pub fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Only ASCII bytes are inspected, so every cut lands on a char boundary.
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn fenced(pattern: &Regex, text: &str) -> Option<Map<String, Value>> {
    let captures = pattern.captures(text)?;
    parse_object(captures.get(1)?.as_str())
}

fn brace_scan(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{')
        .filter_map(|(start, _)| balanced_object_at(text, start))
        .find_map(parse_object)
}

fn attachment(text: &str) -> Option<Map<String, Value>> {
    let captures = ATTACHMENT.captures(text)?;
    let path = Path::new(captures.get(1)?.as_str());
    if !path.exists() {
        debug!("Referenced attachment {} does not exist", path.display());
        return None;
    }

    let contents = std::fs::read_to_string(path).ok()?;
    parse_object(&contents)
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}
