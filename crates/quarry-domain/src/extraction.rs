//! Structured extraction record

use serde::{Deserialize, Serialize};

/// Source URL used when the agent output carries none
pub const DEFAULT_SOURCE_URL: &str = "https://www.reddit.com/answers/";

/// Structured output of one extraction
///
/// Every field has a defined default, so a value of this type is always
/// fully well-formed no matter how noisy the upstream agent output was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Page the answer was extracted from
    pub url: String,

    /// The question that was asked
    pub question: String,

    /// Source community URLs cited by the answer
    #[serde(default)]
    pub sources: Vec<String>,

    /// Answer sections, in page order
    #[serde(default)]
    pub sections: Vec<ContentSection>,

    /// Related posts, in page order
    #[serde(default)]
    pub related_posts: Vec<RelatedPost>,

    /// Suggested follow-up questions
    #[serde(default)]
    pub related_topics: Vec<String>,
}

impl ExtractionResult {
    /// An empty record for the given source URL and question
    pub fn empty(url: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            question: question.into(),
            sources: Vec::new(),
            sections: Vec::new(),
            related_posts: Vec::new(),
            related_topics: Vec::new(),
        }
    }

    /// Whether nothing beyond url and question was extracted
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
            && self.sections.is_empty()
            && self.related_posts.is_empty()
            && self.related_topics.is_empty()
    }
}

/// A headed group of answer paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSection {
    /// Section heading
    #[serde(default)]
    pub heading: String,

    /// Paragraphs, in order
    #[serde(default)]
    pub content: Vec<String>,
}

/// One ranked post related to the answer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedPost {
    /// Rank as displayed (numeric ranks are stored as strings)
    pub rank: String,

    /// Post title
    pub title: String,

    /// Community label (subreddit)
    pub subreddit: String,

    /// Post URL
    pub url: String,

    /// Upvote count
    pub upvotes: i64,

    /// Comment count
    pub comments: i64,

    /// Link domain
    pub domain: String,

    /// Whether the post is promoted
    pub promoted: bool,

    /// Post score
    pub score: i64,
}
