//! LLM prompt engineering for answer-page extraction

/// JSON shape the model is asked to return
pub const OUTPUT_SCHEMA: &str = r#"You extract structured data from a rendered Reddit Answers page.
Respond with a single JSON object and nothing else, using this structure:
{
  "url": "full URL of the answers page",
  "question": "the question as displayed",
  "sources": ["source subreddit URLs"],
  "sections": [
    {"heading": "Section name", "content": ["paragraph 1", "paragraph 2"]}
  ],
  "relatedPosts": [
    {
      "rank": "1",
      "title": "Post title",
      "subreddit": "subreddit name",
      "url": "post URL",
      "upvotes": 123,
      "comments": 45,
      "domain": "domain",
      "promoted": false,
      "score": 123
    }
  ],
  "relatedTopics": ["related question 1", "related question 2"]
}"#;

const EXTRACTION_INSTRUCTIONS: &str = "Extract the following from the page below:
1. The full URL of the Reddit Answers page
2. The exact question as displayed
3. All source subreddit URLs mentioned
4. All answer sections with their headings and content (as separate paragraphs)
5. Related posts with rank, title, subreddit, URL, upvotes, comments, domain, promoted status, and score
6. Related topics/questions suggested";

/// Builds the extraction prompt for one rendered page
pub struct PromptBuilder<'a> {
    question: &'a str,
    url: &'a str,
    page: &'a str,
    max_page_chars: usize,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(question: &'a str, url: &'a str, page: &'a str) -> Self {
        Self {
            question,
            url,
            page,
            max_page_chars: usize::MAX,
        }
    }

    /// Limit how much of the page is included
    pub fn with_max_page_chars(mut self, max_page_chars: usize) -> Self {
        self.max_page_chars = max_page_chars;
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let (page, truncated) = truncate_chars(self.page, self.max_page_chars);

        let mut prompt = String::with_capacity(page.len() + 1024);
        prompt.push_str(&format!("Question: \"{}\"\n", self.question));
        prompt.push_str(&format!("Page URL: {}\n\n", self.url));
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\nPage content:\n---\n");
        prompt.push_str(page);
        if truncated {
            prompt.push_str("\n[page truncated]");
        }
        prompt.push_str("\n---\n\nReturn only the JSON object.");
        prompt
    }
}

/// Prefix of at most `max_chars` characters, and whether anything was cut
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}
