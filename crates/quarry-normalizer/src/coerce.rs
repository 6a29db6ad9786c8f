//! Field coercion for recovered objects
//!
//! Agent output is loosely typed: ranks arrive as numbers, counts as floats or
//! strings, and any field may be `null`. Coercion rewrites a recovered object
//! in place so that it deserializes into [`ExtractionResult`] whenever its
//! overall shape is right.
//!
//! [`ExtractionResult`]: quarry_domain::ExtractionResult

use serde_json::{Map, Value};

const STRING_POST_FIELDS: [&str; 5] = ["rank", "url", "title", "subreddit", "domain"];
const INT_POST_FIELDS: [&str; 3] = ["upvotes", "comments", "score"];
const LIST_FIELDS: [&str; 4] = ["sources", "sections", "relatedPosts", "relatedTopics"];
const STRING_LIST_FIELDS: [&str; 2] = ["sources", "relatedTopics"];

/// Coerce a recovered object into the extraction record's field types
///
/// Missing or null `url` becomes `default_url` and missing or null
/// `question` becomes `question`. Null top-level lists are removed so they
/// take their empty default. Unusable entries inside lists are dropped
/// rather than failing the whole record.
pub fn normalize_fields(object: &mut Map<String, Value>, default_url: &str, question: &str) {
    fill_string(object, "url", default_url);
    fill_string(object, "question", question);

    for key in LIST_FIELDS {
        if object.get(key).is_some_and(Value::is_null) {
            object.remove(key);
        }
    }

    for key in STRING_LIST_FIELDS {
        if let Some(Value::Array(items)) = object.get_mut(key) {
            coerce_string_list(items);
        }
    }

    if let Some(Value::Array(sections)) = object.get_mut("sections") {
        sections.retain(Value::is_object);
        for section in sections.iter_mut().filter_map(Value::as_object_mut) {
            coerce_section(section);
        }
    }

    if let Some(Value::Array(posts)) = object.get_mut("relatedPosts") {
        posts.retain(Value::is_object);
        for post in posts.iter_mut().filter_map(Value::as_object_mut) {
            coerce_post(post);
        }
    }
}

fn fill_string(object: &mut Map<String, Value>, key: &str, default: &str) {
    match object.get(key) {
        None | Some(Value::Null) => {
            object.insert(key.to_string(), Value::String(default.to_string()));
        }
        _ => {}
    }
}

/// String view of a scalar; `None` for null, arrays and objects
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_string_list(items: &mut Vec<Value>) {
    *items = items
        .iter()
        .filter_map(as_text)
        .map(Value::String)
        .collect();
}

fn coerce_section(section: &mut Map<String, Value>) {
    let heading = section.get("heading").and_then(as_text).unwrap_or_default();
    section.insert("heading".to_string(), Value::String(heading));

    let content = match section.remove("content") {
        Some(Value::Array(mut items)) => {
            coerce_string_list(&mut items);
            items
        }
        Some(Value::String(s)) => vec![Value::String(s)],
        _ => Vec::new(),
    };
    section.insert("content".to_string(), Value::Array(content));
}

fn coerce_post(post: &mut Map<String, Value>) {
    for key in STRING_POST_FIELDS {
        let coerced = match post.get(key) {
            None | Some(Value::Null) => Value::String(String::new()),
            Some(Value::Number(n)) => Value::String(n.to_string()),
            Some(Value::Bool(b)) => Value::String(b.to_string()),
            Some(Value::String(_)) => continue,
            // Arrays and objects have no sensible string form.
            Some(_) => Value::String(String::new()),
        };
        post.insert(key.to_string(), coerced);
    }

    for key in INT_POST_FIELDS {
        let count = post.get(key).map(as_count).unwrap_or(0);
        post.insert(key.to_string(), Value::from(count));
    }

    let promoted = match post.get("promoted") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    post.insert("promoted".to_string(), Value::Bool(promoted));
}

/// Integer view of a loosely typed count; anything unreadable is 0
fn as_count(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coerced(value: Value) -> Value {
        let mut object = value.as_object().cloned().unwrap();
        normalize_fields(&mut object, "https://default", "asked?");
        Value::Object(object)
    }

    #[test]
    fn test_url_and_question_defaults() {
        let value = coerced(json!({"url": null}));
        assert_eq!(value["url"], json!("https://default"));
        assert_eq!(value["question"], json!("asked?"));
    }

    #[test]
    fn test_existing_url_and_question_kept() {
        let value = coerced(json!({"url": "https://x", "question": "theirs"}));
        assert_eq!(value["url"], json!("https://x"));
        assert_eq!(value["question"], json!("theirs"));
    }

    #[test]
    fn test_null_lists_removed() {
        let value = coerced(json!({"sources": null, "relatedPosts": null, "sections": []}));
        assert!(value.get("sources").is_none());
        assert!(value.get("relatedPosts").is_none());
        assert_eq!(value["sections"], json!([]));
    }

    #[test]
    fn test_post_coercion() {
        let value = coerced(json!({
            "relatedPosts": [{
                "rank": 3,
                "title": "Title",
                "subreddit": null,
                "upvotes": 12.9,
                "comments": "41",
                "score": "lots",
                "promoted": null
            }]
        }));

        let post = &value["relatedPosts"][0];
        assert_eq!(post["rank"], json!("3"));
        assert_eq!(post["title"], json!("Title"));
        assert_eq!(post["subreddit"], json!(""));
        assert_eq!(post["url"], json!(""));
        assert_eq!(post["domain"], json!(""));
        assert_eq!(post["upvotes"], json!(12));
        assert_eq!(post["comments"], json!(41));
        assert_eq!(post["score"], json!(0));
        assert_eq!(post["promoted"], json!(false));
    }

    #[test]
    fn test_section_coercion() {
        let value = coerced(json!({"sections": [{"heading": null}, {"content": ["a"]}]}));
        assert_eq!(value["sections"][0], json!({"heading": "", "content": []}));
        assert_eq!(value["sections"][1], json!({"heading": "", "content": ["a"]}));
    }

    #[test]
    fn test_string_lists_drop_nulls() {
        let value = coerced(json!({
            "sources": ["a", null, 3, {"nested": true}],
            "relatedTopics": [false, null]
        }));
        assert_eq!(value["sources"], json!(["a", "3"]));
        assert_eq!(value["relatedTopics"], json!(["false"]));
    }

    #[test]
    fn test_non_object_entries_dropped() {
        let value = coerced(json!({
            "sections": [null, {"heading": 2, "content": ["x", null]}],
            "relatedPosts": ["nope", {"title": "kept"}]
        }));
        assert_eq!(value["sections"], json!([{"heading": "2", "content": ["x"]}]));
        assert_eq!(value["relatedPosts"].as_array().unwrap().len(), 1);
        assert_eq!(value["relatedPosts"][0]["title"], json!("kept"));
    }

    #[test]
    fn test_as_count() {
        assert_eq!(as_count(&json!(7)), 7);
        assert_eq!(as_count(&json!(-2.7)), -2);
        assert_eq!(as_count(&json!(" 15 ")), 15);
        assert_eq!(as_count(&json!("3.5")), 3);
        assert_eq!(as_count(&json!("1.2k")), 0);
        assert_eq!(as_count(&json!(true)), 0);
    }
}
