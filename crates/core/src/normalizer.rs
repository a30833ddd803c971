//! Response Normalizer
//!
//! Salvages the `{"exercises": [...]}` payload from free-text model output.
//! Extraction is best-effort: the span from the first `{` to the last `}`
//! is taken as the candidate object, so stray braces in the prose around
//! the JSON produce an unparsable span and the fallback exercise is used.
//! A span that parses but carries no `exercises` array yields no exercises.

use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use tracing::warn;

/// Number of characters of raw text kept in a fallback exercise.
pub const FALLBACK_EXCERPT_CHARS: usize = 200;
pub const FALLBACK_QUESTION: &str = "Bài tập mẫu";
pub const FALLBACK_EXPLANATION: &str = "Đây là bài tập được tạo bởi AI";
pub const FALLBACK_TYPE: &str = "fallback";

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON object pattern is valid"));

/// The exercises salvaged from one model response.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedExerciseSet {
    pub exercises: Vec<Value>,
    /// The full response text, kept only when the fallback was used.
    pub raw_response: Option<String>,
}

impl NormalizedExerciseSet {
    pub fn is_fallback(&self) -> bool {
        self.raw_response.is_some()
    }
}

/// Returns the greedy `{...}` span of `text`, if there is one.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

/// Parses the exercises out of `raw`, or degrades to a single fallback
/// exercise when no JSON object can be extracted and parsed. Never fails.
pub fn normalize(raw: &str) -> NormalizedExerciseSet {
    let Some(candidate) = extract_json_object(raw) else {
        warn!("No JSON object found in model response, using fallback exercise");
        return fallback(raw);
    };

    let mut payload = match serde_json::from_str::<Value>(candidate) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Could not parse model response, using fallback exercise");
            return fallback(raw);
        }
    };

    let exercises = match payload.get_mut("exercises").map(Value::take) {
        Some(Value::Array(exercises)) => exercises,
        _ => {
            warn!("Model response has no exercises array");
            Vec::new()
        }
    };

    NormalizedExerciseSet {
        exercises,
        raw_response: None,
    }
}

fn fallback(raw: &str) -> NormalizedExerciseSet {
    let excerpt: String = raw.chars().take(FALLBACK_EXCERPT_CHARS).collect();
    NormalizedExerciseSet {
        exercises: vec![json!({
            "id": 1,
            "question": FALLBACK_QUESTION,
            "content": format!("{excerpt}..."),
            "explanation": FALLBACK_EXPLANATION,
            "type": FALLBACK_TYPE,
        })],
        raw_response: Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_payload_surrounded_by_prose() {
        let raw = r#"Sure! Here you go: {"exercises":[{"id":1}]} Hope this helps."#;
        let set = normalize(raw);

        assert_eq!(set.exercises, vec![json!({"id": 1})]);
        assert!(!set.is_fallback());
    }

    #[test]
    fn test_extracts_payload_from_markdown_fence() {
        let raw = "```json\n{\n  \"exercises\": [\n    {\"id\": 1, \"question\": \"Đếm:\"},\n    {\"id\": 2}\n  ]\n}\n```";
        let set = normalize(raw);

        assert_eq!(set.exercises.len(), 2);
        assert_eq!(set.exercises[0]["question"], "Đếm:");
    }

    #[test]
    fn test_exercises_are_returned_verbatim() {
        let raw = r#"{"exercises":[{"id":"x","weird":[1,{"a":null}],"correctAnswer":3}]}"#;
        let set = normalize(raw);

        assert_eq!(
            set.exercises,
            vec![json!({"id": "x", "weird": [1, {"a": null}], "correctAnswer": 3})]
        );
    }

    #[test]
    fn test_no_braces_produces_fallback() {
        let raw = "Xin lỗi, tôi không thể tạo bài tập lúc này.";
        let set = normalize(raw);

        assert!(set.is_fallback());
        assert_eq!(set.raw_response.as_deref(), Some(raw));
        assert_eq!(set.exercises.len(), 1);

        let fallback = &set.exercises[0];
        assert_eq!(fallback["type"], FALLBACK_TYPE);
        assert_eq!(fallback["id"], 1);
        assert_eq!(fallback["question"], FALLBACK_QUESTION);
        assert_eq!(fallback["explanation"], FALLBACK_EXPLANATION);
        assert_eq!(fallback["content"], format!("{raw}..."));
    }

    #[test]
    fn test_fallback_excerpt_is_limited_to_200_characters() {
        let raw = "á".repeat(500);
        let set = normalize(&raw);

        let content = set.exercises[0]["content"].as_str().unwrap();
        let excerpt = content.strip_suffix("...").unwrap();
        assert_eq!(excerpt.chars().count(), FALLBACK_EXCERPT_CHARS);
        assert!(raw.starts_with(excerpt));
    }

    #[test]
    fn test_invalid_json_produces_fallback() {
        let set = normalize(r#"{"exercises": [ {"id": 1,, } ]}"#);
        assert!(set.is_fallback());
        assert_eq!(set.exercises[0]["type"], FALLBACK_TYPE);
    }

    #[test]
    fn test_stray_braces_around_payload_degrade_to_fallback() {
        let raw = r#"Use {curly} braces: {"exercises":[{"id":1}]} and {more}"#;
        assert_eq!(
            extract_json_object(raw),
            Some(r#"{curly} braces: {"exercises":[{"id":1}]} and {more}"#)
        );
        assert!(normalize(raw).is_fallback());
    }

    #[test]
    fn test_object_without_exercises_yields_nothing() {
        let set = normalize(r#"{"result": "ok"}"#);
        assert!(set.exercises.is_empty());
        assert!(!set.is_fallback());

        let set = normalize(r#"{"exercises": "none today"}"#);
        assert!(set.exercises.is_empty());
        assert!(!set.is_fallback());
    }


    #[test]
    fn test_empty_exercise_list_is_not_a_fallback() {
        let set = normalize(r#"{"exercises": []}"#);
        assert!(set.exercises.is_empty());
        assert!(!set.is_fallback());
    }
}
