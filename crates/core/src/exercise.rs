//! Exercise records as returned to clients.
//!
//! Each exercise type has its own payload shape. The model is free to add
//! or omit fields, so every payload is lenient: known fields are optional
//! and anything unrecognized is kept in `extra`. Serializing a payload
//! gives back exactly the object the model sent.

use crate::catalog::{ExerciseKind, ExerciseTypeDefinition};
use serde::{Deserialize, Deserializer, Serialize, de, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Keys owned by the tagging step; they are stripped from model output so
/// the tag always reflects the type that produced the exercise.
const TAG_KEYS: [&str; 3] = ["type", "typeName", "typeIcon"];

/// A payload that keeps every field it does not model in `extra`.
trait Lenient: DeserializeOwned {
    fn extra_mut(&mut self) -> &mut Map<String, Value>;
}

macro_rules! impl_lenient {
    ($($payload:ty),* $(,)?) => {
        $(impl Lenient for $payload {
            fn extra_mut(&mut self) -> &mut Map<String, Value> {
                &mut self.extra
            }
        })*
    };
}

/// Parses `object` as `T` without losing explicit nulls. Null fields are
/// set aside before typed parsing and restored into `extra`, so they are
/// serialized back exactly as received.
fn parse_lenient<T: Lenient>(mut object: Map<String, Value>) -> Result<T, serde_json::Error> {
    let nulls: Vec<String> = object
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(key, _)| key.clone())
        .collect();
    for key in &nulls {
        object.remove(key);
    }

    let mut payload: T = serde_json::from_value(Value::Object(object))?;
    payload
        .extra_mut()
        .extend(nulls.into_iter().map(|key| (key, Value::Null)));
    Ok(payload)
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Lenient,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|value| match value {
            Value::Object(object) => parse_lenient(object).map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "expected an object, found {other}"
            ))),
        })
        .collect::<Result<Vec<T>, D::Error>>()
        .map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSequence {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub correct_answer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchItem {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub matches: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matching {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub items: Option<Vec<MatchItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotDifference {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub differences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An item to be ordered. Ordering attributes such as `size` land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortItem {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sorting {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub items: Option<Vec<SortItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_order: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counting {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub correct_answer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPiece {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub correct_answer: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Placeholder produced when the model reply could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackExercise {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_lenient!(
    PatternSequence,
    MatchItem,
    Matching,
    SpotDifference,
    SortItem,
    Sorting,
    Counting,
    MissingPiece,
    FallbackExercise,
);

/// The type-specific body of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExerciseContent {
    PatternSequence(PatternSequence),
    Matching(Matching),
    SpotDifference(SpotDifference),
    Sorting(Sorting),
    Counting(Counting),
    MissingPiece(MissingPiece),
    Fallback(FallbackExercise),
    /// An object that did not fit its type's shape, kept unchanged.
    Unstructured(Map<String, Value>),
}

impl ExerciseContent {
    /// Interprets one element of a normalized exercise list as `kind`.
    ///
    /// Never fails: elements that do not match the kind's shape are kept
    /// as `Unstructured`, and non-object elements are wrapped under
    /// `content`.
    pub fn from_value(kind: ExerciseKind, value: Value, is_fallback: bool) -> Self {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                let mut wrapped = Map::new();
                wrapped.insert("content".to_string(), other);
                return ExerciseContent::Unstructured(wrapped);
            }
        };
        for key in TAG_KEYS {
            object.remove(key);
        }

        if is_fallback {
            return parse_as(object, ExerciseContent::Fallback);
        }

        match kind {
            ExerciseKind::PatternSequence => parse_as(object, ExerciseContent::PatternSequence),
            ExerciseKind::Matching => parse_as(object, ExerciseContent::Matching),
            ExerciseKind::SpotDifference => parse_as(object, ExerciseContent::SpotDifference),
            ExerciseKind::Sorting => parse_as(object, ExerciseContent::Sorting),
            ExerciseKind::Counting => parse_as(object, ExerciseContent::Counting),
            ExerciseKind::MissingPiece => parse_as(object, ExerciseContent::MissingPiece),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ExerciseContent::Fallback(_))
    }
}

fn parse_as<T: Lenient>(
    object: Map<String, Value>,
    wrap: fn(T) -> ExerciseContent,
) -> ExerciseContent {
    match parse_lenient::<T>(object.clone()) {
        Ok(payload) => wrap(payload),
        Err(_) => ExerciseContent::Unstructured(object),
    }
}

/// An exercise tagged with the exercise type that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(flatten)]
    pub content: ExerciseContent,
    #[serde(rename = "type")]
    pub type_id: String,
    pub type_name: String,
    pub type_icon: String,
}

impl Exercise {
    pub fn tagged(definition: &ExerciseTypeDefinition, content: ExerciseContent) -> Self {
        Self {
            content,
            type_id: definition.id.clone(),
            type_name: definition.name.clone(),
            type_icon: definition.icon.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use serde_json::json;

    #[test]
    fn test_counting_payload_is_typed() {
        let value = json!({
            "id": 1,
            "question": "Đếm số quả táo:",
            "images": ["🍎", "🍎", "🍎"],
            "correctAnswer": 3,
            "explanation": "Có 3 quả táo"
        });

        match ExerciseContent::from_value(ExerciseKind::Counting, value, false) {
            ExerciseContent::Counting(counting) => {
                assert_eq!(counting.images.map(|images| images.len()), Some(3));
                assert_eq!(counting.correct_answer, json!(3));
                assert!(counting.extra.is_empty());
            }
            other => panic!("Expected Counting, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_fields_survive_serialization() {
        let value = json!({
            "id": 2,
            "question": "Sắp xếp:",
            "items": [{"id": "1", "image": "🔴", "size": "small"}],
            "correctOrder": ["1"],
            "hint": "nhỏ trước"
        });

        let content = ExerciseContent::from_value(ExerciseKind::Sorting, value, false);
        let json = serde_json::to_value(&content).unwrap();

        assert_eq!(json["hint"], "nhỏ trước");
        assert_eq!(json["items"][0]["size"], "small");
        assert_eq!(json["correctOrder"], json!(["1"]));
    }

    #[test]
    fn test_mismatched_shape_is_kept_unstructured() {
        let value = json!({"id": 1, "question": ["not", "a", "string"]});
        let content = ExerciseContent::from_value(ExerciseKind::Matching, value.clone(), false);

        assert_eq!(
            content,
            ExerciseContent::Unstructured(value.as_object().unwrap().clone())
        );
    }

    #[test]
    fn test_non_object_is_wrapped() {
        let content =
            ExerciseContent::from_value(ExerciseKind::Counting, json!("just text"), false);
        assert_eq!(serde_json::to_value(&content).unwrap(), json!({"content": "just text"}));
    }

    #[test]
    fn test_fallback_is_recognized() {
        let value = json!({
            "id": 1,
            "question": "Bài tập mẫu",
            "content": "abc...",
            "explanation": "Đây là bài tập được tạo bởi AI",
            "type": "fallback"
        });
        let content = ExerciseContent::from_value(ExerciseKind::Counting, value, true);
        assert!(content.is_fallback());
    }

    #[test]
    fn test_tag_overrides_model_supplied_type() {
        let catalog = Catalog::standard();
        let def = catalog.exercise_type("missing-piece").unwrap();
        let value = json!({"id": 1, "type": "something-else", "pattern": ["🔴", "?"]});

        let exercise = Exercise::tagged(
            def,
            ExerciseContent::from_value(def.kind, value, false),
        );
        let json = serde_json::to_value(&exercise).unwrap();

        assert_eq!(json["type"], "missing-piece");
        assert_eq!(json["typeName"], "Tìm hình bị thiếu");
        assert_eq!(json["typeIcon"], "❓");
        assert_eq!(json["pattern"], json!(["🔴", "?"]));
    }

    #[test]
    fn test_sparse_payloads_serialize_unchanged() {
        let cases = [
            (
                ExerciseKind::PatternSequence,
                json!({"question": "Q", "explanation": null}),
            ),
            (ExerciseKind::PatternSequence, json!({})),
            (
                ExerciseKind::Matching,
                json!({"id": null, "items": [{"image": "🍎"}, {"id": "b", "matches": null}]}),
            ),
            (ExerciseKind::Matching, json!({"items": []})),
            (ExerciseKind::SpotDifference, json!({"image1": "Nhà", "differences": null})),
            (
                ExerciseKind::Sorting,
                json!({"items": [{"size": "small", "image": null}], "correctOrder": ["1"]}),
            ),
            (ExerciseKind::Sorting, json!({"question": "Sắp xếp:"})),
            (ExerciseKind::Counting, json!({"correctAnswer": 0, "images": []})),
            (ExerciseKind::Counting, json!({"id": 7, "correctAnswer": null})),
            (
                ExerciseKind::MissingPiece,
                json!({"pattern": ["🔴", "?"], "hint": {"a": null}}),
            ),
        ];

        for (kind, value) in cases {
            let content = ExerciseContent::from_value(kind, value.clone(), false);
            assert!(
                !matches!(content, ExerciseContent::Unstructured(_)),
                "{kind:?} should be typed: {value}"
            );
            assert_eq!(serde_json::to_value(&content).unwrap(), value, "{kind:?}");
        }
    }

    #[test]
    fn test_tagged_exercise_adds_only_tag_keys() {
        let catalog = Catalog::standard();
        let def = catalog.exercise_type("pattern-sequence").unwrap();
        let value = json!({"question": "Q", "explanation": null});

        let content = ExerciseContent::from_value(def.kind, value.clone(), false);
        let exercise = Exercise::tagged(def, content);
        let mut json = serde_json::to_value(&exercise).unwrap();
        let object = json.as_object_mut().unwrap();
        for key in TAG_KEYS {
            assert!(object.remove(key).is_some());
        }
        assert_eq!(json, value);
    }

    #[test]
    fn test_non_object_list_item_keeps_payload_unstructured() {
        let value = json!({"id": 1, "items": ["🍎", "🍎"]});
        let content = ExerciseContent::from_value(ExerciseKind::Matching, value.clone(), false);

        assert!(matches!(content, ExerciseContent::Unstructured(_)));
        assert_eq!(serde_json::to_value(&content).unwrap(), value);
    }
}
