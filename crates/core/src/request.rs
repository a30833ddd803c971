//! Generation requests and their resolution against the catalog.

use crate::catalog::{AgeGroup, Catalog, ExerciseTypeDefinition};
use tracing::warn;

/// Number of exercises requested per exercise type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseCount(u8);

impl ExerciseCount {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 10;
    pub const DEFAULT: ExerciseCount = ExerciseCount(5);

    pub fn new(value: i64) -> Result<Self, RequestError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RequestError::CountOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for ExerciseCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Rejected request parameters. The messages are shown to the caregiver.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Thiếu thông tin bắt buộc: ageGroupId, exerciseTypeIds")]
    MissingFields,
    #[error("Độ tuổi không hợp lệ: {0}")]
    UnknownAgeGroup(String),
    #[error("Không tìm thấy loại bài tập được chọn")]
    NoKnownExerciseTypes,
    #[error("Số lượng bài tập không hợp lệ: {0}")]
    InvalidCount(String),
    #[error("Số lượng bài tập phải từ 1 đến 10 (nhận được {0})")]
    CountOutOfRange(i64),
}

/// A request for exercises, as supplied by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub age_group_id: String,
    pub exercise_type_ids: Vec<String>,
    pub count: ExerciseCount,
}

/// A request whose ids have all been found in the catalog.
#[derive(Debug, Clone)]
pub struct ResolvedRequest<'a> {
    pub age_group: &'a AgeGroup,
    /// Known types in the order the client listed them, without repeats.
    pub exercise_types: Vec<&'a ExerciseTypeDefinition>,
    pub count: ExerciseCount,
}

impl Catalog {
    /// Looks up every id in `request`. Unknown exercise type ids are
    /// skipped; the request fails only when none of them is known.
    pub fn resolve(&self, request: &GenerationRequest) -> Result<ResolvedRequest<'_>, RequestError> {
        if request.age_group_id.trim().is_empty() || request.exercise_type_ids.is_empty() {
            return Err(RequestError::MissingFields);
        }

        let age_group = self
            .age_group(&request.age_group_id)
            .ok_or_else(|| RequestError::UnknownAgeGroup(request.age_group_id.clone()))?;

        let mut exercise_types: Vec<&ExerciseTypeDefinition> = Vec::new();
        for id in &request.exercise_type_ids {
            match self.exercise_type(id) {
                Some(def) if !exercise_types.iter().any(|seen| seen.id == def.id) => {
                    exercise_types.push(def)
                }
                Some(_) => {}
                None => warn!(type_id = %id, "Ignoring unknown exercise type"),
            }
        }

        if exercise_types.is_empty() {
            return Err(RequestError::NoKnownExerciseTypes);
        }

        Ok(ResolvedRequest {
            age_group,
            exercise_types,
            count: request.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(age: &str, types: &[&str]) -> GenerationRequest {
        GenerationRequest {
            age_group_id: age.to_string(),
            exercise_type_ids: types.iter().map(|t| t.to_string()).collect(),
            count: ExerciseCount::DEFAULT,
        }
    }

    #[test]
    fn test_count_bounds() {
        assert_eq!(ExerciseCount::new(1).map(ExerciseCount::get), Ok(1));
        assert_eq!(ExerciseCount::new(10).map(ExerciseCount::get), Ok(10));
        assert_eq!(ExerciseCount::new(0), Err(RequestError::CountOutOfRange(0)));
        assert_eq!(ExerciseCount::new(11), Err(RequestError::CountOutOfRange(11)));
        assert_eq!(ExerciseCount::new(-1), Err(RequestError::CountOutOfRange(-1)));
        assert_eq!(ExerciseCount::default().get(), 5);
    }

    #[test]
    fn test_resolve_keeps_request_order_and_drops_duplicates() {
        let catalog = Catalog::standard();
        let resolved = catalog
            .resolve(&request("3-4", &["sorting", "counting", "sorting", "matching"]))
            .unwrap();

        let ids: Vec<&str> = resolved.exercise_types.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["sorting", "counting", "matching"]);
        assert_eq!(resolved.age_group.id, "3-4");
    }

    #[test]
    fn test_resolve_skips_unknown_types() {
        let catalog = Catalog::standard();
        let resolved = catalog
            .resolve(&request("2-3", &["crossword", "counting"]))
            .unwrap();
        assert_eq!(resolved.exercise_types.len(), 1);
        assert_eq!(resolved.exercise_types[0].id, "counting");
    }

    #[test]
    fn test_resolve_errors() {
        let catalog = Catalog::standard();

        assert_eq!(
            catalog.resolve(&request("", &["counting"])).unwrap_err(),
            RequestError::MissingFields
        );
        assert_eq!(
            catalog.resolve(&request("3-4", &[])).unwrap_err(),
            RequestError::MissingFields
        );
        assert_eq!(
            catalog.resolve(&request("9-12", &["counting"])).unwrap_err(),
            RequestError::UnknownAgeGroup("9-12".to_string())
        );
        assert_eq!(
            catalog.resolve(&request("3-4", &["crossword"])).unwrap_err(),
            RequestError::NoKnownExerciseTypes
        );
    }
}
