//! Exercise Catalog
//!
//! Static registry of the age groups and exercise types the service knows
//! about. The catalog is built once at startup, validated, and then shared
//! read-only between all requests.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A named bucket of child ages used to tune difficulty and vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgeGroup {
    pub id: String,
    pub name: String,
    pub min_age: u8,
    pub max_age: u8,
    pub description: String,
}

impl AgeGroup {
    fn new(id: &str, name: &str, min_age: u8, max_age: u8, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            min_age,
            max_age,
            description: description.to_string(),
        }
    }
}

/// The closed set of exercise categories. Each kind has its own prompt
/// template and its own result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExerciseKind {
    PatternSequence,
    Matching,
    SpotDifference,
    Sorting,
    Counting,
    MissingPiece,
}

impl ExerciseKind {
    /// The wire identifier used by clients and in tagged exercises.
    pub fn id(self) -> &'static str {
        match self {
            ExerciseKind::PatternSequence => "pattern-sequence",
            ExerciseKind::Matching => "matching",
            ExerciseKind::SpotDifference => "spot-difference",
            ExerciseKind::Sorting => "sorting",
            ExerciseKind::Counting => "counting",
            ExerciseKind::MissingPiece => "missing-piece",
        }
    }
}

/// Per-age difficulty tuning. What `quantity` counts depends on the kind:
/// sequence length, number of items, number of differences, the largest
/// number used, or the pattern length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Difficulty {
    pub quantity: u8,
    pub complexity: &'static str,
}

/// An immutable exercise type registered at startup and looked up by `id`.
#[derive(Debug, Clone)]
pub struct ExerciseTypeDefinition {
    pub kind: ExerciseKind,
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub difficulty_by_age: BTreeMap<String, Difficulty>,
}

impl ExerciseTypeDefinition {
    fn new(
        kind: ExerciseKind,
        name: &str,
        description: &str,
        icon: &str,
        tuning: [(&str, u8, &'static str); 4],
    ) -> Self {
        let difficulty_by_age = tuning
            .into_iter()
            .map(|(age, quantity, complexity)| {
                (
                    age.to_string(),
                    Difficulty {
                        quantity,
                        complexity,
                    },
                )
            })
            .collect();
        Self {
            kind,
            id: kind.id().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            difficulty_by_age,
        }
    }

    pub fn difficulty_for(&self, age_group_id: &str) -> Option<Difficulty> {
        self.difficulty_by_age.get(age_group_id).copied()
    }
}

/// A configuration problem detected while validating the catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("exercise type '{type_id}' has no difficulty tuning for age group '{age_group_id}'")]
    MissingTuning {
        type_id: String,
        age_group_id: String,
    },
    #[error("duplicate catalog id: {0}")]
    DuplicateId(String),
}

/// The process-wide set of age groups and exercise types.
#[derive(Debug, Clone)]
pub struct Catalog {
    age_groups: Vec<AgeGroup>,
    exercise_types: Vec<ExerciseTypeDefinition>,
}

impl Catalog {
    pub fn new(age_groups: Vec<AgeGroup>, exercise_types: Vec<ExerciseTypeDefinition>) -> Self {
        Self {
            age_groups,
            exercise_types,
        }
    }

    /// Builds the catalog shipped with the application: four age groups
    /// from two to six years old and six exercise types.
    pub fn standard() -> Self {
        let age_groups = vec![
            AgeGroup::new("2-3", "2-3 tuổi", 2, 3, "Bé mới bắt đầu học"),
            AgeGroup::new("3-4", "3-4 tuổi", 3, 4, "Bé đang phát triển tư duy"),
            AgeGroup::new("4-5", "4-5 tuổi", 4, 5, "Bé sẵn sàng học logic"),
            AgeGroup::new("5-6", "5-6 tuổi", 5, 6, "Bé chuẩn bị vào lớp 1"),
        ];

        let exercise_types = vec![
            ExerciseTypeDefinition::new(
                ExerciseKind::PatternSequence,
                "Tìm quy luật dãy hình",
                "Tìm hình tiếp theo trong dãy hình theo quy luật",
                "🔢",
                [
                    ("2-3", 3, "simple"),
                    ("3-4", 4, "simple"),
                    ("4-5", 5, "medium"),
                    ("5-6", 6, "medium"),
                ],
            ),
            ExerciseTypeDefinition::new(
                ExerciseKind::Matching,
                "Nối hình giống nhau",
                "Nối các hình giống nhau hoặc có mối liên hệ",
                "🔗",
                [
                    ("2-3", 4, "exact-match"),
                    ("3-4", 6, "exact-match"),
                    ("4-5", 8, "category-match"),
                    ("5-6", 10, "category-match"),
                ],
            ),
            ExerciseTypeDefinition::new(
                ExerciseKind::SpotDifference,
                "Tìm điểm khác biệt",
                "Tìm điểm khác biệt giữa hai hình",
                "🔍",
                [
                    ("2-3", 2, "obvious"),
                    ("3-4", 3, "obvious"),
                    ("4-5", 4, "moderate"),
                    ("5-6", 5, "moderate"),
                ],
            ),
            ExerciseTypeDefinition::new(
                ExerciseKind::Sorting,
                "Sắp xếp theo thứ tự",
                "Sắp xếp các hình theo quy luật hoặc thứ tự logic",
                "📊",
                [
                    ("2-3", 3, "size"),
                    ("3-4", 4, "size-color"),
                    ("4-5", 5, "multiple-criteria"),
                    ("5-6", 6, "multiple-criteria"),
                ],
            ),
            ExerciseTypeDefinition::new(
                ExerciseKind::Counting,
                "Đếm và tính toán",
                "Đếm số lượng và thực hiện phép tính đơn giản",
                "🔢",
                [
                    ("2-3", 5, "counting"),
                    ("3-4", 10, "counting"),
                    ("4-5", 15, "addition"),
                    ("5-6", 20, "addition-subtraction"),
                ],
            ),
            ExerciseTypeDefinition::new(
                ExerciseKind::MissingPiece,
                "Tìm hình bị thiếu",
                "Tìm hình còn thiếu để hoàn thành bộ hoặc mẫu",
                "❓",
                [
                    ("2-3", 3, "simple"),
                    ("3-4", 4, "simple"),
                    ("4-5", 5, "medium"),
                    ("5-6", 6, "medium"),
                ],
            ),
        ];

        Self::new(age_groups, exercise_types)
    }

    /// Checks that ids are unique and that every exercise type can be
    /// rendered for every age group. Meant to run once at startup.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for id in self.age_group_ids() {
            if !seen.insert(id) {
                return Err(CatalogError::DuplicateId(id.to_string()));
            }
        }
        let mut seen = HashSet::new();
        for definition in &self.exercise_types {
            if !seen.insert(definition.id.as_str()) {
                return Err(CatalogError::DuplicateId(definition.id.clone()));
            }
            for age_group in &self.age_groups {
                if definition.difficulty_for(&age_group.id).is_none() {
                    return Err(CatalogError::MissingTuning {
                        type_id: definition.id.clone(),
                        age_group_id: age_group.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn age_groups(&self) -> &[AgeGroup] {
        &self.age_groups
    }

    pub fn exercise_types(&self) -> &[ExerciseTypeDefinition] {
        &self.exercise_types
    }

    pub fn age_group(&self, id: &str) -> Option<&AgeGroup> {
        self.age_groups.iter().find(|group| group.id == id)
    }

    pub fn exercise_type(&self, id: &str) -> Option<&ExerciseTypeDefinition> {
        self.exercise_types.iter().find(|def| def.id == id)
    }

    pub fn age_group_ids(&self) -> impl Iterator<Item = &str> {
        self.age_groups.iter().map(|group| group.id.as_str())
    }

    pub fn exercise_type_ids(&self) -> impl Iterator<Item = &str> {
        self.exercise_types.iter().map(|def| def.id.as_str())
    }
}
