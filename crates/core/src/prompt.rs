//! Prompt Builder
//!
//! Renders the natural-language instruction sent to the generation endpoint
//! for one exercise type. Every template embeds a literal example of the
//! JSON shape the response normalizer expects.

use crate::catalog::{AgeGroup, Difficulty, ExerciseKind, ExerciseTypeDefinition};
use crate::request::ExerciseCount;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("exercise type '{type_id}' has no difficulty tuning for age group '{age_group_id}'")]
    MissingTuning {
        type_id: String,
        age_group_id: String,
    },
}

/// Fixed prompt used to check that the generation endpoint answers.
pub const CONNECTION_TEST_PROMPT: &str = r#"Tạo 1 bài tập đếm đơn giản cho trẻ 3 tuổi. Format JSON: {"exercises": [{"id": 1, "question": "Đếm số quả táo:", "images": ["🍎", "🍎"], "correctAnswer": 2, "explanation": "Có 2 quả táo"}]}"#;

const PATTERN_SEQUENCE_TEMPLATE: &str = r#"
Tạo {count} bài tập tìm quy luật dãy hình cho trẻ {min_age}-{max_age} tuổi.

Yêu cầu:
- Mỗi bài tập có 4-6 hình trong dãy
- Quy luật đơn giản, phù hợp với độ tuổi
- Sử dụng hình ảnh quen thuộc: con vật, đồ vật, hình học, màu sắc
- Cung cấp 3 lựa chọn cho đáp án
- Độ khó tăng dần theo tuổi
- {difficulty}

Format JSON:
{
  "exercises": [
    {
      "id": 1,
      "question": "Tìm hình tiếp theo trong dãy:",
      "sequence": ["🐱", "🐶", "🐱", "🐶", "🐱", "?"],
      "options": ["🐱", "🐶", "🐰"],
      "correctAnswer": "🐶",
      "explanation": "Quy luật: mèo - chó - mèo - chó - mèo - chó"
    }
  ]
}
"#;

const MATCHING_TEMPLATE: &str = r#"
Tạo {count} bài tập nối hình giống nhau cho trẻ {min_age}-{max_age} tuổi.

Yêu cầu:
- Mỗi bài có 6-8 hình cần nối
- Các hình giống nhau hoặc có mối liên hệ logic
- Sử dụng hình ảnh quen thuộc với trẻ
- Có thể nối theo: hình dạng, màu sắc, loại đồ vật, con vật
- {difficulty}

Format JSON:
{
  "exercises": [
    {
      "id": 1,
      "question": "Nối các hình giống nhau:",
      "items": [
        {"id": "a1", "image": "🍎", "matches": "a2"},
        {"id": "a2", "image": "🍎", "matches": "a1"},
        {"id": "b1", "image": "🐱", "matches": "b2"},
        {"id": "b2", "image": "🐱", "matches": "b1"}
      ],
      "explanation": "Nối táo với táo, mèo với mèo"
    }
  ]
}
"#;

const SPOT_DIFFERENCE_TEMPLATE: &str = r#"
Tạo {count} bài tập tìm điểm khác biệt cho trẻ {min_age}-{max_age} tuổi.

Yêu cầu:
- Mô tả chi tiết hai hình với 3-5 điểm khác biệt
- Điểm khác biệt rõ ràng, dễ nhận biết
- Sử dụng chủ đề quen thuộc: nhà cửa, con vật, đồ chơi
- Độ khó phù hợp với độ tuổi
- {difficulty}

Format JSON:
{
  "exercises": [
    {
      "id": 1,
      "question": "Tìm điểm khác biệt giữa hai hình:",
      "image1": "Nhà có 2 cửa sổ, mái đỏ, cây xanh bên trái",
      "image2": "Nhà có 3 cửa sổ, mái đỏ, cây xanh bên phải",
      "differences": [
        "Số cửa sổ: 2 vs 3",
        "Vị trí cây: bên trái vs bên phải"
      ],
      "explanation": "Có 2 điểm khác biệt: số cửa sổ và vị trí cây"
    }
  ]
}
"#;

const SORTING_TEMPLATE: &str = r#"
Tạo {count} bài tập sắp xếp theo thứ tự cho trẻ {min_age}-{max_age} tuổi.

Yêu cầu:
- Sắp xếp theo: kích thước, màu sắc, số lượng, thứ tự thời gian
- 4-6 hình cần sắp xếp
- Quy luật rõ ràng, dễ hiểu
- Sử dụng hình ảnh quen thuộc
- {difficulty}

Format JSON:
{
  "exercises": [
    {
      "id": 1,
      "question": "Sắp xếp các hình theo kích thước từ nhỏ đến lớn:",
      "items": [
        {"id": "1", "image": "🔴", "size": "small"},
        {"id": "2", "image": "🔴", "size": "medium"},
        {"id": "3", "image": "🔴", "size": "large"}
      ],
      "correctOrder": ["1", "2", "3"],
      "explanation": "Sắp xếp theo kích thước: nhỏ → trung bình → lớn"
    }
  ]
}
"#;

const COUNTING_TEMPLATE: &str = r#"
Tạo {count} bài tập đếm và tính toán cho trẻ {min_age}-{max_age} tuổi.

Yêu cầu:
- Đếm số lượng hình ảnh
- Phép cộng/trừ đơn giản với hình ảnh
- Sử dụng hình ảnh quen thuộc: trái cây, đồ chơi, con vật
- Số lượng phù hợp với độ tuổi
- {difficulty}

Format JSON:
{
  "exercises": [
    {
      "id": 1,
      "question": "Đếm số quả táo:",
      "images": ["🍎", "🍎", "🍎"],
      "correctAnswer": 3,
      "explanation": "Có 3 quả táo"
    }
  ]
}
"#;

const MISSING_PIECE_TEMPLATE: &str = r#"
Tạo {count} bài tập tìm hình bị thiếu cho trẻ {min_age}-{max_age} tuổi.

Yêu cầu:
- Hoàn thành bộ đồ vật, con vật, hình học
- Tìm hình còn thiếu trong mẫu
- Sử dụng logic đơn giản, dễ hiểu
- Cung cấp 3-4 lựa chọn
- {difficulty}

Format JSON:
{
  "exercises": [
    {
      "id": 1,
      "question": "Tìm hình còn thiếu để hoàn thành bộ:",
      "pattern": ["🔴", "🔵", "🟡", "🔴", "🔵", "?"],
      "options": ["🟡", "🔴", "🔵"],
      "correctAnswer": "🟡",
      "explanation": "Quy luật: đỏ - xanh - vàng lặp lại"
    }
  ]
}
"#;

fn template_for(kind: ExerciseKind) -> &'static str {
    match kind {
        ExerciseKind::PatternSequence => PATTERN_SEQUENCE_TEMPLATE,
        ExerciseKind::Matching => MATCHING_TEMPLATE,
        ExerciseKind::SpotDifference => SPOT_DIFFERENCE_TEMPLATE,
        ExerciseKind::Sorting => SORTING_TEMPLATE,
        ExerciseKind::Counting => COUNTING_TEMPLATE,
        ExerciseKind::MissingPiece => MISSING_PIECE_TEMPLATE,
    }
}

fn difficulty_line(kind: ExerciseKind, difficulty: Difficulty) -> String {
    let Difficulty {
        quantity,
        complexity,
    } = difficulty;
    match kind {
        ExerciseKind::PatternSequence => {
            format!("Độ dài dãy: {quantity} hình, mức độ: {complexity}")
        }
        ExerciseKind::Matching => format!("Số hình cần nối: {quantity}, kiểu nối: {complexity}"),
        ExerciseKind::SpotDifference => {
            format!("Số điểm khác biệt: {quantity}, mức độ: {complexity}")
        }
        ExerciseKind::Sorting => {
            format!("Số hình cần sắp xếp: {quantity}, tiêu chí: {complexity}")
        }
        ExerciseKind::Counting => {
            format!("Số lớn nhất: {quantity}, phép tính: {complexity}")
        }
        ExerciseKind::MissingPiece => {
            format!("Độ dài mẫu: {quantity} hình, mức độ: {complexity}")
        }
    }
}

/// Builds the prompt for `count` exercises of `definition` aimed at `age_group`.
///
/// The output depends only on its arguments. The only failure is a
/// definition without tuning for the age group, which `Catalog::validate`
/// rules out at startup.
pub fn build_prompt(
    definition: &ExerciseTypeDefinition,
    age_group: &AgeGroup,
    count: ExerciseCount,
) -> Result<String, PromptError> {
    let difficulty =
        definition
            .difficulty_for(&age_group.id)
            .ok_or_else(|| PromptError::MissingTuning {
                type_id: definition.id.clone(),
                age_group_id: age_group.id.clone(),
            })?;

    Ok(template_for(definition.kind)
        .replace("{count}", &count.get().to_string())
        .replace("{min_age}", &age_group.min_age.to_string())
        .replace("{max_age}", &age_group.max_age.to_string())
        .replace("{difficulty}", &difficulty_line(definition.kind, difficulty)))
}
