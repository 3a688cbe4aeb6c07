use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Question fields that give away the answer. Stripped from every content
/// snapshot handed to students.
pub const ANSWER_FIELDS: [&str; 3] = ["correct_answer", "correct_option_index", "explanation"];

/// Score assumed for a question that does not carry one.
pub const DEFAULT_QUESTION_SCORE: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeworkContent {
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    /// Any scalars; math exercises often list bare numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub correct_option_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default = "default_score", deserialize_with = "lenient_score")]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_score() -> i64 {
    DEFAULT_QUESTION_SCORE
}

/// Whole number from an integer, an integral float (`2.0`) or a numeric
/// string (`"2"`).
pub fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| whole_number(&serde_json::from_str::<Value>(s).ok()?))
        }
        _ => None,
    }
}

fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    whole_number(&raw)
        .ok_or_else(|| de::Error::custom(format!("score must be a whole number, got {raw}")))
}

/// Unreadable indices are dropped rather than failing the whole document.
fn lenient_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(whole_number(&raw).and_then(|n| usize::try_from(n).ok()))
}

/// `None` when the sum does not fit in an `i64`.
fn checked_sum(scores: impl IntoIterator<Item = i64>) -> Option<i64> {
    scores.into_iter().try_fold(0i64, |acc, s| acc.checked_add(s))
}

impl HomeworkContent {
    pub fn total_score(&self) -> Option<i64> {
        checked_sum(self.questions.iter().map(|q| q.score))
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Student-facing copy of a homework document: every question loses its
/// answer-bearing keys, everything else is kept as is.
pub fn sanitize(content: &Value) -> Value {
    let mut out = content.clone();
    if let Some(questions) = out.get_mut("questions").and_then(Value::as_array_mut) {
        for question in questions.iter_mut().filter_map(Value::as_object_mut) {
            for field in ANSWER_FIELDS {
                question.remove(field);
            }
        }
    }
    out
}

/// Sum of question scores in a raw content document, or `None` on overflow.
pub fn total_score(content: &Value) -> Option<i64> {
    let Some(questions) = content.get("questions").and_then(Value::as_array) else {
        return Some(0);
    };
    checked_sum(questions.iter().map(|q| {
        q.get("score")
            .and_then(whole_number)
            .unwrap_or(DEFAULT_QUESTION_SCORE)
    }))
}

/// Overwrite the score of question `index`. Returns false when there is no
/// such question.
pub fn set_question_score(content: &mut Value, index: usize, score: i64) -> bool {
    let Some(question) = content
        .get_mut("questions")
        .and_then(Value::as_array_mut)
        .and_then(|questions| questions.get_mut(index))
        .and_then(Value::as_object_mut)
    else {
        return false;
    };
    question.insert("score".to_string(), Value::from(score));
    true
}

/// Accepts a raw document only if it has the homework content shape.
pub fn validate_content(content: &Value) -> Result<HomeworkContent, serde_json::Error> {
    HomeworkContent::deserialize(content)
}
