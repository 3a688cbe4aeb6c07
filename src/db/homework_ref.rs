// The `actives.homework` column has carried two shapes over time: a bare
// homework id, and an object embedding the id next to a content snapshot.
// Everything that reads the column goes through this module.

use serde_json::{json, Value};

macro_rules! id_text {
    ($path:literal) => {
        concat!("trim(json_extract(homework, '", $path, "'), ' ')")
    };
}

/// Text ids count only when they are plain digits, mirroring `as_id`.
macro_rules! digits_to_id {
    ($path:literal) => {
        concat!(
            "CASE WHEN ", id_text!($path), " GLOB '[0-9]*' AND ",
            id_text!($path), " NOT GLOB '*[^0-9]*' AND length(",
            id_text!($path), ") <= 18 THEN CAST(",
            id_text!($path), " AS INTEGER) END"
        )
    };
}

/// SQL expression yielding the referenced homework id of an `actives` row for
/// either shape, or NULL. Accepts exactly what `resolve_homework_ref` does.
pub(crate) const HOMEWORK_ID_SQL: &str = concat!(
    "(CASE json_type(homework) ",
    "WHEN 'integer' THEN json_extract(homework, '$') ",
    "WHEN 'text' THEN (", digits_to_id!("$"), ") ",
    "WHEN 'object' THEN (CASE json_type(homework, '$.id') ",
    "WHEN 'integer' THEN json_extract(homework, '$.id') ",
    "WHEN 'text' THEN (", digits_to_id!("$.id"), ") END) ",
    "END)"
);

/// Longest digit string read as an id; always fits an `i64`.
const MAX_ID_DIGITS: usize = 18;

#[derive(Debug, Clone, PartialEq)]
pub enum HomeworkRef {
    /// Legacy rows: just the homework id.
    Legacy(i64),
    Snapshot(HomeworkSnapshot),
}

/// Answer-free copy of a homework template embedded in each assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeworkSnapshot {
    pub id: i64,
    pub name: String,
    pub subject: String,
    pub score: i64,
    pub content: Value,
}

impl HomeworkRef {
    pub fn from_value(raw: &Value) -> Option<Self> {
        match raw {
            Value::Object(obj) => {
                let id = obj.get("id").and_then(as_id)?;
                let text = |key: &str| {
                    obj.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                Some(HomeworkRef::Snapshot(HomeworkSnapshot {
                    id,
                    name: text("name"),
                    subject: text("subject"),
                    score: obj.get("score").and_then(Value::as_i64).unwrap_or(0),
                    content: obj.get("content").cloned().unwrap_or(Value::Null),
                }))
            }
            other => as_id(other).map(HomeworkRef::Legacy),
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            HomeworkRef::Legacy(id) => *id,
            HomeworkRef::Snapshot(snapshot) => snapshot.id,
        }
    }

    pub fn snapshot(&self) -> Option<&HomeworkSnapshot> {
        match self {
            HomeworkRef::Legacy(_) => None,
            HomeworkRef::Snapshot(snapshot) => Some(snapshot),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            HomeworkRef::Legacy(id) => json!(id),
            HomeworkRef::Snapshot(s) => json!({
                "id": s.id,
                "name": s.name,
                "subject": s.subject,
                "score": s.score,
                "content": s.content,
            }),
        }
    }
}

/// Homework id referenced by a raw column value, whichever shape it has.
pub fn resolve_homework_ref(raw: &Value) -> Option<i64> {
    HomeworkRef::from_value(raw).map(|r| r.id())
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim_matches(' ');
            let digits = !s.is_empty()
                && s.len() <= MAX_ID_DIGITS
                && s.bytes().all(|b| b.is_ascii_digit());
            digits.then(|| s.parse().ok()).flatten()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bare_number() {
        assert_eq!(resolve_homework_ref(&json!(42)), Some(42));
        assert_eq!(resolve_homework_ref(&json!("42")), Some(42));
    }

    #[test]
    fn resolves_embedded_object() {
        let raw = json!({ "id": 7, "name": "Fractions", "content": { "questions": [] } });
        let r = HomeworkRef::from_value(&raw).unwrap();
        assert_eq!(r.id(), 7);
        let snap = r.snapshot().unwrap();
        assert_eq!(snap.name, "Fractions");
        assert_eq!(snap.content, json!({ "questions": [] }));

        assert_eq!(resolve_homework_ref(&json!({ "id": "9" })), Some(9));
    }

    #[test]
    fn unresolvable_shapes_yield_none() {
        assert_eq!(resolve_homework_ref(&json!(null)), None);
        assert_eq!(resolve_homework_ref(&json!({ "content": {} })), None);
        assert_eq!(resolve_homework_ref(&json!("abc")), None);
        assert_eq!(resolve_homework_ref(&json!([1, 2])), None);
        assert_eq!(resolve_homework_ref(&json!(1.5)), None);
        assert_eq!(resolve_homework_ref(&json!("42abc")), None);
        assert_eq!(resolve_homework_ref(&json!("+42")), None);
        assert_eq!(resolve_homework_ref(&json!({ "id": 7.0 })), None);
        assert_eq!(resolve_homework_ref(&json!("1234567890123456789")), None);
    }

    #[test]
    fn snapshot_survives_encoding() {
        let r = HomeworkRef::Snapshot(HomeworkSnapshot {
            id: 3,
            name: "Angles".into(),
            subject: "Geometry".into(),
            score: 4,
            content: json!({ "questions": [{ "question": "a?" }] }),
        });
        assert_eq!(HomeworkRef::from_value(&r.to_value()), Some(r));
        assert_eq!(HomeworkRef::Legacy(5).to_value(), json!(5));
    }
}
