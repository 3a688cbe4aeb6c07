// Database model structs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::homework_ref::HomeworkRef;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Teacher {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

/// One entry of a class roster, as embedded in `classs.students`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterStudent {
    pub id: i64,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ClassRow {
    pub id: i64,
    pub name: String,
    pub teacher_id: i64,
    pub banner_path: Option<String>,
    pub students: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub teacher_id: i64,
    pub banner_path: Option<String>,
    pub roster: Vec<RosterStudent>,
    pub created_at: DateTime<Utc>,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        let roster = parse_roster(&row.students);
        Self {
            id: row.id,
            name: row.name,
            teacher_id: row.teacher_id,
            banner_path: row.banner_path,
            roster,
            created_at: row.created_at,
        }
    }
}

/// Rosters were written both as an array and as an object keyed by student id.
pub(crate) fn parse_roster(raw: &str) -> Vec<RosterStudent> {
    let entries = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(map)) => map.into_iter().map(|(_, v)| v).collect(),
        Ok(Value::Null) => Vec::new(),
        Ok(_) | Err(_) => {
            tracing::warn!("unreadable class roster, treating as empty");
            Vec::new()
        }
    };
    entries
        .into_iter()
        .filter_map(|v| serde_json::from_value::<RosterStudent>(v).ok())
        .collect()
}

#[derive(sqlx::FromRow)]
pub(crate) struct HomeworkRow {
    pub id: i64,
    pub name: String,
    pub subject: String,
    pub teacher_email: String,
    pub bloom_taxonomy: String,
    pub exercise_type: String,
    pub score: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Homework {
    pub id: i64,
    pub name: String,
    pub subject: String,
    pub teacher_email: String,
    pub bloom_taxonomy: String,
    pub exercise_type: String,
    pub score: i64,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

impl From<HomeworkRow> for Homework {
    fn from(row: HomeworkRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            subject: row.subject,
            teacher_email: row.teacher_email,
            bloom_taxonomy: row.bloom_taxonomy,
            exercise_type: row.exercise_type,
            score: row.score,
            content: serde_json::from_str(&row.content).unwrap_or(Value::Null),
            created_at: row.created_at,
        }
    }
}

pub struct NewHomework {
    pub name: String,
    pub subject: String,
    pub bloom_taxonomy: Vec<String>,
    pub exercise_type: String,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum AssignmentStatus {
    NotStarted,
    InProgress,
    Done,
    Other(String),
}

impl AssignmentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "not_started" => Self::NotStarted,
            "in_progress" => Self::InProgress,
            // the student app wrote "completed" for a while
            "done" | "completed" => Self::Done,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Other(s) => s,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl From<AssignmentStatus> for String {
    fn from(status: AssignmentStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    Ai,
    #[default]
    Manual,
}

impl CheckMode {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("ai") {
            Self::Ai
        } else {
            Self::Manual
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Manual => "manual",
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ActiveRow {
    pub id: i64,
    pub class_id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub homework: String,
    pub assigned_at: DateTime<Utc>,
    pub check_mode: String,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An `actives` row with its homework reference already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: i64,
    pub class_id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub homework: Option<HomeworkRef>,
    pub assigned_at: DateTime<Utc>,
    pub check_mode: CheckMode,
    pub status: AssignmentStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn homework_id(&self) -> Option<i64> {
        self.homework.as_ref().map(HomeworkRef::id)
    }
}

impl From<ActiveRow> for Assignment {
    fn from(row: ActiveRow) -> Self {
        let homework = serde_json::from_str::<Value>(&row.homework)
            .ok()
            .and_then(|raw| HomeworkRef::from_value(&raw));
        Self {
            id: row.id,
            class_id: row.class_id,
            student_id: row.student_id,
            teacher_id: row.teacher_id,
            homework,
            assigned_at: row.assigned_at,
            check_mode: CheckMode::parse(&row.check_mode),
            status: AssignmentStatus::parse(&row.status),
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub class_id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub homework: HomeworkRef,
    pub assigned_at: DateTime<Utc>,
    pub check_mode: CheckMode,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct HistoryRecord {
    pub id: i64,
    pub active_id: i64,
    pub class_id: i64,
    /// Email or numeric id, depending on which client wrote the row.
    pub student: String,
    pub teacher_id: i64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHistory {
    pub active_id: i64,
    pub class_id: i64,
    pub student: String,
    pub teacher_id: i64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub gender: String,
    pub age: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub age: i64,
}
