use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::Serialize;

use crate::db::models::{Assignment, Class, HistoryRecord, Homework, Student};
use crate::db::Db;
use crate::names::{HISTORY_FEED_LIMIT, UNKNOWN_CLASS, UNKNOWN_HOMEWORK, UNKNOWN_STUDENT};

#[cfg_attr(test, mockall::automock)]
pub trait HistoryRepository: Send + Sync {
    fn recent_history(
        &self,
        teacher_id: i64,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryRecord>>> + Send;

    fn recent_done_assignments(
        &self,
        teacher_id: i64,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Assignment>>> + Send;

    fn assignments_by_ids(
        &self,
        teacher_id: i64,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Assignment>>> + Send;

    fn homeworks_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Homework>>> + Send;

    fn classes_by_ids(
        &self,
        teacher_id: i64,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Class>>> + Send;

    fn students_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Student>>> + Send;

    fn students_by_emails(
        &self,
        teacher_id: i64,
        emails: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Student>>> + Send;
}

impl HistoryRepository for Db {
    fn recent_history(
        &self,
        teacher_id: i64,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryRecord>>> + Send {
        Db::recent_history(self, teacher_id, limit)
    }

    fn recent_done_assignments(
        &self,
        teacher_id: i64,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Assignment>>> + Send {
        Db::recent_done_assignments(self, teacher_id, limit)
    }

    fn assignments_by_ids(
        &self,
        teacher_id: i64,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Assignment>>> + Send {
        Db::assignments_by_ids(self, teacher_id, ids)
    }

    fn homeworks_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Homework>>> + Send {
        Db::homeworks_by_ids(self, ids)
    }

    fn classes_by_ids(
        &self,
        teacher_id: i64,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Class>>> + Send {
        Db::classes_by_ids(self, teacher_id, ids)
    }

    fn students_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Student>>> + Send {
        Db::students_by_ids(self, ids)
    }

    fn students_by_emails(
        &self,
        teacher_id: i64,
        emails: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Student>>> + Send {
        Db::students_by_emails(self, teacher_id, emails)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    History,
    /// Reconstructed from a done assignment because no history exists yet.
    Assignment,
}

/// One completed assignment in the teacher's activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub active_id: i64,
    pub homework_id: Option<i64>,
    pub homework_name: String,
    pub subject: String,
    pub class_id: i64,
    pub class_name: String,
    /// Identifier as stored: an email or a numeric id.
    pub student: String,
    pub student_name: String,
    pub student_email: String,
    pub completed_at: DateTime<Utc>,
    pub source: ActivitySource,
}

/// Normalized feed row before enrichment.
struct Pending {
    active_id: i64,
    homework_id: Option<i64>,
    snapshot_name: Option<String>,
    class_id: i64,
    student: String,
    completed_at: DateTime<Utc>,
    source: ActivitySource,
}

#[derive(Default)]
struct Lookups {
    homework: HashMap<i64, Homework>,
    classes: HashMap<i64, Class>,
    /// Keyed by both email and stringified id.
    students: HashMap<String, Student>,
}

pub struct HistoryService<R: HistoryRepository = Db> {
    repo: R,
}

impl<R: HistoryRepository + Clone> Clone for HistoryService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: HistoryRepository> HistoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Newest first, one entry per assignment. A failing history read yields an
    /// empty feed; an empty history falls back to done assignments.
    pub async fn list_completed_activities(&self, teacher_id: i64) -> Result<Vec<ActivityEntry>> {
        let records = match self.repo.recent_history(teacher_id, HISTORY_FEED_LIMIT).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("history unavailable for teacher_id={teacher_id}: {e}");
                return Ok(Vec::new());
            }
        };

        let pending = if records.is_empty() {
            let done = self
                .repo
                .recent_done_assignments(teacher_id, HISTORY_FEED_LIMIT)
                .await?;
            from_assignments(done)
        } else {
            self.from_history(teacher_id, records).await?
        };

        let lookups = self.lookups(teacher_id, &pending).await?;
        Ok(pending.into_iter().map(|p| enrich(p, &lookups)).collect())
    }

    async fn from_history(&self, teacher_id: i64, records: Vec<HistoryRecord>) -> Result<Vec<Pending>> {
        let mut seen = HashSet::new();
        let records: Vec<HistoryRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.active_id))
            .collect();

        let active_ids: Vec<i64> = records.iter().map(|r| r.active_id).collect();
        // Unassigned rows are gone from `actives`; their history stays.
        let assignments: HashMap<i64, Assignment> = self
            .repo
            .assignments_by_ids(teacher_id, &active_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(records
            .into_iter()
            .map(|r| {
                let assignment = assignments.get(&r.active_id);
                Pending {
                    active_id: r.active_id,
                    homework_id: assignment.and_then(Assignment::homework_id),
                    snapshot_name: assignment.and_then(snapshot_name),
                    class_id: r.class_id,
                    student: r.student,
                    completed_at: r.completed_at,
                    source: ActivitySource::History,
                }
            })
            .collect())
    }

    async fn lookups(&self, teacher_id: i64, pending: &[Pending]) -> Result<Lookups> {
        if pending.is_empty() {
            return Ok(Lookups::default());
        }

        let homework_ids = distinct(pending.iter().filter_map(|p| p.homework_id));
        let class_ids = distinct(pending.iter().map(|p| p.class_id));
        let identifiers = distinct(pending.iter().map(|p| p.student.clone()));
        let numeric_ids = distinct(identifiers.iter().filter_map(|s| s.parse::<i64>().ok()));

        let homework = self
            .repo
            .homeworks_by_ids(&homework_ids)
            .await?
            .into_iter()
            .map(|h| (h.id, h))
            .collect();

        let classes = self
            .repo
            .classes_by_ids(teacher_id, &class_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut students = HashMap::new();
        for student in self.repo.students_by_ids(&numeric_ids).await? {
            students.insert(student.id.to_string(), student);
        }
        // emails are not unique across teachers
        for student in self.repo.students_by_emails(teacher_id, &identifiers).await? {
            students.entry(student.email.clone()).or_insert(student);
        }

        Ok(Lookups {
            homework,
            classes,
            students,
        })
    }
}

fn snapshot_name(assignment: &Assignment) -> Option<String> {
    assignment
        .homework
        .as_ref()
        .and_then(|h| h.snapshot())
        .map(|s| s.name.clone())
        .filter(|n| !n.is_empty())
}

fn from_assignments(done: Vec<Assignment>) -> Vec<Pending> {
    done.into_iter()
        .map(|a| Pending {
            active_id: a.id,
            homework_id: a.homework_id(),
            snapshot_name: snapshot_name(&a),
            class_id: a.class_id,
            student: a.student_id.to_string(),
            completed_at: a.completed_at.unwrap_or(a.assigned_at),
            source: ActivitySource::Assignment,
        })
        .collect()
}

fn enrich(p: Pending, lookups: &Lookups) -> ActivityEntry {
    let homework = p.homework_id.and_then(|id| lookups.homework.get(&id));
    let student = lookups.students.get(&p.student);

    ActivityEntry {
        active_id: p.active_id,
        homework_id: p.homework_id,
        homework_name: homework
            .map(|h| h.name.clone())
            .or(p.snapshot_name)
            .unwrap_or_else(|| UNKNOWN_HOMEWORK.to_string()),
        subject: homework.map(|h| h.subject.clone()).unwrap_or_default(),
        class_id: p.class_id,
        class_name: lookups
            .classes
            .get(&p.class_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_CLASS.to_string()),
        student_name: student
            .map(|s| s.full_name.clone())
            .unwrap_or_else(|| UNKNOWN_STUDENT.to_string()),
        student_email: student.map(|s| s.email.clone()).unwrap_or_default(),
        student: p.student,
        completed_at: p.completed_at,
        source: p.source,
    }
}

fn distinct<T: Eq + std::hash::Hash + Clone>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::models::{AssignmentStatus, CheckMode};
    use crate::db::HomeworkRef;
    use chrono::Duration;
    use serde_json::json;

    fn record(id: i64, active_id: i64, student: &str, minutes_ago: i64) -> HistoryRecord {
        HistoryRecord {
            id,
            active_id,
            class_id: 20,
            student: student.to_string(),
            teacher_id: 1,
            completed_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn done_assignment(id: i64, student_id: i64) -> Assignment {
        Assignment {
            id,
            class_id: 20,
            student_id,
            teacher_id: 1,
            homework: Some(HomeworkRef::Legacy(10)),
            assigned_at: Utc::now(),
            check_mode: CheckMode::Manual,
            status: AssignmentStatus::Done,
            completed_at: Some(Utc::now()),
        }
    }

    fn student(id: i64, email: &str) -> Student {
        Student {
            id,
            full_name: format!("Student {id}"),
            email: email.to_string(),
            username: String::new(),
            gender: String::new(),
            age: 12,
        }
    }

    fn homework() -> Homework {
        Homework {
            id: 10,
            name: "Fractions".to_string(),
            subject: "Math".to_string(),
            teacher_email: "t@school.test".to_string(),
            bloom_taxonomy: String::new(),
            exercise_type: String::new(),
            score: 5,
            content: json!({ "questions": [] }),
            created_at: Utc::now(),
        }
    }

    fn class() -> Class {
        Class {
            id: 20,
            name: "5A".to_string(),
            teacher_id: 1,
            banner_path: None,
            roster: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Lookup expectations shared by every feed test.
    fn with_lookups(mock: &mut MockHistoryRepository, students: Vec<Student>) {
        mock.expect_homeworks_by_ids()
            .returning(|_| Box::pin(async { Ok(vec![homework()]) }));
        mock.expect_classes_by_ids()
            .returning(|_, _| Box::pin(async { Ok(vec![class()]) }));
        let by_id = students.clone();
        mock.expect_students_by_ids().returning(move |ids| {
            let found: Vec<Student> = by_id.iter().filter(|s| ids.contains(&s.id)).cloned().collect();
            Box::pin(async move { Ok(found) })
        });
        mock.expect_students_by_emails().returning(move |_, emails| {
            let found: Vec<Student> = students
                .iter()
                .filter(|s| emails.contains(&s.email))
                .cloned()
                .collect();
            Box::pin(async move { Ok(found) })
        });
    }

    #[tokio::test]
    async fn feed_resolves_students_by_email_and_by_id() {
        let mut mock = MockHistoryRepository::new();
        mock.expect_recent_history().returning(|_, _| {
            Box::pin(async { Ok(vec![record(2, 101, "ana@school.test", 1), record(1, 100, "7", 5)]) })
        });
        mock.expect_assignments_by_ids().returning(|_, _| {
            Box::pin(async { Ok(vec![done_assignment(100, 7), done_assignment(101, 8)]) })
        });
        with_lookups(&mut mock, vec![student(7, "bo@school.test"), student(8, "ana@school.test")]);

        let feed = HistoryService::new(mock).list_completed_activities(1).await.unwrap();

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].active_id, 101);
        assert_eq!(feed[0].student_name, "Student 8");
        assert_eq!(feed[1].student_name, "Student 7");
        assert_eq!(feed[1].student_email, "bo@school.test");
        assert!(feed.iter().all(|e| e.homework_name == "Fractions" && e.class_name == "5A"));
        assert!(feed.iter().all(|e| e.source == ActivitySource::History));
    }

    #[tokio::test]
    async fn feed_keeps_one_entry_per_assignment() {
        let mut mock = MockHistoryRepository::new();
        mock.expect_recent_history().returning(|_, _| {
            Box::pin(async { Ok(vec![record(3, 100, "7", 1), record(2, 100, "7", 2), record(1, 101, "7", 3)]) })
        });
        mock.expect_assignments_by_ids()
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        with_lookups(&mut mock, vec![student(7, "bo@school.test")]);

        let feed = HistoryService::new(mock).list_completed_activities(1).await.unwrap();

        let ids: Vec<i64> = feed.iter().map(|e| e.active_id).collect();
        assert_eq!(ids, vec![100, 101]);
        // assignment rows were removed, so the homework cannot be resolved
        assert!(feed.iter().all(|e| e.homework_name == UNKNOWN_HOMEWORK));
    }

    #[tokio::test]
    async fn empty_history_falls_back_to_done_assignments() {
        let mut mock = MockHistoryRepository::new();
        mock.expect_recent_history()
            .returning(|_, _| Box::pin(async { Ok(vec![]) }));
        mock.expect_recent_done_assignments()
            .withf(|_, limit| *limit == HISTORY_FEED_LIMIT)
            .returning(|_, _| Box::pin(async { Ok(vec![done_assignment(5, 7)]) }));
        mock.expect_assignments_by_ids().never();
        with_lookups(&mut mock, vec![student(7, "bo@school.test")]);

        let feed = HistoryService::new(mock).list_completed_activities(1).await.unwrap();

        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].source, ActivitySource::Assignment);
        assert_eq!(feed[0].student, "7");
        assert_eq!(feed[0].student_name, "Student 7");
    }

    #[tokio::test]
    async fn history_read_failure_yields_empty_feed() {
        let mut mock = MockHistoryRepository::new();
        mock.expect_recent_history()
            .returning(|_, _| Box::pin(async { Err(color_eyre::eyre::eyre!("no such table: history")) }));
        mock.expect_recent_done_assignments().never();

        let feed = HistoryService::new(mock).list_completed_activities(1).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn unknown_student_gets_placeholder() {
        let mut mock = MockHistoryRepository::new();
        mock.expect_recent_history()
            .returning(|_, _| Box::pin(async { Ok(vec![record(1, 100, "ghost@school.test", 1)]) }));
        mock.expect_assignments_by_ids()
            .returning(|_, _| Box::pin(async { Ok(vec![done_assignment(100, 9)]) }));
        with_lookups(&mut mock, vec![]);

        let feed = HistoryService::new(mock).list_completed_activities(1).await.unwrap();
        assert_eq!(feed[0].student_name, UNKNOWN_STUDENT);
        assert_eq!(feed[0].student, "ghost@school.test");
    }
}
