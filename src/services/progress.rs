use std::collections::HashMap;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;

use crate::db::models::{Assignment, AssignmentStatus, CheckMode, Class, Homework, Student};
use crate::db::Db;
use crate::models::sanitize;
use crate::names::{UNKNOWN_HOMEWORK, UNKNOWN_STUDENT};

#[cfg_attr(test, mockall::automock)]
pub trait ProgressRepository: Send + Sync {
    fn find_owned_class(
        &self,
        class_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Class>>> + Send;

    fn class_assignments(
        &self,
        class_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Assignment>>> + Send;

    fn homeworks_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Homework>>> + Send;

    fn students_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Student>>> + Send;
}

impl ProgressRepository for Db {
    fn find_owned_class(
        &self,
        class_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Class>>> + Send {
        Db::find_owned_class(self, class_id, teacher_id)
    }

    fn class_assignments(
        &self,
        class_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Assignment>>> + Send {
        Db::class_assignments(self, class_id, teacher_id)
    }

    fn homeworks_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Homework>>> + Send {
        Db::homeworks_by_ids(self, ids)
    }

    fn students_by_ids(
        &self,
        ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<Student>>> + Send {
        Db::students_by_ids(self, ids)
    }
}

/// One assigned homework in a class, with fan-out and completion counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeworkSummary {
    pub homework_id: i64,
    pub name: String,
    pub subject: String,
    pub score: i64,
    pub exercise_type: String,
    pub bloom_taxonomy: String,
    pub assigned_at: DateTime<Utc>,
    pub check_mode: CheckMode,
    pub student_count: usize,
    pub completed_count: usize,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProgress {
    pub active_id: i64,
    pub status: AssignmentStatus,
    pub check_mode: CheckMode,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub student: Student,
}

/// Accumulator for the rows of one homework id, in first-seen order.
struct Group<'a> {
    homework_id: i64,
    first: &'a Assignment,
    student_count: usize,
    completed_count: usize,
}

pub struct ProgressService<R: ProgressRepository = Db> {
    repo: R,
}

impl<R: ProgressRepository + Clone> Clone for ProgressService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: ProgressRepository> ProgressService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// `None` when the class does not exist or belongs to someone else.
    pub async fn summarize_class_assignments(
        &self,
        teacher_id: i64,
        class_id: i64,
    ) -> Result<Option<Vec<HomeworkSummary>>> {
        if self.repo.find_owned_class(class_id, teacher_id).await?.is_none() {
            return Ok(None);
        }

        let assignments = self.repo.class_assignments(class_id, teacher_id).await?;
        let groups = group_by_homework(&assignments);
        if groups.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let ids: Vec<i64> = groups.iter().map(|g| g.homework_id).collect();
        let templates: HashMap<i64, Homework> = self
            .repo
            .homeworks_by_ids(&ids)
            .await?
            .into_iter()
            .map(|h| (h.id, h))
            .collect();

        let summaries = groups
            .into_iter()
            .map(|group| {
                let template = templates.get(&group.homework_id);
                summarize(group, template)
            })
            .collect();

        Ok(Some(summaries))
    }

    /// Every assignment row of `(class_id, homework_id)` exactly once, with the
    /// student joined in. Rows whose student is gone get a placeholder.
    pub async fn detail_class_homework_progress(
        &self,
        teacher_id: i64,
        class_id: i64,
        homework_id: i64,
    ) -> Result<Option<Vec<StudentProgress>>> {
        if self.repo.find_owned_class(class_id, teacher_id).await?.is_none() {
            return Ok(None);
        }

        let rows: Vec<Assignment> = self
            .repo
            .class_assignments(class_id, teacher_id)
            .await?
            .into_iter()
            .filter(|a| a.homework_id() == Some(homework_id))
            .collect();

        let mut student_ids: Vec<i64> = rows.iter().map(|a| a.student_id).collect();
        student_ids.sort_unstable();
        student_ids.dedup();

        let students: HashMap<i64, Student> = self
            .repo
            .students_by_ids(&student_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let progress = rows
            .into_iter()
            .map(|a| {
                let student = students
                    .get(&a.student_id)
                    .cloned()
                    .unwrap_or_else(|| placeholder_student(a.student_id));
                StudentProgress {
                    active_id: a.id,
                    status: a.status,
                    check_mode: a.check_mode,
                    assigned_at: a.assigned_at,
                    completed_at: a.completed_at,
                    student,
                }
            })
            .collect();

        Ok(Some(progress))
    }
}

/// Rows with an unreadable homework reference are skipped.
fn group_by_homework(assignments: &[Assignment]) -> Vec<Group<'_>> {
    let mut groups: Vec<Group<'_>> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for assignment in assignments {
        let Some(homework_id) = assignment.homework_id() else {
            tracing::warn!("active id={} has no readable homework reference", assignment.id);
            continue;
        };
        let slot = *index.entry(homework_id).or_insert_with(|| {
            groups.push(Group {
                homework_id,
                first: assignment,
                student_count: 0,
                completed_count: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.student_count += 1;
        if assignment.status.is_done() {
            group.completed_count += 1;
        }
    }

    groups
}

fn summarize(group: Group<'_>, template: Option<&Homework>) -> HomeworkSummary {
    let snapshot = group.first.homework.as_ref().and_then(|h| h.snapshot());

    let name = template
        .map(|h| h.name.clone())
        .or_else(|| snapshot.map(|s| s.name.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| UNKNOWN_HOMEWORK.to_string());
    let subject = template
        .map(|h| h.subject.clone())
        .or_else(|| snapshot.map(|s| s.subject.clone()))
        .unwrap_or_default();
    let score = template
        .map(|h| h.score)
        .or_else(|| snapshot.map(|s| s.score))
        .unwrap_or(0);
    let content = snapshot
        .map(|s| s.content.clone())
        .or_else(|| template.map(|h| sanitize(&h.content)))
        .unwrap_or(Value::Null);

    HomeworkSummary {
        homework_id: group.homework_id,
        name,
        subject,
        score,
        exercise_type: template.map(|h| h.exercise_type.clone()).unwrap_or_default(),
        bloom_taxonomy: template.map(|h| h.bloom_taxonomy.clone()).unwrap_or_default(),
        assigned_at: group.first.assigned_at,
        check_mode: group.first.check_mode,
        student_count: group.student_count,
        completed_count: group.completed_count,
        content,
    }
}

fn placeholder_student(id: i64) -> Student {
    Student {
        id,
        full_name: UNKNOWN_STUDENT.to_string(),
        email: String::new(),
        username: String::new(),
        gender: String::new(),
        age: 0,
    }
}
