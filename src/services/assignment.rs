use std::collections::HashSet;

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::db::models::{
    Assignment, CheckMode, Class, Homework, NewAssignment, NewHistory, Teacher,
};
use crate::db::{Db, HomeworkRef, HomeworkSnapshot};
use crate::models::sanitize;

// ---------------------------------------------------------------------------
// AssignmentRepository trait
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait AssignmentRepository: Send + Sync {
    fn find_owned_homework(
        &self,
        homework_id: i64,
        teacher_email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Homework>>> + Send;

    fn find_owned_class(
        &self,
        class_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Class>>> + Send;

    fn assignment_exists(
        &self,
        class_id: i64,
        homework_id: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn insert_assignments(
        &self,
        rows: &[NewAssignment],
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    fn delete_assignments(
        &self,
        class_id: i64,
        homework_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    fn find_owned_assignment(
        &self,
        active_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Assignment>>> + Send;

    fn mark_assignment_done(
        &self,
        active_id: i64,
        teacher_id: i64,
        completed_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn append_history(
        &self,
        entry: &NewHistory,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;
}

impl AssignmentRepository for Db {
    fn find_owned_homework(
        &self,
        homework_id: i64,
        teacher_email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Homework>>> + Send {
        Db::find_owned_homework(self, homework_id, teacher_email)
    }

    fn find_owned_class(
        &self,
        class_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Class>>> + Send {
        Db::find_owned_class(self, class_id, teacher_id)
    }

    fn assignment_exists(
        &self,
        class_id: i64,
        homework_id: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send {
        Db::assignment_exists(self, class_id, homework_id)
    }

    fn insert_assignments(
        &self,
        rows: &[NewAssignment],
    ) -> impl std::future::Future<Output = Result<u64>> + Send {
        Db::insert_assignments(self, rows)
    }

    fn delete_assignments(
        &self,
        class_id: i64,
        homework_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<u64>> + Send {
        Db::delete_assignments(self, class_id, homework_id, teacher_id)
    }

    fn find_owned_assignment(
        &self,
        active_id: i64,
        teacher_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Assignment>>> + Send {
        Db::find_owned_assignment(self, active_id, teacher_id)
    }

    fn mark_assignment_done(
        &self,
        active_id: i64,
        teacher_id: i64,
        completed_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send {
        Db::mark_assignment_done(self, active_id, teacher_id, completed_at)
    }

    fn append_history(
        &self,
        entry: &NewHistory,
    ) -> impl std::future::Future<Output = Result<i64>> + Send {
        Db::append_history(self, entry)
    }
}

// ---------------------------------------------------------------------------
// Outcome enums
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub enum AssignOutcome {
    Assigned {
        student_count: usize,
        homework_name: String,
    },
    HomeworkNotFound,
    ClassNotFound,
    EmptyRoster,
    AlreadyAssigned,
}

#[derive(Debug, PartialEq)]
pub enum UnassignOutcome {
    Removed(u64),
    ClassNotFound,
}

#[derive(Debug, PartialEq)]
pub enum CompleteOutcome {
    Completed,
    AlreadyDone,
    NotFound,
}

// ---------------------------------------------------------------------------
// AssignmentService
// ---------------------------------------------------------------------------

pub struct AssignmentService<R: AssignmentRepository = Db> {
    repo: R,
}

impl<R: AssignmentRepository + Clone> Clone for AssignmentService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: AssignmentRepository> AssignmentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Assign a homework template to every student on the class roster.
    ///
    /// The duplicate check and the insert are two separate statements, so two
    /// concurrent calls for the same pair can both get through.
    pub async fn assign(
        &self,
        teacher: &Teacher,
        homework_id: i64,
        class_id: i64,
        check_mode: CheckMode,
    ) -> Result<AssignOutcome> {
        let Some(homework) = self
            .repo
            .find_owned_homework(homework_id, &teacher.email)
            .await?
        else {
            return Ok(AssignOutcome::HomeworkNotFound);
        };

        let Some(class) = self.repo.find_owned_class(class_id, teacher.id).await? else {
            return Ok(AssignOutcome::ClassNotFound);
        };

        if class.roster.is_empty() {
            return Ok(AssignOutcome::EmptyRoster);
        }

        if self.repo.assignment_exists(class_id, homework_id).await? {
            return Ok(AssignOutcome::AlreadyAssigned);
        }

        let rows = fan_out(&homework, &class, teacher.id, check_mode, Utc::now());
        self.repo.insert_assignments(&rows).await?;

        tracing::info!(
            "homework_id={homework_id} assigned to class_id={class_id} ({} students)",
            rows.len()
        );

        Ok(AssignOutcome::Assigned {
            student_count: rows.len(),
            homework_name: homework.name,
        })
    }

    pub async fn unassign(
        &self,
        teacher: &Teacher,
        class_id: i64,
        homework_id: i64,
    ) -> Result<UnassignOutcome> {
        if self
            .repo
            .find_owned_class(class_id, teacher.id)
            .await?
            .is_none()
        {
            return Ok(UnassignOutcome::ClassNotFound);
        }

        let removed = self
            .repo
            .delete_assignments(class_id, homework_id, teacher.id)
            .await?;

        Ok(UnassignOutcome::Removed(removed))
    }

    /// Mark one assignment done and append it to the history table.
    pub async fn complete(&self, teacher: &Teacher, active_id: i64) -> Result<CompleteOutcome> {
        let Some(assignment) = self
            .repo
            .find_owned_assignment(active_id, teacher.id)
            .await?
        else {
            return Ok(CompleteOutcome::NotFound);
        };

        if assignment.status.is_done() {
            return Ok(CompleteOutcome::AlreadyDone);
        }

        // the update only applies to rows not yet done; losing a race with
        // another completion leaves nothing to record
        let now = Utc::now();
        if !self
            .repo
            .mark_assignment_done(active_id, teacher.id, now)
            .await?
        {
            return Ok(CompleteOutcome::AlreadyDone);
        }

        self.repo
            .append_history(&NewHistory {
                active_id,
                class_id: assignment.class_id,
                student: assignment.student_id.to_string(),
                teacher_id: teacher.id,
                completed_at: now,
            })
            .await?;

        Ok(CompleteOutcome::Completed)
    }
}

/// One row per distinct roster student, all sharing the same answer-free
/// snapshot and timestamp.
pub fn fan_out(
    homework: &Homework,
    class: &Class,
    teacher_id: i64,
    check_mode: CheckMode,
    assigned_at: DateTime<Utc>,
) -> Vec<NewAssignment> {
    let snapshot = HomeworkRef::Snapshot(HomeworkSnapshot {
        id: homework.id,
        name: homework.name.clone(),
        subject: homework.subject.clone(),
        score: homework.score,
        content: sanitize(&homework.content),
    });

    let mut seen = HashSet::new();
    class
        .roster
        .iter()
        .filter(|student| seen.insert(student.id))
        .map(|student| NewAssignment {
            class_id: class.id,
            student_id: student.id,
            teacher_id,
            homework: snapshot.clone(),
            assigned_at,
            check_mode,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
