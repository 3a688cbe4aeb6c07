use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ok;
use crate::{
    db::models::CheckMode,
    extractors::AuthGuard,
    notify::Level,
    rejections::{AppError, ResultExt},
    services::assignment::{AssignOutcome, CompleteOutcome, UnassignOutcome},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/classes/{class_id}/homework", get(class_homework))
        .route(
            "/classes/{class_id}/homework/{homework_id}",
            post(assign).delete(unassign),
        )
        .route(
            "/classes/{class_id}/homework/{homework_id}/progress",
            get(homework_progress),
        )
        .route("/actives/{active_id}/complete", post(complete))
}

#[derive(Deserialize, Default)]
struct AssignPost {
    #[serde(default)]
    check_mode: CheckMode,
}

#[derive(Serialize)]
struct Assigned {
    student_count: usize,
    homework_name: String,
}

async fn assign(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path((class_id, homework_id)): Path<(i64, i64)>,
    body: Option<Json<AssignPost>>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.unwrap_or_default();

    let outcome = state
        .assignments
        .assign(&teacher, homework_id, class_id, body.check_mode)
        .await
        .reject("could not assign homework")?;

    let result = match outcome {
        AssignOutcome::Assigned {
            student_count,
            homework_name,
        } => {
            state.notifier.publish(
                teacher.id,
                Level::Success,
                format!("\"{homework_name}\" assigned to {student_count} students."),
            );
            return Ok(ok(Assigned {
                student_count,
                homework_name,
            }));
        }
        AssignOutcome::HomeworkNotFound => AppError::NotFound("Homework"),
        AssignOutcome::ClassNotFound => AppError::NotFound("Class"),
        AssignOutcome::EmptyRoster => {
            AppError::Input("The class has no students to assign to.".to_string())
        }
        AssignOutcome::AlreadyAssigned => {
            AppError::Conflict("This homework is already assigned to the class.".to_string())
        }
    };

    state
        .notifier
        .publish(teacher.id, Level::Error, result.message());
    Err(result)
}

#[derive(Serialize)]
struct Unassigned {
    removed: u64,
}

/// Completion history of the removed rows is kept.
async fn unassign(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path((class_id, homework_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .assignments
        .unassign(&teacher, class_id, homework_id)
        .await
        .reject("could not unassign homework")?;

    match outcome {
        UnassignOutcome::Removed(removed) => {
            state.notifier.publish(
                teacher.id,
                Level::Success,
                format!("Homework removed from {removed} students."),
            );
            Ok(ok(Unassigned { removed }))
        }
        UnassignOutcome::ClassNotFound => Err(AppError::NotFound("Class")),
    }
}

async fn class_homework(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let summaries = state
        .progress
        .summarize_class_assignments(teacher.id, class_id)
        .await
        .reject("could not summarize class homework")?
        .ok_or(AppError::NotFound("Class"))?;
    Ok(ok(summaries))
}

async fn homework_progress(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path((class_id, homework_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state
        .progress
        .detail_class_homework_progress(teacher.id, class_id, homework_id)
        .await
        .reject("could not load homework progress")?
        .ok_or(AppError::NotFound("Class"))?;
    Ok(ok(progress))
}

async fn complete(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path(active_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .assignments
        .complete(&teacher, active_id)
        .await
        .reject("could not complete assignment")?;

    match outcome {
        CompleteOutcome::Completed => Ok(ok(active_id)),
        CompleteOutcome::AlreadyDone => Err(AppError::Conflict(
            "This assignment is already done.".to_string(),
        )),
        CompleteOutcome::NotFound => Err(AppError::NotFound("Assignment")),
    }
}
