use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{ok, require_text};
use crate::{
    db::{models::NewStudent, models::RosterStudent, CreateClassOutcome},
    extractors::AuthGuard,
    names,
    notify::Level,
    rejections::{AppError, ResultExt},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::CLASSES_URL, get(list_classes).post(create_class))
        .route("/classes/{class_id}/students", post(add_student_to_class))
        .route(names::STUDENTS_URL, post(create_student))
}

async fn list_classes(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let classes = state
        .db
        .classes(teacher.id)
        .await
        .reject("could not list classes")?;
    Ok(ok(classes))
}

#[derive(Deserialize)]
struct CreateClassPost {
    name: String,
    /// Object-store path, `{owner_id}/{timestamp}.{ext}`.
    #[serde(default)]
    banner_path: Option<String>,
}

async fn create_class(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Json(body): Json<CreateClassPost>,
) -> Result<impl IntoResponse, AppError> {
    let name = require_text(&body.name, "Class name")?;
    let banner_path = body.banner_path.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let outcome = state
        .db
        .create_class(&name, banner_path, teacher.id)
        .await
        .reject("could not create class")?;

    match outcome {
        CreateClassOutcome::Created(class) => {
            state
                .notifier
                .publish(teacher.id, Level::Success, format!("Class \"{}\" created.", class.name));
            Ok(ok(class))
        }
        CreateClassOutcome::NameTaken => {
            let message = format!("A class named \"{name}\" already exists.");
            state.notifier.publish(teacher.id, Level::Error, message.clone());
            Err(AppError::Conflict(message))
        }
    }
}

#[derive(Deserialize)]
struct AddStudentPost {
    student_id: i64,
}

async fn add_student_to_class(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
    Json(body): Json<AddStudentPost>,
) -> Result<impl IntoResponse, AppError> {
    let student = state
        .db
        .find_owned_student(body.student_id, teacher.id)
        .await
        .reject("could not load student")?
        .ok_or(AppError::NotFound("Student"))?;

    let added = state
        .db
        .add_student_to_class(
            class_id,
            RosterStudent {
                id: student.id,
                full_name: student.full_name,
                email: student.email,
            },
            teacher.id,
        )
        .await
        .reject("could not update roster")?;
    if !added {
        return Err(AppError::NotFound("Class"));
    }

    let class = state
        .db
        .find_owned_class(class_id, teacher.id)
        .await
        .reject("could not load class")?
        .ok_or(AppError::NotFound("Class"))?;
    Ok(ok(class))
}

async fn create_student(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Json(mut body): Json<NewStudent>,
) -> Result<impl IntoResponse, AppError> {
    body.full_name = require_text(&body.full_name, "Student name")?;
    body.email = body.email.trim().to_lowercase();
    if body.age < 0 {
        return Err(AppError::Input("Age must not be negative.".to_string()));
    }

    let student = state
        .db
        .create_student(&body, teacher.id)
        .await
        .reject("could not create student")?;
    Ok(ok(student))
}
