use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ok, require_text};
use crate::{
    db::models::{Homework, NewHomework},
    extractors::AuthGuard,
    models::{set_question_score, total_score, validate_content},
    names,
    notify::Level,
    rejections::{AppError, ResultExt},
    services::generator::GenerateRequest,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::HOMEWORK_URL, get(list_homework).post(create_homework))
        .route(names::GENERATE_HOMEWORK_URL, post(create_generated_homework))
        .route(
            "/homework/{homework_id}/questions/{index}/score",
            patch(update_question_score),
        )
        .route("/homework/{homework_id}/content", put(update_homework_content))
}

async fn list_homework(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let homework = state
        .db
        .homeworks(&teacher.email)
        .await
        .reject("could not list homework")?;
    Ok(ok(homework))
}

fn score_too_large() -> AppError {
    AppError::Input("Question scores add up to more than the maximum total.".to_string())
}

/// Rejects documents without the content shape, with a question worth
/// nothing, or whose total does not fit.
fn check_content(content: &Value) -> Result<(), AppError> {
    let parsed = validate_content(content).reject_input("invalid homework content")?;
    if let Some(i) = parsed.questions.iter().position(|q| q.score <= 0) {
        return Err(AppError::Input(format!(
            "Question {} must be worth at least one point.",
            i + 1
        )));
    }
    parsed.total_score().ok_or_else(score_too_large)?;
    Ok(())
}

#[derive(Deserialize)]
struct CreateHomeworkPost {
    name: String,
    subject: String,
    #[serde(default)]
    bloom_taxonomy: Vec<String>,
    #[serde(default)]
    exercise_type: String,
    content: Value,
}

async fn create_homework(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Json(body): Json<CreateHomeworkPost>,
) -> Result<impl IntoResponse, AppError> {
    let name = require_text(&body.name, "Homework name")?;
    check_content(&body.content)?;

    let homework = state
        .db
        .create_homework(
            NewHomework {
                name,
                subject: body.subject.trim().to_string(),
                bloom_taxonomy: body.bloom_taxonomy,
                exercise_type: body.exercise_type,
                content: body.content,
            },
            &teacher.email,
        )
        .await
        .reject("could not create homework")?;
    Ok(ok(homework))
}

#[derive(Serialize)]
struct GeneratedHomeworkCreated {
    homework: Homework,
    is_placeholder: bool,
}

/// Generate questions and store them as a new homework template.
async fn create_generated_homework(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_text(&req.subject, "Subject")?;
    require_text(&req.topic, "Topic")?;

    let generated = state.generator.generate(&req).await;
    if generated.is_placeholder {
        state.notifier.publish(
            teacher.id,
            Level::Info,
            "Question generation was unavailable; placeholder questions were created.",
        );
    }

    let homework = state
        .db
        .create_homework(
            NewHomework {
                name: req.homework_name(),
                subject: req.subject.trim().to_string(),
                bloom_taxonomy: req.bloom_levels.clone(),
                exercise_type: req.exercise_type.clone(),
                content: generated.content.into_value(),
            },
            &teacher.email,
        )
        .await
        .reject("could not store generated homework")?;

    Ok(ok(GeneratedHomeworkCreated {
        homework,
        is_placeholder: generated.is_placeholder,
    }))
}

#[derive(Serialize)]
struct ScoreUpdated {
    homework_id: i64,
    score: i64,
}

#[derive(Deserialize)]
struct QuestionScorePatch {
    score: i64,
}

async fn update_question_score(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path((homework_id, index)): Path<(i64, usize)>,
    Json(body): Json<QuestionScorePatch>,
) -> Result<impl IntoResponse, AppError> {
    if body.score <= 0 {
        return Err(AppError::Input("Score must be at least one point.".to_string()));
    }

    let homework = state
        .db
        .find_owned_homework(homework_id, &teacher.email)
        .await
        .reject("could not load homework")?
        .ok_or(AppError::NotFound("Homework"))?;

    let mut content = homework.content;
    if !set_question_score(&mut content, index, body.score) {
        return Err(AppError::NotFound("Question"));
    }
    total_score(&content).ok_or_else(score_too_large)?;

    let score = state
        .db
        .update_homework_content(homework_id, &content, &teacher.email)
        .await
        .reject("could not update question score")?
        .ok_or(AppError::NotFound("Homework"))?;

    Ok(ok(ScoreUpdated { homework_id, score }))
}

#[derive(Deserialize)]
struct ContentPut {
    content: Value,
}

async fn update_homework_content(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
    Path(homework_id): Path<i64>,
    Json(body): Json<ContentPut>,
) -> Result<impl IntoResponse, AppError> {
    check_content(&body.content)?;

    let score = state
        .db
        .update_homework_content(homework_id, &body.content, &teacher.email)
        .await
        .reject("could not update homework content")?
        .ok_or(AppError::NotFound("Homework"))?;

    state
        .notifier
        .publish(teacher.id, Level::Success, "Homework updated.");
    Ok(ok(ScoreUpdated { homework_id, score }))
}
