use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{ok, require_text};
use crate::{
    db::models::Teacher,
    extractors::{session_token, AuthGuard},
    names,
    rejections::{AppError, ResultExt},
    utils, AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(
        names::SESSION_URL,
        post(provider_callback).get(current_teacher).delete(logout),
    )
}

#[derive(Deserialize)]
struct ProviderCallback {
    email: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Serialize)]
struct SessionCreated {
    teacher: Teacher,
    token: String,
}

/// Called by the external auth provider once it has verified the teacher.
/// Creates the teacher on first sign-in and opens a session.
async fn provider_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ProviderCallback>,
) -> Result<impl IntoResponse, AppError> {
    let Some(expected) = state.auth_callback_secret.as_deref() else {
        return Err(AppError::Forbidden);
    };
    let presented = headers
        .get(names::AUTH_CALLBACK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        return Err(AppError::Forbidden);
    }

    let email = require_text(&body.email, "Email")?.to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Input("Email is not valid.".to_string()));
    }
    let display_name = match body.display_name.trim() {
        "" => email.split('@').next().unwrap_or_default().to_string(),
        name => name.to_string(),
    };

    let teacher = state
        .db
        .ensure_teacher(&email, &display_name)
        .await
        .reject("could not create teacher")?;
    let token = state
        .db
        .create_teacher_session(teacher.id)
        .await
        .reject("could not create session")?;

    let cookie = utils::cookie(names::SESSION_COOKIE_NAME, &token, state.secure_cookies)
        .reject("could not build session cookie")?;

    Ok(([(SET_COOKIE, cookie)], ok(SessionCreated { teacher, token })))
}

async fn current_teacher(AuthGuard(teacher): AuthGuard) -> impl IntoResponse {
    ok(teacher)
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.db.delete_teacher_session(&token).await {
            tracing::warn!("could not delete session: {e}");
        }
    }

    let cleared = utils::clear_cookie(names::SESSION_COOKIE_NAME, state.secure_cookies)
        .reject("could not build clear cookie")?;

    Ok(([(SET_COOKIE, cleared)], ok(())))
}
