use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

use crate::{db::models::Teacher, names, rejections::AppError, AppState};

/// Session token from the `Authorization: Bearer` header, else the session
/// cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(names::SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string())
    })
}

/// Guard extractor that resolves the session against the database.
/// Carries the signed-in teacher; every query downstream is scoped by it.
pub struct AuthGuard(pub Teacher);

impl FromRequestParts<AppState> for AuthGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Err(AppError::Unauthorized);
        };

        match state.db.get_teacher_by_session(&token).await {
            Ok(Some(teacher)) => Ok(AuthGuard(teacher)),
            Ok(None) => Err(AppError::Unauthorized),
            Err(e) => {
                tracing::warn!("session lookup failed: {e}");
                Err(AppError::Unauthorized)
            }
        }
    }
}
