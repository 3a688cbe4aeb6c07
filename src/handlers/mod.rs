pub mod assignments;
pub mod classes;
pub mod history;
pub mod homework;
pub mod session;
pub mod system;

use axum::Json;
use serde::Serialize;

/// Success envelope: `{ "ok": true, "data": ... }`. Errors use the matching
/// `{ "ok": false, "error": ... }` shape from `AppError`.
#[derive(Debug, Serialize)]
pub struct Okay<T> {
    ok: bool,
    data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Okay<T>> {
    Json(Okay { ok: true, data })
}

pub(crate) fn require_text(value: &str, what: &'static str) -> Result<String, crate::rejections::AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::rejections::AppError::Input(format!("{what} must not be empty.")));
    }
    Ok(trimmed.to_string())
}
