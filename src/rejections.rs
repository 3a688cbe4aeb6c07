use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use color_eyre::Report;
use serde::Serialize;

#[derive(Debug, PartialEq)]
pub enum AppError {
    Unauthorized,
    Forbidden,
    NotFound(&'static str),
    Conflict(String),
    Input(String),
    Store(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Input(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Input(_) => "INPUT_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized => "Not signed in.".to_string(),
            Self::Forbidden => "Not allowed.".to_string(),
            Self::NotFound(what) => format!("{what} not found."),
            Self::Conflict(msg) | Self::Input(msg) | Self::Store(msg) | Self::Internal(msg) => {
                msg.clone()
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            error: ErrorDetail {
                code: self.code(),
                message: self.message(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

pub trait ResultExt<T> {
    /// Unexpected failure: logged, then surfaced as a store or internal error.
    fn reject(self, context: &'static str) -> Result<T, AppError>;

    /// Bad request data.
    fn reject_input(self, context: &'static str) -> Result<T, AppError>;
}

impl<T, E: Into<Report>> ResultExt<T> for Result<T, E> {
    fn reject(self, context: &'static str) -> Result<T, AppError> {
        self.map_err(|e| {
            let report: Report = e.into();
            tracing::error!("{context}: {report:?}");
            match report.downcast_ref::<sqlx::Error>() {
                Some(db) => AppError::Store(humanize_store_error(&db.to_string())),
                None => AppError::Internal(format!("server-side error: {report}")),
            }
        })
    }

    fn reject_input(self, context: &'static str) -> Result<T, AppError> {
        self.map_err(|e| {
            let report: Report = e.into();
            tracing::warn!("{context}: {report}");
            AppError::Input(format!("{context}: {report}"))
        })
    }
}

/// Raw store message fragment, and what the teacher is told instead.
const STORE_ERROR_MESSAGES: &[(&str, &str)] = &[
    (
        "UNIQUE constraint failed: classs.name",
        "A class with this name already exists.",
    ),
    (
        "UNIQUE constraint failed: teachers.email",
        "An account with this email already exists.",
    ),
    (
        "FOREIGN KEY constraint failed",
        "The record refers to something that no longer exists.",
    ),
    (
        "NOT NULL constraint failed",
        "A required field is missing.",
    ),
    ("database is locked", "The database is busy, try again."),
    ("no such table", "The database is not set up yet."),
    ("pool timed out", "The database is not reachable right now."),
];

pub fn humanize_store_error(raw: &str) -> String {
    STORE_ERROR_MESSAGES
        .iter()
        .find(|(needle, _)| raw.contains(needle))
        .map(|(_, message)| (*message).to_string())
        .unwrap_or_else(|| format!("Database error: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_store_errors_are_translated() {
        assert_eq!(
            humanize_store_error(
                "error returned from database: (code: 2067) UNIQUE constraint failed: classs.name"
            ),
            "A class with this name already exists."
        );
        assert_eq!(
            humanize_store_error("database is locked"),
            "The database is busy, try again."
        );
    }

    #[test]
    fn unknown_store_errors_keep_the_raw_message() {
        assert_eq!(
            humanize_store_error("disk I/O error"),
            "Database error: disk I/O error"
        );
    }

    #[test]
    fn non_store_errors_become_internal() {
        let result: color_eyre::Result<()> = Err(color_eyre::eyre::eyre!("boom"));
        assert_eq!(
            result.reject("doing things"),
            Err(AppError::Internal("server-side error: boom".to_string()))
        );
    }

    #[test]
    fn store_errors_are_humanized() {
        let result: Result<(), sqlx::Error> = Err(sqlx::Error::PoolTimedOut);
        assert_eq!(
            result.reject("listing classes"),
            Err(AppError::Store(
                "The database is not reachable right now.".to_string()
            ))
        );
    }

    #[test]
    fn input_errors_carry_context() {
        let parsed = serde_json::from_str::<serde_json::Value>("{");
        let err = parsed.reject_input("invalid content").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().starts_with("invalid content: "));
    }
}
