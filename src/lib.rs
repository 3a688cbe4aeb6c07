pub mod db;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod names;
pub mod notify;
pub mod rejections;
pub mod services;
pub mod utils;

use axum::{middleware, Router};

use crate::services::{
    assignment::AssignmentService,
    generator::{CompletionConfig, HttpCompletionClient, QuestionGenerator},
    history::HistoryService,
    progress::ProgressService,
};

/// Runtime settings that are not the database.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secure_cookies: bool,
    /// Shared with the external auth provider; sign-in is disabled without it.
    pub auth_callback_secret: Option<String>,
    pub completion: CompletionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secure_cookies: false,
            auth_callback_secret: None,
            completion: CompletionConfig {
                api_url: "https://api.openai.com/v1/chat/completions".to_string(),
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                temperature: 0.7,
                max_tokens: 4000,
            },
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: db::Db,
    pub assignments: AssignmentService,
    pub progress: ProgressService,
    pub history: HistoryService,
    pub generator: QuestionGenerator,
    pub notifier: notify::Notifier,
    pub secure_cookies: bool,
    pub auth_callback_secret: Option<String>,
}

impl AppState {
    pub fn new(db: db::Db, config: AppConfig) -> Self {
        Self {
            assignments: AssignmentService::new(db.clone()),
            progress: ProgressService::new(db.clone()),
            history: HistoryService::new(db.clone()),
            generator: QuestionGenerator::new(HttpCompletionClient::new(config.completion)),
            notifier: notify::Notifier::new(),
            secure_cookies: config.secure_cookies,
            auth_callback_secret: config.auth_callback_secret,
            db,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::session::routes())
        .merge(handlers::classes::routes())
        .merge(handlers::homework::routes())
        .merge(handlers::assignments::routes())
        .merge(handlers::history::routes())
        .merge(handlers::system::routes())
        .layer(middleware::from_fn(csrf_check))
        .with_state(state)
}

/// State-changing requests must be something a plain cross-site form cannot
/// send: a JSON body, a bearer token, or an `X-Requested-With` header.
async fn csrf_check(
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    use axum::http::{header, Method};
    use axum::response::IntoResponse;

    let state_changing = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

    if state_changing.contains(req.method()) {
        let headers = req.headers();
        let is_json = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let has_bearer = headers.contains_key(header::AUTHORIZATION);
        let has_xrw = headers.contains_key("X-Requested-With");

        if !(is_json || has_bearer || has_xrw) {
            return rejections::AppError::Forbidden.into_response();
        }
    }

    next.run(req).await
}
