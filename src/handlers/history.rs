use axum::{extract::State, response::IntoResponse, routing::get, Router};

use super::ok;
use crate::{
    extractors::AuthGuard,
    names,
    rejections::{AppError, ResultExt},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(names::HISTORY_URL, get(activity_feed))
}

async fn activity_feed(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let feed = state
        .history
        .list_completed_activities(teacher.id)
        .await
        .reject("could not load activity history")?;
    Ok(ok(feed))
}
