use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use super::ok;
use crate::{extractors::AuthGuard, names, notify::Notification, utils, AppState};

const NOTIFICATION_POLL_TIMEOUT: Duration = Duration::from_secs(25);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::HEALTH_URL, get(health))
        .route(names::NOTIFICATIONS_URL, get(next_notification))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    ok(Health {
        status: "ok",
        version: utils::VERSION,
    })
}

/// Long poll: the next notification for the signed-in teacher, or `null` on
/// timeout.
async fn next_notification(
    AuthGuard(teacher): AuthGuard,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let mut rx = state.notifier.subscribe();

    let wait = async {
        loop {
            match rx.recv().await {
                Ok(n) if n.teacher_id == teacher.id => return Some(n),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("notification poll lagged by {skipped} messages");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    };

    let next: Option<Notification> = tokio::time::timeout(NOTIFICATION_POLL_TIMEOUT, wait)
        .await
        .unwrap_or(None);
    ok(next)
}
