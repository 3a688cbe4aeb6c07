use color_eyre::Result;

use super::models::{HistoryRecord, NewHistory};
use super::Db;

impl Db {
    pub async fn append_history(&self, entry: &NewHistory) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO history (active_id, class_id, student, teacher_id, completed_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(entry.active_id)
        .bind(entry.class_id)
        .bind(&entry.student)
        .bind(entry.teacher_id)
        .bind(entry.completed_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            "history id={id} recorded for active_id={} student={}",
            entry.active_id,
            entry.student
        );
        Ok(id)
    }

    /// Newest first.
    pub async fn recent_history(&self, teacher_id: i64, limit: i64) -> Result<Vec<HistoryRecord>> {
        let records = sqlx::query_as::<_, HistoryRecord>(
            r#"
            SELECT id, active_id, class_id, student, teacher_id, completed_at
            FROM history
            WHERE teacher_id = ?
            ORDER BY completed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(teacher_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn history_count(&self, teacher_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history WHERE teacher_id = ?")
            .bind(teacher_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
