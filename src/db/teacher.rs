use chrono::Utc;
use color_eyre::Result;
use ulid::Ulid;

use super::models::Teacher;
use super::Db;

impl Db {
    /// Create the teacher on first sign-in, or return the existing record.
    /// Called from the auth provider callback; the display name is only
    /// written on creation.
    pub async fn ensure_teacher(&self, email: &str, display_name: &str) -> Result<Teacher> {
        sqlx::query(
            "INSERT INTO teachers (email, display_name, created_at) VALUES (?, ?, ?) ON CONFLICT(email) DO NOTHING",
        )
        .bind(email)
        .bind(display_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let teacher = sqlx::query_as::<_, Teacher>(
            "SELECT id, email, display_name FROM teachers WHERE email = ?",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(teacher)
    }

    pub async fn create_teacher_session(&self, teacher_id: i64) -> Result<String> {
        let session = Ulid::new().to_string();

        sqlx::query("INSERT INTO teacher_sessions (id, teacher_id) VALUES (?, ?)")
            .bind(&session)
            .bind(teacher_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("new session created for teacher_id={teacher_id}");
        Ok(session)
    }

    pub async fn get_teacher_by_session(&self, session_id: &str) -> Result<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(
            r#"
            SELECT t.id, t.email, t.display_name
            FROM teacher_sessions s
            JOIN teachers t ON t.id = s.teacher_id
            WHERE s.id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(teacher)
    }

    pub async fn delete_teacher_session(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM teacher_sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
