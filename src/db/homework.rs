use chrono::Utc;
use color_eyre::{eyre::OptionExt, Result};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};

use super::helpers::push_in_list;
use super::models::{Homework, HomeworkRow, NewHomework};
use super::Db;
use crate::models::total_score;

const HOMEWORK_COLUMNS: &str =
    "id, name, subject, teacher_email, bloom_taxonomy, exercise_type, score, content, created_at";

impl Db {
    /// The stored score is always the sum of the question scores.
    pub async fn create_homework(&self, homework: NewHomework, teacher_email: &str) -> Result<Homework> {
        let score = total_score(&homework.content).ok_or_eyre("homework score overflows")?;

        let row = sqlx::query_as::<_, HomeworkRow>(&format!(
            r#"
            INSERT INTO homework (name, subject, teacher_email, bloom_taxonomy, exercise_type, score, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {HOMEWORK_COLUMNS}
            "#
        ))
        .bind(&homework.name)
        .bind(&homework.subject)
        .bind(teacher_email)
        .bind(homework.bloom_taxonomy.join(","))
        .bind(&homework.exercise_type)
        .bind(score)
        .bind(serde_json::to_string(&homework.content)?)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("homework created id={} by {teacher_email}", row.id);
        Ok(row.into())
    }

    pub async fn homeworks(&self, teacher_email: &str) -> Result<Vec<Homework>> {
        let rows = sqlx::query_as::<_, HomeworkRow>(&format!(
            "SELECT {HOMEWORK_COLUMNS} FROM homework WHERE teacher_email = ? ORDER BY id DESC"
        ))
        .bind(teacher_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Homework::from).collect())
    }

    pub async fn find_owned_homework(
        &self,
        homework_id: i64,
        teacher_email: &str,
    ) -> Result<Option<Homework>> {
        let row = sqlx::query_as::<_, HomeworkRow>(&format!(
            "SELECT {HOMEWORK_COLUMNS} FROM homework WHERE id = ? AND teacher_email = ?"
        ))
        .bind(homework_id)
        .bind(teacher_email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Homework::from))
    }

    pub async fn homeworks_by_ids(&self, ids: &[i64]) -> Result<Vec<Homework>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {HOMEWORK_COLUMNS} FROM homework WHERE id"));
        push_in_list(&mut qb, ids);

        let rows = qb.build_query_as::<HomeworkRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Homework::from).collect())
    }

    /// Replace the content and recompute the score. Returns the new total, or
    /// `None` when the homework is not owned by the teacher.
    pub async fn update_homework_content(
        &self,
        homework_id: i64,
        content: &Value,
        teacher_email: &str,
    ) -> Result<Option<i64>> {
        let score = total_score(content).ok_or_eyre("homework score overflows")?;

        let result = sqlx::query(
            "UPDATE homework SET content = ?, score = ? WHERE id = ? AND teacher_email = ?",
        )
        .bind(serde_json::to_string(content)?)
        .bind(score)
        .bind(homework_id)
        .bind(teacher_email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        tracing::info!("homework id={homework_id} content updated, score={score}");
        Ok(Some(score))
    }
}
