use chrono::{DateTime, Utc};
use color_eyre::Result;
use sqlx::{QueryBuilder, Sqlite};

use super::helpers::push_in_list;
use super::homework_ref::HOMEWORK_ID_SQL;
use super::models::{ActiveRow, Assignment, AssignmentStatus, NewAssignment};
use super::Db;

const ACTIVE_COLUMNS: &str =
    "id, class_id, student_id, teacher_id, homework, assigned_at, check_mode, status, completed_at";

impl Db {
    /// Whether `homework_id` is already assigned to the class, under either
    /// encoding of the reference.
    pub async fn assignment_exists(&self, class_id: i64, homework_id: i64) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM actives WHERE class_id = ? AND {HOMEWORK_ID_SQL} = ?)"
        ))
        .bind(class_id)
        .bind(homework_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    /// Insert every row in one statement. New rows start as `not_started`.
    pub async fn insert_assignments(&self, rows: &[NewAssignment]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO actives (class_id, student_id, teacher_id, homework, assigned_at, check_mode, status) ",
        );
        qb.push_values(rows, |mut b, row| {
            b.push_bind(row.class_id)
                .push_bind(row.student_id)
                .push_bind(row.teacher_id)
                .push_bind(row.homework.to_value().to_string())
                .push_bind(row.assigned_at)
                .push_bind(row.check_mode.as_str())
                .push_bind(AssignmentStatus::NotStarted.as_str().to_string());
        });

        let result = qb.build().execute(&self.pool).await?;

        tracing::info!("inserted {} assignment rows", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Remove every row of the class referencing the homework, whichever
    /// encoding it uses. History is left untouched.
    pub async fn delete_assignments(
        &self,
        class_id: i64,
        homework_id: i64,
        teacher_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query(&format!(
            "DELETE FROM actives WHERE class_id = ? AND teacher_id = ? AND {HOMEWORK_ID_SQL} = ?"
        ))
        .bind(class_id)
        .bind(teacher_id)
        .bind(homework_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "removed {} assignment rows of homework_id={homework_id} from class_id={class_id}",
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    pub async fn class_assignments(&self, class_id: i64, teacher_id: i64) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, ActiveRow>(&format!(
            "SELECT {ACTIVE_COLUMNS} FROM actives WHERE class_id = ? AND teacher_id = ? ORDER BY id"
        ))
        .bind(class_id)
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Assignment::from).collect())
    }

    pub async fn find_owned_assignment(
        &self,
        active_id: i64,
        teacher_id: i64,
    ) -> Result<Option<Assignment>> {
        let row = sqlx::query_as::<_, ActiveRow>(&format!(
            "SELECT {ACTIVE_COLUMNS} FROM actives WHERE id = ? AND teacher_id = ?"
        ))
        .bind(active_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Assignment::from))
    }

    pub async fn assignments_by_ids(&self, teacher_id: i64, ids: &[i64]) -> Result<Vec<Assignment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ACTIVE_COLUMNS} FROM actives WHERE teacher_id = "
        ));
        qb.push_bind(teacher_id).push(" AND id");
        push_in_list(&mut qb, ids);

        let rows = qb.build_query_as::<ActiveRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Assignment::from).collect())
    }

    /// Newest first by id. Both spellings of the finished state count.
    pub async fn recent_done_assignments(&self, teacher_id: i64, limit: i64) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, ActiveRow>(&format!(
            "SELECT {ACTIVE_COLUMNS} FROM actives WHERE teacher_id = ? AND status IN ('done', 'completed') ORDER BY id DESC LIMIT ?"
        ))
        .bind(teacher_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Assignment::from).collect())
    }

    /// Flip an owned, unfinished row to `done`. False when the row is missing,
    /// foreign, or already finished.
    pub async fn mark_assignment_done(
        &self,
        active_id: i64,
        teacher_id: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE actives SET status = ?, completed_at = ? \
             WHERE id = ? AND teacher_id = ? AND status NOT IN ('done', 'completed')",
        )
        .bind(AssignmentStatus::Done.as_str())
        .bind(completed_at)
        .bind(active_id)
        .bind(teacher_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
