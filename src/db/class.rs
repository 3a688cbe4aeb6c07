use chrono::Utc;
use color_eyre::Result;
use sqlx::{QueryBuilder, Sqlite};

use super::helpers::{is_unique_violation, push_in_list};
use super::models::{Class, ClassRow, RosterStudent};
use super::Db;

const CLASS_COLUMNS: &str = "id, name, teacher_id, banner_path, students, created_at";

pub enum CreateClassOutcome {
    Created(Class),
    /// Class names are unique across all teachers.
    NameTaken,
}

impl Db {
    /// Single conditional insert; the unique index on `name` decides, so two
    /// concurrent creations cannot both succeed.
    pub async fn create_class(
        &self,
        name: &str,
        banner_path: Option<&str>,
        teacher_id: i64,
    ) -> Result<CreateClassOutcome> {
        let inserted = sqlx::query_as::<_, ClassRow>(&format!(
            "INSERT INTO classs (name, teacher_id, banner_path, students, created_at) VALUES (?, ?, ?, '[]', ?) RETURNING {CLASS_COLUMNS}"
        ))
        .bind(name)
        .bind(teacher_id)
        .bind(banner_path)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => {
                tracing::info!("class created id={} for teacher_id={teacher_id}", row.id);
                Ok(CreateClassOutcome::Created(row.into()))
            }
            Err(e) if is_unique_violation(&e) => Ok(CreateClassOutcome::NameTaken),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn classes(&self, teacher_id: i64) -> Result<Vec<Class>> {
        let rows = sqlx::query_as::<_, ClassRow>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classs WHERE teacher_id = ? ORDER BY id DESC"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Class::from).collect())
    }

    pub async fn find_owned_class(&self, class_id: i64, teacher_id: i64) -> Result<Option<Class>> {
        let row = sqlx::query_as::<_, ClassRow>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classs WHERE id = ? AND teacher_id = ?"
        ))
        .bind(class_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Class::from))
    }

    pub async fn classes_by_ids(&self, teacher_id: i64, ids: &[i64]) -> Result<Vec<Class>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {CLASS_COLUMNS} FROM classs WHERE teacher_id = "
        ));
        qb.push_bind(teacher_id).push(" AND id");
        push_in_list(&mut qb, ids);

        let rows = qb.build_query_as::<ClassRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Class::from).collect())
    }

    /// Returns false when the class is not owned by the teacher. Adding a
    /// student already on the roster is a no-op.
    pub async fn add_student_to_class(
        &self,
        class_id: i64,
        student: RosterStudent,
        teacher_id: i64,
    ) -> Result<bool> {
        let Some(class) = self.find_owned_class(class_id, teacher_id).await? else {
            return Ok(false);
        };

        let mut roster = class.roster;
        if roster.iter().any(|s| s.id == student.id) {
            return Ok(true);
        }
        roster.push(student);

        sqlx::query("UPDATE classs SET students = ? WHERE id = ? AND teacher_id = ?")
            .bind(serde_json::to_string(&roster)?)
            .bind(class_id)
            .bind(teacher_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("roster of class_id={class_id} now has {} students", roster.len());
        Ok(true)
    }
}
