use color_eyre::Result;
use sqlx::{QueryBuilder, Sqlite};

use super::helpers::push_in_list;
use super::models::{NewStudent, Student};
use super::Db;

const STUDENT_COLUMNS: &str = "id, full_name, email, username, gender, age";

impl Db {
    pub async fn create_student(&self, student: &NewStudent, teacher_id: i64) -> Result<Student> {
        let created = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (teacher_id, full_name, email, username, gender, age) VALUES (?, ?, ?, ?, ?, ?) RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(teacher_id)
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(&student.username)
        .bind(&student.gender)
        .bind(student.age)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("student created id={} by teacher_id={teacher_id}", created.id);
        Ok(created)
    }

    pub async fn find_owned_student(&self, student_id: i64, teacher_id: i64) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ? AND teacher_id = ?"
        ))
        .bind(student_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    pub async fn students_by_ids(&self, ids: &[i64]) -> Result<Vec<Student>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id"));
        push_in_list(&mut qb, ids);

        Ok(qb.build_query_as::<Student>().fetch_all(&self.pool).await?)
    }

    /// Only the teacher's own students; the same email may exist elsewhere.
    pub async fn students_by_emails(&self, teacher_id: i64, emails: &[String]) -> Result<Vec<Student>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE teacher_id = "
        ));
        qb.push_bind(teacher_id).push(" AND email");
        push_in_list(&mut qb, emails);

        Ok(qb.build_query_as::<Student>().fetch_all(&self.pool).await?)
    }
}
