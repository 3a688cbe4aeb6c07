// Database module - provides data access layer

use std::str::FromStr;

use color_eyre::{eyre::eyre, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod homework_ref;
pub mod models;
pub use homework_ref::{resolve_homework_ref, HomeworkRef, HomeworkSnapshot};
pub use models::*;

mod active;
mod class;
mod helpers;
mod history;
mod homework;
mod migrations;
mod student;
mod teacher;

pub use class::CreateClassOutcome;

// Main database handle
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect to `url` (e.g. `sqlite://data.db`), creating the file if needed,
    /// and bring the schema up to date.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await?;
        if one != 1 {
            return Err(eyre!("connection check failed"));
        }

        migrations::run(&pool).await?;

        tracing::info!("database connection has been verified");

        Ok(Self { pool })
    }

    pub async fn migration_applied(&self, version: &str) -> Result<bool> {
        migrations::is_applied(&self.pool, version).await
    }
}
