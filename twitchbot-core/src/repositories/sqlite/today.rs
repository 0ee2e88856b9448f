//! src/repositories/sqlite/today.rs

use async_trait::async_trait;
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::repositories::TodayRepository;
use crate::Error;

#[derive(Clone)]
pub struct SqliteTodayRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTodayRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

async fn ensure_table(conn: &mut SqliteConnection) -> Result<(), Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS today (
            msg TEXT NOT NULL,
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl TodayRepository for SqliteTodayRepository {
    async fn set_today(&self, msg: &str) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;
        ensure_table(&mut conn).await?;
        sqlx::query("INSERT INTO today (msg) VALUES (?)")
            .bind(msg)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn get_today(&self) -> Result<Option<String>, Error> {
        let mut conn = self.pool.acquire().await?;
        ensure_table(&mut conn).await?;
        let row: Option<(String,)> =
            sqlx::query_as("SELECT msg FROM today ORDER BY ROWID DESC LIMIT 1")
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(msg,)| msg))
    }
}
