//! src/repositories/sqlite/motd.rs

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tokio::sync::Mutex;

use crate::repositories::MotdRepository;
use crate::Error;

/// Points a motd redemption costs, recorded alongside each entry.
const MOTD_POINTS: i64 = 250;

#[derive(Clone)]
pub struct SqliteMotdRepository {
    pool: Pool<Sqlite>,
    lock: Arc<Mutex<()>>,
}

impl SqliteMotdRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            lock: Arc::new(Mutex::new(())),
        }
    }
}

async fn ensure_table(conn: &mut SqliteConnection) -> Result<(), Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS motd (
            user TEXT NOT NULL,
            msg TEXT NOT NULL,
            points INT NOT NULL,
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl MotdRepository for SqliteMotdRepository {
    async fn set_motd(&self, user: &str, msg: &str) -> Result<u64, Error> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;
        ensure_table(&mut tx).await?;

        sqlx::query("INSERT INTO motd (user, msg, points) VALUES (?, ?, ?)")
            .bind(user)
            .bind(msg)
            .bind(MOTD_POINTS)
            .execute(&mut *tx)
            .await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(1) FROM motd WHERE msg = ?")
            .bind(msg)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(count.max(0) as u64)
    }

    async fn get_motd(&self) -> Result<Option<String>, Error> {
        let mut conn = self.pool.acquire().await?;
        ensure_table(&mut conn).await?;
        let row: Option<(String,)> =
            sqlx::query_as("SELECT msg FROM motd ORDER BY ROWID DESC LIMIT 1")
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(msg,)| msg))
    }
}
