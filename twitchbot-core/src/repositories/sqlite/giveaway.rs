//! src/repositories/sqlite/giveaway.rs

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tokio::sync::Mutex;

use crate::repositories::{GiveawayOutcome, GiveawayRepository};
use crate::Error;

#[derive(Clone)]
pub struct SqliteGiveawayRepository {
    pool: Pool<Sqlite>,
    lock: Arc<Mutex<()>>,
}

impl SqliteGiveawayRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            lock: Arc::new(Mutex::new(())),
        }
    }
}

async fn ensure_tables(conn: &mut SqliteConnection) -> Result<(), Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS giveaway (
            active BIT NOT NULL,
            PRIMARY KEY (active)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS giveaway_users (
            user TEXT NOT NULL,
            PRIMARY KEY (user)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn is_active(conn: &mut SqliteConnection) -> Result<bool, Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT active FROM giveaway LIMIT 1")
        .fetch_optional(conn)
        .await?;
    Ok(matches!(row, Some((active,)) if active != 0))
}

#[async_trait]
impl GiveawayRepository for SqliteGiveawayRepository {
    async fn start(&self) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;
        ensure_tables(&mut tx).await?;
        sqlx::query("DELETE FROM giveaway").execute(&mut *tx).await?;
        sqlx::query("INSERT INTO giveaway (active) VALUES (1)")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn enter(&self, user: &str) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;
        ensure_tables(&mut tx).await?;
        if !is_active(&mut tx).await? {
            return Ok(false);
        }
        sqlx::query("INSERT OR REPLACE INTO giveaway_users (user) VALUES (?)")
            .bind(user)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn end(&self) -> Result<GiveawayOutcome, Error> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;
        ensure_tables(&mut tx).await?;
        if !is_active(&mut tx).await? {
            return Ok(GiveawayOutcome::NotActive);
        }

        let users: Vec<(String,)> = sqlx::query_as("SELECT user FROM giveaway_users ORDER BY user")
            .fetch_all(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM giveaway_users").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM giveaway").execute(&mut *tx).await?;
        tx.commit().await?;

        if users.is_empty() {
            Ok(GiveawayOutcome::NoEntrants)
        } else {
            Ok(GiveawayOutcome::Entrants(users.into_iter().map(|(u,)| u).collect()))
        }
    }
}
