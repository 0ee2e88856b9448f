//! src/repositories/sqlite/vim.rs
//!
//! Viewers buy minutes of forced vim with bits. The clock is stored as the
//! epoch second at which vim time ends; disabling vim banks donations until
//! it is enabled again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tokio::sync::Mutex;

use crate::repositories::{VimBits, VimRepository};
use crate::Error;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS vim_bits (
        user TEXT NOT NULL,
        bits INT NOT NULL,
        timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vim_bits_disabled (
        user TEXT NOT NULL,
        bits INT NOT NULL,
        timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vim_time_left (
        ends_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vim_enabled (
        enabled INT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vim_active (
        active INT NOT NULL
    )
    "#,
];

/// Seconds of vim bought by a donation: 51 bits is 30 seconds, every
/// further 100 bits adds a minute.
pub fn bits_to_seconds(bits: u64) -> u64 {
    60 * (100 + bits).saturating_sub(51) / 100
}

fn now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Clone)]
pub struct SqliteVimRepository {
    pool: Pool<Sqlite>,
    lock: Arc<Mutex<()>>,
}

impl SqliteVimRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            lock: Arc::new(Mutex::new(())),
        }
    }
}

async fn ensure_tables(conn: &mut SqliteConnection) -> Result<(), Error> {
    for sql in TABLES {
        sqlx::query(sql).execute(&mut *conn).await?;
    }
    Ok(())
}

async fn get_enabled(conn: &mut SqliteConnection) -> Result<bool, Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT enabled FROM vim_enabled ORDER BY ROWID DESC LIMIT 1")
            .fetch_optional(conn)
            .await?;
    Ok(row.is_none_or(|(enabled,)| enabled != 0))
}

async fn get_time_left(conn: &mut SqliteConnection) -> Result<u64, Error> {
    if !get_enabled(&mut *conn).await? {
        return Ok(0);
    }
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT ends_at FROM vim_time_left ORDER BY ROWID DESC LIMIT 1")
            .fetch_optional(conn)
            .await?;
    Ok(row.map_or(0, |(ends_at,)| (ends_at - now()).max(0) as u64))
}

async fn add_time(conn: &mut SqliteConnection, seconds: u64) -> Result<u64, Error> {
    let time_left = get_time_left(&mut *conn).await? + seconds;
    sqlx::query("INSERT INTO vim_time_left (ends_at) VALUES (?)")
        .bind(now() + time_left as i64)
        .execute(conn)
        .await?;
    Ok(time_left)
}

async fn disabled_seconds(conn: &mut SqliteConnection) -> Result<u64, Error> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT bits FROM vim_bits_disabled")
        .fetch_all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(bits,)| bits_to_seconds(bits.max(0) as u64))
        .sum())
}

async fn get_active(conn: &mut SqliteConnection) -> Result<bool, Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT active FROM vim_active LIMIT 1")
        .fetch_optional(conn)
        .await?;
    Ok(matches!(row, Some((active,)) if active != 0))
}

async fn set_active(conn: &mut SqliteConnection, active: bool) -> Result<(), Error> {
    sqlx::query("DELETE FROM vim_active").execute(&mut *conn).await?;
    sqlx::query("INSERT INTO vim_active (active) VALUES (?)")
        .bind(active as i64)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl VimRepository for SqliteVimRepository {
    async fn is_enabled(&self) -> Result<bool, Error> {
        let mut conn = self.pool.acquire().await?;
        ensure_tables(&mut conn).await?;
        get_enabled(&mut conn).await
    }

    async fn time_left(&self) -> Result<u64, Error> {
        let mut conn = self.pool.acquire().await?;
        ensure_tables(&mut conn).await?;
        get_time_left(&mut conn).await
    }

    async fn add_bits(&self, user: &str, bits: u64) -> Result<VimBits, Error> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;
        ensure_tables(&mut tx).await?;

        let result = if get_enabled(&mut tx).await? {
            sqlx::query("INSERT INTO vim_bits (user, bits) VALUES (?, ?)")
                .bind(user)
                .bind(bits as i64)
                .execute(&mut *tx)
                .await?;
            let time_left = add_time(&mut tx, bits_to_seconds(bits)).await?;
            set_active(&mut tx, true).await?;
            VimBits::Added(time_left)
        } else {
            sqlx::query("INSERT INTO vim_bits_disabled (user, bits) VALUES (?, ?)")
                .bind(user)
                .bind(bits as i64)
                .execute(&mut *tx)
                .await?;
            VimBits::Banked(disabled_seconds(&mut tx).await?)
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn disable(&self) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut conn = self.pool.acquire().await?;
        ensure_tables(&mut conn).await?;
        sqlx::query("INSERT INTO vim_enabled (enabled) VALUES (0)")
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn enable(&self) -> Result<u64, Error> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;
        ensure_tables(&mut tx).await?;

        sqlx::query("INSERT INTO vim_enabled (enabled) VALUES (1)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO vim_bits SELECT * FROM vim_bits_disabled")
            .execute(&mut *tx)
            .await?;
        let banked = disabled_seconds(&mut tx).await?;
        let time_left = add_time(&mut tx, banked).await?;
        sqlx::query("DELETE FROM vim_bits_disabled")
            .execute(&mut *tx)
            .await?;
        if time_left > 0 {
            set_active(&mut tx, true).await?;
        }

        tx.commit().await?;
        Ok(time_left)
    }

    async fn user_totals(&self) -> Result<Vec<(String, u64)>, Error> {
        let mut conn = self.pool.acquire().await?;
        ensure_tables(&mut conn).await?;
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT user, SUM(bits) AS total FROM vim_bits GROUP BY user ORDER BY total DESC, user ASC",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(user, total)| (user, total.max(0) as u64))
            .collect())
    }

    async fn sync_active(&self) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;
        ensure_tables(&mut tx).await?;

        let running = get_time_left(&mut tx).await? > 0;
        let was_active = get_active(&mut tx).await?;
        let expired = was_active && !running;
        if running != was_active {
            set_active(&mut tx, running).await?;
        }

        tx.commit().await?;
        Ok(expired)
    }
}
