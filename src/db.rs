use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Pool for the relational source. MySQL in production, SQLite for local
/// exports and tests.
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

pub async fn connect(url: &str, max_connections: u32) -> Result<DbPool> {
    if url.starts_with("sqlite:") {
        let options = SqliteConnectOptions::from_str(url)?.read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        return Ok(DbPool::Sqlite(pool));
    }

    if url.starts_with("mysql:") {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        return Ok(DbPool::MySql(pool));
    }

    let scheme = url.split(':').next().unwrap_or_default();
    Err(Error::Config(format!(
        "unsupported relational database scheme '{}' (expected mysql or sqlite)",
        scheme
    )))
}
