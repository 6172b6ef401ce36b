//! Low-level SQLite queries.
//!
//! Each submodule is a set of plain functions over a `&mut SqliteConnection`, one per query.
//! Nothing here opens its own transaction: [`super::SqliteDatabase`] decides the transaction
//! boundary and passes the same connection through every query that must commit together.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod history;
pub mod orders;
pub mod products;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/buyback.db";

pub fn db_url() -> String {
    let result = env::var("BBE_DATABASE_URL").unwrap_or_else(|_| {
        info!("BBE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
