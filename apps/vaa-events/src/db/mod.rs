use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};

use crate::error::Result;

pub mod models;
pub mod queries;
pub mod schema;

pub type DbPool = Pool<SqliteConnectionManager>;

const POOL_MAX_SIZE: u32 = 4;
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Opens the event table for the query service.
///
/// The schema is brought up to date on a writable connection first; every
/// pooled connection is then query-only, since nothing behind the HTTP
/// routes writes rows.
pub fn create_pool(database_path: &str) -> Result<DbPool> {
    drop(open_writer(database_path)?);

    let manager = SqliteConnectionManager::file(database_path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        .with_init(|conn| {
            conn.execute_batch(&format!(
                "PRAGMA query_only = ON;
                 PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
            ))
        });
    let pool = Pool::builder().max_size(POOL_MAX_SIZE).build(manager)?;

    tracing::debug!(path = database_path, "Opened event table read pool");
    Ok(pool)
}

/// A writable connection with the schema migrated, for whatever populates
/// the event table.
pub fn open_writer(database_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(database_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let conn = Connection::open(database_path)?;
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;",
    )?;
    schema::run_migrations(&conn)?;

    Ok(conn)
}
