use rusqlite::Connection;

use crate::error::{EventsError, Result};

const SCHEMA_VERSION: i64 = 1;

/// The event table is stored one cell per row, keyed the way a wide-column
/// store addresses a value: row key, column family, qualifier, version.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
        INSERT OR IGNORE INTO schema_version VALUES (1);

        CREATE TABLE IF NOT EXISTS cells (
            row_key TEXT NOT NULL,
            family TEXT NOT NULL,
            qualifier TEXT NOT NULL,
            value BLOB NOT NULL,
            ts_micros INTEGER NOT NULL,
            PRIMARY KEY(row_key, family, qualifier, ts_micros)
        );
        CREATE INDEX IF NOT EXISTS idx_cells_ts ON cells(ts_micros);
        CREATE INDEX IF NOT EXISTS idx_cells_column_value ON cells(family, qualifier, value);
        "#,
    )?;

    let version: i64 = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    )?;

    tracing::info!(schema_version = version, "Database initialized");
    if version != SCHEMA_VERSION {
        return Err(EventsError::Config(format!(
            "schema version mismatch: database has {version}, expected {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}
