use std::sync::Arc;
use std::time::Instant;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::{EventsError, Result};

const DEFAULT_TOTALS_DAYS: u32 = 7;
const DEFAULT_RECENT_ROWS: u32 = 10;

/// Read access to the event table plus the per-request limits, built once
/// at startup and shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// A pooled, query-only connection to the event table.
    pub fn reader(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            tracing::warn!(error = %e, "Event table unavailable");
            EventsError::Pool(e)
        })
    }

    pub fn totals_days(&self, requested: Option<u32>) -> Result<u32> {
        let max = self.config.totals_max_days;
        bounded(requested, DEFAULT_TOTALS_DAYS.min(max), max, "numDays")
    }

    pub fn recent_rows(&self, requested: Option<u32>) -> Result<u32> {
        let max = self.config.recent_max_rows;
        bounded(requested, DEFAULT_RECENT_ROWS.min(max), max, "numRows")
    }
}

fn bounded(value: Option<u32>, default: u32, max: u32, name: &str) -> Result<u32> {
    match value.unwrap_or(default) {
        0 => Err(EventsError::InvalidArgument(format!("{name} must be at least 1"))),
        v if v > max => Err(EventsError::InvalidArgument(format!(
            "{name} must be at most {max}"
        ))),
        v => Ok(v),
    }
}
