use crate::error::{EventsError, Result};

pub struct Config {
    pub database_path: String,
    pub server_port: u16,
    pub recent_max_rows: u32,
    pub totals_max_days: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/events.db".into());

        let server_port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse::<u16>()
            .map_err(|e| EventsError::Config(format!("Invalid SERVER_PORT: {e}")))?;

        let recent_max_rows = std::env::var("RECENT_MAX_ROWS")
            .unwrap_or_else(|_| "100".into())
            .parse::<u32>()
            .map_err(|e| EventsError::Config(format!("Invalid RECENT_MAX_ROWS: {e}")))?;

        let totals_max_days = std::env::var("TOTALS_MAX_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse::<u32>()
            .map_err(|e| EventsError::Config(format!("Invalid TOTALS_MAX_DAYS: {e}")))?;

        if recent_max_rows == 0 || totals_max_days == 0 {
            return Err(EventsError::Config(
                "RECENT_MAX_ROWS and TOTALS_MAX_DAYS must be positive".into(),
            ));
        }

        Ok(Self {
            database_path,
            server_port,
            recent_max_rows,
            totals_max_days,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "./data/events.db".into(),
            server_port: 3000,
            recent_max_rows: 100,
            totals_max_days: 30,
        }
    }
}
