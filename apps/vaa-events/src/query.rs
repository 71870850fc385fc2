//! Read-only queries over the event table.
//!
//! Every query fetches rows and hands them to [`crate::events`]; a query that
//! matches nothing returns an empty result rather than an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::models::Row;
use crate::db::queries;
use crate::error::{EventsError, Result};
use crate::events::{make_details, make_summary, Details, Summary};
use crate::identity::MessageId;

/// Bucket holding the count across all emitters.
pub const ALL_MESSAGES: &str = "*";

/// Message counts per day, then per group (`*`, chain, `chain:emitter`).
pub type Totals = BTreeMap<String, BTreeMap<String, u64>>;

/// Restricts a scan to one chain, or one emitter on a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitterFilter {
    pub chain: Option<u16>,
    pub address: Option<String>,
}

impl EmitterFilter {
    pub fn key_prefix(&self) -> Result<String> {
        match (self.chain, self.address.as_deref()) {
            (None, None) => Ok(String::new()),
            (Some(chain), None) => Ok(format!("{chain}:")),
            (Some(chain), Some(address)) => Ok(format!("{chain}:{address}:")),
            (None, Some(_)) => Err(EventsError::InvalidArgument(
                "forAddress requires forChain".into(),
            )),
        }
    }
}

pub fn totals(
    conn: &Connection,
    filter: &EmitterFilter,
    num_days: u32,
    now: DateTime<Utc>,
) -> Result<Totals> {
    if num_days == 0 {
        return Err(EventsError::InvalidArgument("numDays must be at least 1".into()));
    }
    let prefix = filter.key_prefix()?;

    let today = now.date_naive();
    let first_day = today
        .checked_sub_days(Days::new(u64::from(num_days - 1)))
        .ok_or_else(|| EventsError::InvalidArgument(format!("numDays {num_days} is out of range")))?;
    let since = start_of_day_micros(first_day);

    let mut totals = Totals::new();
    for day in first_day.iter_days().take_while(|d| *d <= today) {
        totals
            .entry(day.to_string())
            .or_default()
            .insert(ALL_MESSAGES.to_string(), 0);
    }

    for row in queries::read_prefix_since(conn, &prefix, since)? {
        // A row belongs to the day it was first written, even when later
        // cells fall inside the window.
        let Some(written) = row.first_written_micros().filter(|ts| *ts >= since) else {
            continue;
        };
        let Some(day) = DateTime::<Utc>::from_timestamp_micros(written) else {
            continue;
        };

        let Some(summary) = summarize_stored(&row) else {
            continue;
        };
        let counts = totals.entry(day.date_naive().to_string()).or_default();
        for group in [
            ALL_MESSAGES.to_string(),
            summary.emitter_chain.clone(),
            format!("{}:{}", summary.emitter_chain, summary.emitter_address),
        ] {
            *counts.entry(group).or_default() += 1;
        }
    }

    tracing::debug!(prefix = %prefix, num_days, "Computed totals");
    Ok(totals)
}

/// The most recently written messages, newest first.
pub fn recent(conn: &Connection, filter: &EmitterFilter, num_rows: u32) -> Result<Vec<Summary>> {
    let prefix = filter.key_prefix()?;

    let mut summaries = Vec::new();
    for key in queries::recent_row_keys(conn, &prefix, num_rows)? {
        let row = queries::read_row(conn, &key)?;
        if let Some(summary) = row.as_ref().and_then(summarize_stored) {
            summaries.push(summary);
        }
    }
    Ok(summaries)
}

pub fn by_transaction(conn: &Connection, tx_id: &str) -> Result<Option<Details>> {
    let Some(key) = queries::find_row_key_by_tx(conn, tx_id)? else {
        return Ok(None);
    };
    // The key came from the table, so it is not held to the caller's format.
    read_details(conn, &key)
}

/// Looks up a row by a key the caller supplied; the key must decode.
pub fn by_row_key(conn: &Connection, row_key: &str) -> Result<Option<Details>> {
    MessageId::from_row_key(row_key)?;
    read_details(conn, row_key)
}

pub fn by_message_id(conn: &Connection, id: &MessageId) -> Result<Option<Details>> {
    by_row_key(conn, &id.to_row_key())
}

fn read_details(conn: &Connection, row_key: &str) -> Result<Option<Details>> {
    queries::read_row(conn, row_key)?
        .map(|row| make_details(&row))
        .transpose()
}

/// One bad row must not take a whole listing down with it.
fn summarize_stored(row: &Row) -> Option<Summary> {
    match make_summary(row) {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(row_key = %row.key, error = %e, "Skipping row that does not reconstruct");
            None
        }
    }
}

fn start_of_day_micros(day: NaiveDate) -> i64 {
    day.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc().timestamp_micros())
        .unwrap_or_default()
}
