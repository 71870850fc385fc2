use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{EventsError, Result};
use crate::events::{Details, Summary};
use crate::identity::MessageId;
use crate::query::{self, EmitterFilter, Totals};

use super::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub num_days: Option<u32>,
    pub num_rows: Option<u32>,
    pub for_chain: Option<u16>,
    pub for_address: Option<String>,
}

impl FilterParams {
    fn filter(&self) -> EmitterFilter {
        EmitterFilter {
            chain: self.for_chain,
            address: self.for_address.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionParams {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRowParams {
    pub row_key: Option<String>,
    pub emitter_chain: Option<u16>,
    pub emitter_address: Option<String>,
    pub sequence: Option<u64>,
}

/// Where a `/readrow` request points.
enum RowTarget {
    Key(String),
    Message(MessageId),
}

impl ReadRowParams {
    fn target(self) -> Result<RowTarget> {
        if let Some(key) = self.row_key {
            return Ok(RowTarget::Key(key));
        }
        match (self.emitter_chain, self.emitter_address, self.sequence) {
            (Some(chain), Some(address), Some(sequence)) => {
                Ok(RowTarget::Message(MessageId::new(chain, address, sequence)))
            }
            _ => Err(EventsError::InvalidArgument(
                "rowKey or emitterChain, emitterAddress and sequence are required".into(),
            )),
        }
    }
}

pub async fn totals(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Totals>> {
    let num_days = state.totals_days(params.num_days)?;

    let conn = state.reader()?;
    let totals = query::totals(&conn, &params.filter(), num_days, Utc::now())?;
    Ok(Json(totals))
}

pub async fn recent(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Summary>>> {
    let num_rows = state.recent_rows(params.num_rows)?;

    let conn = state.reader()?;
    let summaries = query::recent(&conn, &params.filter(), num_rows)?;
    Ok(Json(summaries))
}

pub async fn transaction(
    State(state): State<AppState>,
    Query(params): Query<TransactionParams>,
) -> Result<Json<Details>> {
    let conn = state.reader()?;
    query::by_transaction(&conn, &params.id)?
        .map(Json)
        .ok_or_else(|| EventsError::NotFound(format!("no message for transaction {}", params.id)))
}

pub async fn read_row(
    State(state): State<AppState>,
    Query(params): Query<ReadRowParams>,
) -> Result<Json<Details>> {
    let target = params.target()?;

    let conn = state.reader()?;
    let (details, wanted) = match target {
        RowTarget::Key(key) => (query::by_row_key(&conn, &key)?, key),
        RowTarget::Message(id) => (query::by_message_id(&conn, &id)?, id.to_string()),
    };
    details
        .map(Json)
        .ok_or_else(|| EventsError::NotFound(format!("no row {wanted}")))
}
