//! Rebuilds message records from event table rows.
//!
//! A row can be written at several points in a message's life: the
//! publication observed on the source chain, the quorum-signed VAA, or both.
//! Identity always comes from the publication when it is there and from the
//! row key otherwise.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::db::models::{Cell, Row, MESSAGE_PUBLICATION, QUORUM_STATE};
use crate::error::Result;
use crate::identity::RowKeyParts;
use crate::vaa::Vaa;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub emitter_chain: String,
    pub emitter_address: String,
    pub sequence: String,
    pub initiating_tx_id: String,
    #[serde(with = "crate::hex_serde")]
    pub payload: Vec<u8>,
    #[serde(with = "crate::hex_serde")]
    pub signed_vaa_bytes: Vec<u8>,
    pub quorum_time: Option<String>,
}

/// A [`Summary`] with the signed VAA decoded, when it decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Details {
    #[serde(flatten)]
    pub summary: Summary,
    pub signed_vaa: Option<Vaa>,
}

/// Which of the two independent record halves a row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowShape {
    pub has_observation: bool,
    pub has_quorum: bool,
}

impl RowShape {
    pub fn of(row: &Row) -> Self {
        Self {
            has_observation: row.has_family(MESSAGE_PUBLICATION),
            has_quorum: row.has_family(QUORUM_STATE),
        }
    }
}

pub fn make_summary(row: &Row) -> Result<Summary> {
    summarize(RowShape::of(row), row)
}

fn summarize(shape: RowShape, row: &Row) -> Result<Summary> {
    let mut summary = if shape.has_observation {
        from_publication(row.family(MESSAGE_PUBLICATION).unwrap_or_default())
    } else {
        from_row_key(&row.key)?
    };

    if shape.has_quorum {
        if let Some(cell) = latest_cell(row.family(QUORUM_STATE).unwrap_or_default()) {
            summary.signed_vaa_bytes = cell.value.clone();
            summary.quorum_time = Some(format_timestamp(cell.timestamp_micros));
        }
    }

    Ok(summary)
}

/// Decoding is best effort: a VAA that fails to decode leaves
/// `signed_vaa` empty and the summary intact.
pub fn make_details(row: &Row) -> Result<Details> {
    let summary = make_summary(row)?;

    let signed_vaa = if summary.signed_vaa_bytes.is_empty() {
        None
    } else {
        match Vaa::unmarshal(&summary.signed_vaa_bytes) {
            Ok(vaa) => Some(vaa),
            Err(e) => {
                tracing::debug!(row_key = %row.key, error = %e, "Stored VAA does not decode");
                None
            }
        }
    };

    Ok(Details {
        summary,
        signed_vaa,
    })
}

fn from_publication(cells: &[Cell]) -> Summary {
    let mut summary = Summary::default();
    // Newest version of each column wins; cells are ordered newest first.
    for cell in cells.iter().rev() {
        match cell.column.as_str() {
            "InitiatingTxID" => summary.initiating_tx_id = lossy(&cell.value),
            "Payload" => summary.payload = cell.value.clone(),
            "EmitterChain" => summary.emitter_chain = lossy(&cell.value),
            "EmitterAddress" => summary.emitter_address = lossy(&cell.value),
            "Sequence" => summary.sequence = lossy(&cell.value),
            _ => {}
        }
    }
    summary
}

fn from_row_key(key: &str) -> Result<Summary> {
    let parts = RowKeyParts::split(key)?;

    Ok(Summary {
        emitter_chain: parts.chain.to_string(),
        emitter_address: parts.emitter_address.to_string(),
        sequence: parts.sequence.to_string(),
        ..Summary::default()
    })
}

// Several versions may exist; the most recently written one is the quorum.
fn latest_cell(cells: &[Cell]) -> Option<&Cell> {
    cells.iter().max_by_key(|cell| cell.timestamp_micros)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub fn format_timestamp(micros: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| micros.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventsError;
    use crate::vaa::tests::sample_vaa;

    const KEY: &str = "2:000000000000000000000000f92cd566ea4864356c5491c177a430c222d7e678:0000000000000042";
    const EMITTER: &str = "000000000000000000000000f92cd566ea4864356c5491c177a430c222d7e678";

    fn publication(row: Row) -> Row {
        row.with_cell(MESSAGE_PUBLICATION, "InitiatingTxID", "0xfeed", 1_000)
            .with_cell(MESSAGE_PUBLICATION, "Payload", vec![1, 2, 3], 1_000)
            .with_cell(MESSAGE_PUBLICATION, "EmitterChain", "ethereum", 1_000)
            .with_cell(MESSAGE_PUBLICATION, "EmitterAddress", "published-emitter", 1_000)
            .with_cell(MESSAGE_PUBLICATION, "Sequence", "42", 1_000)
    }

    fn quorum(row: Row, bytes: Vec<u8>, ts: i64) -> Row {
        row.with_cell(QUORUM_STATE, "SignedVAA", bytes, ts)
    }

    #[test]
    fn shape_covers_all_four_combinations() {
        let empty = Row::new(KEY);
        let obs = publication(Row::new(KEY));
        let quo = quorum(Row::new(KEY), vec![9], 5);
        let both = quorum(publication(Row::new(KEY)), vec![9], 5);

        let shape = |r: &Row| {
            let s = RowShape::of(r);
            (s.has_observation, s.has_quorum)
        };
        assert_eq!(shape(&empty), (false, false));
        assert_eq!(shape(&obs), (true, false));
        assert_eq!(shape(&quo), (false, true));
        assert_eq!(shape(&both), (true, true));
    }

    #[test]
    fn publication_only_row_has_no_quorum_fields() {
        let summary = make_summary(&publication(Row::new(KEY))).unwrap();
        assert_eq!(summary.initiating_tx_id, "0xfeed");
        assert_eq!(summary.payload, vec![1, 2, 3]);
        assert_eq!(summary.emitter_chain, "ethereum");
        assert_eq!(summary.emitter_address, "published-emitter");
        assert_eq!(summary.sequence, "42");
        assert!(summary.signed_vaa_bytes.is_empty());
        assert_eq!(summary.quorum_time, None);
    }

    #[test]
    fn quorum_only_row_takes_identity_from_key() {
        let row = quorum(Row::new(KEY), vec![7, 7], 1_634_000_000_000_000);
        let summary = make_summary(&row).unwrap();

        assert_eq!(summary.emitter_chain, "ethereum");
        assert_eq!(summary.emitter_address, EMITTER);
        assert_eq!(summary.sequence, "42");
        assert_eq!(summary.initiating_tx_id, "");
        assert!(summary.payload.is_empty());
        assert_eq!(summary.signed_vaa_bytes, vec![7, 7]);
        assert_eq!(
            summary.quorum_time.as_deref(),
            Some("2021-10-12T00:53:20.000000Z")
        );
    }

    #[test]
    fn quorum_only_row_with_zero_sequence() {
        let row = quorum(Row::new("1:abc:0000000000000000"), vec![1], 1);
        let summary = make_summary(&row).unwrap();
        assert_eq!(summary.emitter_chain, "solana");
        assert_eq!(summary.sequence, "0");
    }

    #[test]
    fn unknown_chain_in_key_is_unset() {
        let row = quorum(Row::new("9:abc:0000000000000001"), vec![1], 1);
        assert_eq!(make_summary(&row).unwrap().emitter_chain, "unset");
    }

    #[test]
    fn named_chain_token_in_key_is_unset_not_an_error() {
        let row = quorum(Row::new("ethereum:abc:0000000000000001"), vec![1], 1);
        let summary = make_summary(&row).unwrap();
        assert_eq!(summary.emitter_chain, "unset");
        assert_eq!(summary.emitter_address, "abc");
        assert_eq!(summary.sequence, "1");
        assert_eq!(summary.signed_vaa_bytes, vec![1]);
    }

    #[test]
    fn publication_takes_precedence_over_key() {
        let row = quorum(publication(Row::new("5:key-emitter:0000000000000099")), vec![1], 5);
        let summary = make_summary(&row).unwrap();
        assert_eq!(summary.emitter_chain, "ethereum");
        assert_eq!(summary.emitter_address, "published-emitter");
        assert_eq!(summary.sequence, "42");
        assert_eq!(summary.signed_vaa_bytes, vec![1]);
    }

    #[test]
    fn newest_quorum_version_wins() {
        let row = quorum(quorum(Row::new(KEY), vec![1], 100), vec![2], 200);
        let summary = make_summary(&row).unwrap();
        assert_eq!(summary.signed_vaa_bytes, vec![2]);
        assert_eq!(summary.quorum_time, Some(format_timestamp(200)));
    }

    #[test]
    fn row_without_families_has_key_identity_only() {
        let summary = make_summary(&Row::new(KEY)).unwrap();
        assert_eq!(summary.emitter_address, EMITTER);
        assert_eq!(summary.sequence, "42");
        assert_eq!(summary.initiating_tx_id, "");
        assert!(summary.payload.is_empty());
        assert!(summary.signed_vaa_bytes.is_empty());
        assert_eq!(summary.quorum_time, None);
    }

    #[test]
    fn key_path_rejects_malformed_keys() {
        let row = quorum(Row::new("not-a-key"), vec![1], 1);
        assert!(matches!(
            make_summary(&row),
            Err(EventsError::MalformedIdentity(_))
        ));
    }

    #[test]
    fn details_decode_valid_vaa() {
        let vaa = sample_vaa();
        let row = quorum(publication(Row::new(KEY)), vaa.marshal().unwrap(), 5);
        let details = make_details(&row).unwrap();
        assert_eq!(details.signed_vaa, Some(vaa));
        assert_eq!(details.summary.initiating_tx_id, "0xfeed");
    }

    #[test]
    fn details_with_corrupt_vaa_keep_summary() {
        let row = quorum(publication(Row::new(KEY)), vec![1, 0, 0], 5);
        let details = make_details(&row).unwrap();
        assert_eq!(details.signed_vaa, None);
        assert_eq!(details.summary, make_summary(&row).unwrap());
        assert_eq!(details.summary.signed_vaa_bytes, vec![1, 0, 0]);
    }

    #[test]
    fn details_without_quorum_have_no_vaa() {
        let details = make_details(&publication(Row::new(KEY))).unwrap();
        assert_eq!(details.signed_vaa, None);
    }

    #[test]
    fn summary_serializes_bytes_as_hex() {
        let summary = make_summary(&publication(Row::new(KEY))).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["payload"], "010203");
        assert_eq!(json["signed_vaa_bytes"], "");
        assert_eq!(json["quorum_time"], serde_json::Value::Null);
    }
}
