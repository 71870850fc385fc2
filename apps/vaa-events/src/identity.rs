//! Composite message identity: (chain, emitter address, sequence).
//!
//! Two textual forms are in use. Row keys in the event table are
//! `chain:emitter:sequence` with the sequence zero-padded, while operators
//! type `chain/emitter/sequence` on the command line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EventsError, Result};

/// Width of the zero-padded sequence segment in a row key.
pub const ROW_KEY_SEQUENCE_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainId {
    Unset,
    Solana,
    Ethereum,
    Terra,
    Bsc,
    Polygon,
}

impl ChainId {
    /// Maps a numeric token from a row key. Anything unrecognised is `Unset`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "1" => ChainId::Solana,
            "2" => ChainId::Ethereum,
            "3" => ChainId::Terra,
            "4" => ChainId::Bsc,
            "5" => ChainId::Polygon,
            _ => ChainId::Unset,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChainId::Unset => "unset",
            ChainId::Solana => "solana",
            ChainId::Ethereum => "ethereum",
            ChainId::Terra => "terra",
            ChainId::Bsc => "bsc",
            ChainId::Polygon => "polygon",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Addresses one position in an emitter's message stream.
///
/// `chain` stays numeric so that chains outside [`ChainId`] keep their
/// identity through a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId {
    pub emitter_chain: u16,
    pub emitter_address: String,
    pub sequence: u64,
}

impl MessageId {
    pub fn new(emitter_chain: u16, emitter_address: impl Into<String>, sequence: u64) -> Self {
        Self {
            emitter_chain,
            emitter_address: emitter_address.into(),
            sequence,
        }
    }

    pub fn to_row_key(&self) -> String {
        format!(
            "{}:{}:{:0width$}",
            self.emitter_chain,
            self.emitter_address,
            self.sequence,
            width = ROW_KEY_SEQUENCE_WIDTH
        )
    }

    /// Decodes a `chain:emitter:sequence` row key supplied by a caller.
    /// Both numeric segments must parse; see [`RowKeyParts`] for keys read
    /// back from the table.
    pub fn from_row_key(key: &str) -> Result<Self> {
        let [chain, emitter_address, sequence] = split_row_key(key)?;

        let emitter_chain = chain.parse::<u16>().map_err(|e| {
            EventsError::MalformedIdentity(format!("invalid chain in row key {key:?}: {e}"))
        })?;
        let sequence = strip_sequence_padding(sequence).parse::<u64>().map_err(|e| {
            EventsError::MalformedIdentity(format!("invalid sequence in row key {key:?}: {e}"))
        })?;

        Ok(Self::new(emitter_chain, emitter_address, sequence))
    }

    /// Decodes the `chain/emitter/sequence` form typed by operators.
    pub fn from_cli_arg(arg: &str) -> Result<Self> {
        let parts: Vec<&str> = arg.split('/').collect();
        let [chain, emitter_address, sequence] = parts.as_slice() else {
            return Err(EventsError::MalformedIdentity(format!(
                "invalid message ID: {arg}"
            )));
        };

        let emitter_chain = chain
            .parse::<u16>()
            .map_err(|e| EventsError::MalformedIdentity(format!("invalid chain ID: {e}")))?;
        if emitter_address.is_empty() {
            return Err(EventsError::MalformedIdentity(format!(
                "empty emitter address in message ID: {arg}"
            )));
        }
        let sequence = sequence
            .parse::<u64>()
            .map_err(|e| EventsError::MalformedIdentity(format!("invalid sequence number: {e}")))?;

        Ok(Self::new(emitter_chain, *emitter_address, sequence))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.emitter_chain, self.emitter_address, self.sequence
        )
    }
}

impl FromStr for MessageId {
    type Err = EventsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_cli_arg(s)
    }
}

/// The segments of a row key already stored in the event table.
///
/// Stored rows are reported as they are: a chain token outside the known
/// set decodes to [`ChainId::Unset`] and the sequence is only unpadded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowKeyParts<'a> {
    pub chain: ChainId,
    pub emitter_address: &'a str,
    pub sequence: &'a str,
}

impl<'a> RowKeyParts<'a> {
    pub fn split(key: &'a str) -> Result<Self> {
        let [chain, emitter_address, sequence] = split_row_key(key)?;
        Ok(Self {
            chain: ChainId::from_token(chain),
            emitter_address,
            sequence: strip_sequence_padding(sequence),
        })
    }
}

fn split_row_key(key: &str) -> Result<[&str; 3]> {
    let mut parts = key.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(chain), Some(emitter_address), Some(sequence), None) => {
            Ok([chain, emitter_address, sequence])
        }
        _ => Err(EventsError::MalformedIdentity(format!(
            "row key {key:?} must have 3 ':'-separated parts"
        ))),
    }
}

/// Strips the zero padding from a row-key sequence segment. An all-zero
/// segment is sequence `"0"`, never the empty string.
pub fn strip_sequence_padding(sequence: &str) -> &str {
    let trimmed = sequence.trim_start_matches('0');
    if trimmed.is_empty() && !sequence.is_empty() {
        "0"
    } else {
        trimmed
    }
}
