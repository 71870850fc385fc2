//! The operator commands. Each one is all-or-nothing: any failure is
//! returned to the caller, which reports it and exits non-zero.

use std::path::Path;

use crate::error::{EventsError, Result};
use crate::identity::MessageId;
use crate::vaa::Vaa;

use super::{
    AdminEndpoint, FindMissingMessagesRequest, GetSignedVaaRequest, InjectGovernanceVaaRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingMessagesReport {
    pub emitter_address: String,
    pub missing_messages: Vec<String>,
    pub first_sequence: u64,
    pub last_sequence: u64,
}

impl MissingMessagesReport {
    pub fn gap_count(&self) -> usize {
        self.missing_messages.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaaDump {
    pub vaa: Vaa,
    pub bytes: Vec<u8>,
}

impl VaaDump {
    pub fn hex_bytes(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Submits every message in a governance request file and returns the hex
/// digests the guardian reports for them.
pub async fn inject_governance_vaa(endpoint: &AdminEndpoint, path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        EventsError::InvalidArgument(format!("failed to read file {}: {e}", path.display()))
    })?;
    let request = InjectGovernanceVaaRequest::from_toml(&text)?;

    let response = endpoint
        .call(|mut client| async move { client.inject_governance_vaa(&request).await })
        .await?;

    let digests: Vec<String> = response.digests.iter().map(hex::encode).collect();
    for digest in &digests {
        tracing::info!("VAA successfully injected with digest {digest}");
    }
    Ok(digests)
}

pub async fn find_missing_messages(
    endpoint: &AdminEndpoint,
    chain_id: &str,
    emitter_address: &str,
) -> Result<MissingMessagesReport> {
    let emitter_chain = chain_id
        .parse::<u16>()
        .map_err(|e| EventsError::InvalidArgument(format!("invalid chain ID {chain_id:?}: {e}")))?;
    if emitter_address.is_empty() {
        return Err(EventsError::InvalidArgument("emitter address is empty".into()));
    }

    let request = FindMissingMessagesRequest {
        emitter_chain,
        emitter_address: emitter_address.to_string(),
    };
    let response = endpoint
        .call(|mut client| async move { client.find_missing_messages(&request).await })
        .await?;

    let report = MissingMessagesReport {
        emitter_address: emitter_address.to_string(),
        missing_messages: response.missing_messages,
        first_sequence: response.first_sequence,
        last_sequence: response.last_sequence,
    };
    tracing::info!(
        "processed {} sequences {} to {} ({} gaps)",
        report.emitter_address,
        report.first_sequence,
        report.last_sequence,
        report.gap_count()
    );
    Ok(report)
}

/// Fetches one signed VAA by `chain/emitter/sequence` and decodes it.
/// Unlike the event table reader, a VAA that does not decode is an error.
pub async fn dump_vaa_by_message_id(endpoint: &AdminEndpoint, message_id: &str) -> Result<VaaDump> {
    let message_id = MessageId::from_cli_arg(message_id)?;

    let request = GetSignedVaaRequest { message_id };
    let response = endpoint
        .call(|mut client| async move { client.get_signed_vaa(&request).await })
        .await?;

    let vaa = Vaa::unmarshal(&response.vaa_bytes)?;
    tracing::info!("VAA with digest {}: {:#?}", vaa.hex_digest(), vaa);

    Ok(VaaDump {
        vaa,
        bytes: response.vaa_bytes,
    })
}
