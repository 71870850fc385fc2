//! Client side of a guardian's privileged control-plane socket.
//!
//! The socket speaks one JSON object per line: a request
//! `{"method": .., "params": ..}` answered by `{"result": ..}` or
//! `{"error": {"message": ..}}`. Byte fields travel as hex.

use serde::{Deserialize, Serialize};

use crate::identity::MessageId;

pub mod client;
pub mod commands;
pub mod governance;

pub use client::{AdminClient, AdminEndpoint, RPC_TIMEOUT};
pub use governance::{
    ContractUpgrade, GovernanceMessage, Guardian, GuardianSetUpdate, InjectGovernanceVaaRequest,
};

pub const INJECT_GOVERNANCE_VAA: &str = "InjectGovernanceVAA";
pub const FIND_MISSING_MESSAGES: &str = "FindMissingMessages";
pub const GET_SIGNED_VAA: &str = "GetSignedVAA";

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub method: String,
    pub params: P,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcResponse<R> {
    Result(R),
    Error(RpcErrorBody),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectGovernanceVaaResponse {
    #[serde(with = "crate::hex_serde::list")]
    pub digests: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindMissingMessagesRequest {
    pub emitter_chain: u16,
    pub emitter_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindMissingMessagesResponse {
    pub missing_messages: Vec<String>,
    pub first_sequence: u64,
    pub last_sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSignedVaaRequest {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSignedVaaResponse {
    #[serde(with = "crate::hex_serde")]
    pub vaa_bytes: Vec<u8>,
}
