//! Governance injection requests, written by operators as TOML.
//!
//! ```toml
//! current_set_index = 0
//!
//! [[messages]]
//! sequence = 1
//! nonce = 42
//! [messages.guardian_set]
//! guardians = [{ pubkey = "0xbeFA429d57cD18b7F8A4d91A2da9AB4AF05d0FBe", name = "guardian-0" }]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EventsError, Result};
use crate::hex_serde;

const GUARDIAN_KEY_LEN: usize = 20;
const CONTRACT_ADDRESS_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectGovernanceVaaRequest {
    pub current_set_index: u32,
    pub messages: Vec<GovernanceMessage>,
}

/// Exactly one of the action fields is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceMessage {
    pub sequence: u64,
    pub nonce: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_set: Option<GuardianSetUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_upgrade: Option<ContractUpgrade>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianSetUpdate {
    pub guardians: Vec<Guardian>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub pubkey: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractUpgrade {
    pub chain_id: u16,
    pub new_contract: String,
}

impl InjectGovernanceVaaRequest {
    pub fn from_toml(text: &str) -> Result<Self> {
        let request: Self = toml::from_str(text)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(EventsError::InvalidArgument(
                "governance request has no messages".into(),
            ));
        }
        for (i, message) in self.messages.iter().enumerate() {
            message
                .validate()
                .map_err(|e| EventsError::InvalidArgument(format!("message {i}: {e}")))?;
        }
        Ok(())
    }
}

impl GovernanceMessage {
    fn validate(&self) -> std::result::Result<(), String> {
        match (&self.guardian_set, &self.contract_upgrade) {
            (Some(update), None) => {
                if update.guardians.is_empty() {
                    return Err("guardian set is empty".into());
                }
                for guardian in &update.guardians {
                    check_hex_len(&guardian.pubkey, GUARDIAN_KEY_LEN, "guardian pubkey")?;
                }
                Ok(())
            }
            (None, Some(upgrade)) => {
                check_hex_len(&upgrade.new_contract, CONTRACT_ADDRESS_LEN, "new_contract")
            }
            (None, None) => Err("no governance action set".into()),
            (Some(_), Some(_)) => Err("more than one governance action set".into()),
        }
    }
}

fn check_hex_len(value: &str, len: usize, field: &str) -> std::result::Result<(), String> {
    let bytes = hex_serde::decode(value).map_err(|e| format!("invalid {field} {value:?}: {e}"))?;
    if bytes.len() != len {
        return Err(format!(
            "invalid {field} {value:?}: expected {len} bytes, got {}",
            bytes.len()
        ));
    }
    Ok(())
}
