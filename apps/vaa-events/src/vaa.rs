//! Binary codec for signed VAAs (version 1).

use alloy::primitives::{keccak256, B256};
use serde::Serialize;
use thiserror::Error;

pub const SUPPORTED_VERSION: u8 = 1;
const SIGNATURE_LEN: usize = 65;
const HEADER_LEN: usize = 1 + 4 + 1;
const SIGNATURE_ENTRY_LEN: usize = 1 + SIGNATURE_LEN;
const BODY_FIXED_LEN: usize = 4 + 4 + 2 + 32 + 8 + 1;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VaaError {
    #[error("VAA is truncated: needed {needed} bytes at offset {offset}, have {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("unsupported VAA version {0}")]
    UnsupportedVersion(u8),

    #[error("VAA carries {0} signatures, at most 255 fit the signature count")]
    TooManySignatures(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub index: u8,
    #[serde(serialize_with = "crate::hex_serde::serialize")]
    pub signature: [u8; SIGNATURE_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    #[serde(serialize_with = "crate::hex_serde::serialize")]
    pub emitter_address: [u8; 32],
    pub sequence: u64,
    pub consistency_level: u8,
    #[serde(serialize_with = "crate::hex_serde::serialize")]
    pub payload: Vec<u8>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], VaaError> {
        let end = self.offset.checked_add(n).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(VaaError::Truncated {
                offset: self.offset,
                needed: n,
                len: self.bytes.len(),
            });
        };
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], VaaError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, VaaError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, VaaError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, VaaError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, VaaError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn rest(&mut self) -> &'a [u8] {
        let out = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        out
    }
}

impl Vaa {
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, VaaError> {
        let mut r = Reader { bytes, offset: 0 };

        let version = r.u8()?;
        if version != SUPPORTED_VERSION {
            return Err(VaaError::UnsupportedVersion(version));
        }
        let guardian_set_index = r.u32()?;

        let signature_count = r.u8()? as usize;
        let mut signatures = Vec::with_capacity(signature_count);
        for _ in 0..signature_count {
            let index = r.u8()?;
            let signature = r.array::<SIGNATURE_LEN>()?;
            signatures.push(Signature { index, signature });
        }

        Ok(Self {
            version,
            guardian_set_index,
            signatures,
            timestamp: r.u32()?,
            nonce: r.u32()?,
            emitter_chain: r.u16()?,
            emitter_address: r.array()?,
            sequence: r.u64()?,
            consistency_level: r.u8()?,
            payload: r.rest().to_vec(),
        })
    }

    pub fn marshal(&self) -> Result<Vec<u8>, VaaError> {
        let signature_count = u8::try_from(self.signatures.len())
            .map_err(|_| VaaError::TooManySignatures(self.signatures.len()))?;

        let mut out = Vec::with_capacity(
            HEADER_LEN + self.signatures.len() * SIGNATURE_ENTRY_LEN + BODY_FIXED_LEN + self.payload.len(),
        );
        out.push(self.version);
        out.extend_from_slice(&self.guardian_set_index.to_be_bytes());
        out.push(signature_count);
        for sig in &self.signatures {
            out.push(sig.index);
            out.extend_from_slice(&sig.signature);
        }
        out.extend_from_slice(&self.body());
        Ok(out)
    }

    /// The signed portion of the VAA.
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(BODY_FIXED_LEN + self.payload.len());
        body.extend_from_slice(&self.timestamp.to_be_bytes());
        body.extend_from_slice(&self.nonce.to_be_bytes());
        body.extend_from_slice(&self.emitter_chain.to_be_bytes());
        body.extend_from_slice(&self.emitter_address);
        body.extend_from_slice(&self.sequence.to_be_bytes());
        body.push(self.consistency_level);
        body.extend_from_slice(&self.payload);
        body
    }

    pub fn signing_digest(&self) -> B256 {
        keccak256(self.body())
    }

    pub fn hex_digest(&self) -> String {
        hex::encode(self.signing_digest())
    }
}
