//! Packet signing service

use sha2::{Digest, Sha256};

use crate::error::SignError;
use crate::packet::{DataPacket, Signature};

/// Signing capability injected wherever packets are produced.
///
/// Implementations must be shareable across sessions; their own thread safety
/// is part of the contract.
pub trait Signer: Send + Sync {
    /// Name recorded in every signature this signer produces
    fn key_name(&self) -> &str;

    /// Sign raw bytes and return the signature value
    fn sign_bytes(&self, data: &[u8]) -> Result<Vec<u8>, SignError>;

    /// Sign a packet, returning the signed copy
    fn sign(&self, packet: DataPacket) -> Result<DataPacket, SignError> {
        let value = self.sign_bytes(&packet.signed_portion()).map_err(|e| SignError {
            name: packet.name().to_uri(),
            reason: e.reason,
        })?;
        Ok(packet.with_signature(Signature::new(self.key_name(), value)))
    }
}

/// Digest "signature": the SHA-256 of the signed portion. Deterministic.
#[derive(Debug, Clone, Default)]
pub struct Sha256Signer;

impl Sha256Signer {
    pub const KEY_NAME: &'static str = "digest-sha256";

    pub fn new() -> Self {
        Self
    }
}

impl Signer for Sha256Signer {
    fn key_name(&self) -> &str {
        Self::KEY_NAME
    }

    fn sign_bytes(&self, data: &[u8]) -> Result<Vec<u8>, SignError> {
        Ok(Sha256::digest(data).to_vec())
    }
}
