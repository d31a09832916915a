//! Data packet structure

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;

use strand_name::Name;

/// A signature attached to a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Name of the key (or digest scheme) that produced the value
    pub key_name: String,
    pub value: Vec<u8>,
}

impl Signature {
    pub fn new(key_name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key_name: key_name.into(),
            value,
        }
    }
}

/// An immutable named unit of content.
///
/// Packets are built unsigned by the packetizer and become signed exactly once
/// through [`DataPacket::with_signature`].
#[derive(Clone, PartialEq, Eq)]
pub struct DataPacket {
    name: Name,
    content: Bytes,
    signature: Option<Signature>,
}

impl DataPacket {
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            signature: None,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn with_signature(self, signature: Signature) -> Self {
        Self {
            signature: Some(signature),
            ..self
        }
    }

    /// Sequence number carried by the last name component
    pub fn sequence_number(&self) -> Option<u64> {
        self.name.get(-1).and_then(|c| c.as_sequence_number())
    }

    /// Bytes covered by the signature: name then length-prefixed content
    pub fn signed_portion(&self) -> Vec<u8> {
        let mut out = self.name.wire_bytes();
        out.extend_from_slice(&(self.content.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.content);
        out
    }

    /// Canonical encoding of the whole packet, signature included
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.signed_portion();
        if let Some(signature) = &self.signature {
            out.extend_from_slice(&(signature.key_name.len() as u64).to_be_bytes());
            out.extend_from_slice(signature.key_name.as_bytes());
            out.extend_from_slice(&(signature.value.len() as u64).to_be_bytes());
            out.extend_from_slice(&signature.value);
        }
        out
    }

    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.encode()).into()
    }

    /// Name with the implicit SHA-256 digest of the encoded packet appended
    pub fn full_name(&self) -> Name {
        self.name.clone().append_implicit_digest(self.digest())
    }
}

impl fmt::Debug for DataPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPacket")
            .field("name", &self.name.to_uri())
            .field("content_len", &self.content.len())
            .field("signed", &self.is_signed())
            .finish()
    }
}
