//! Name components
//!
//! URI forms:
//! - generic text, percent-escaped outside the unreserved set
//! - `seq=<n>` for sequence numbers
//! - `sha256digest=<64 hex chars>` for implicit digests

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NameError;
use crate::Result;

const SEQUENCE_PREFIX: &str = "seq=";
const DIGEST_PREFIX: &str = "sha256digest=";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Component {
    /// Opaque bytes, usually UTF-8 text
    Generic(Vec<u8>),
    /// Ordinal index such as a segment or packet number
    SequenceNumber(u64),
    /// SHA-256 digest of a whole packet, the last component of a full name
    ImplicitSha256Digest([u8; 32]),
}

impl Component {
    pub fn generic(value: impl Into<Vec<u8>>) -> Self {
        Component::Generic(value.into())
    }

    pub fn sequence_number(value: u64) -> Self {
        Component::SequenceNumber(value)
    }

    pub fn is_sequence_number(&self) -> bool {
        matches!(self, Component::SequenceNumber(_))
    }

    pub fn is_implicit_digest(&self) -> bool {
        matches!(self, Component::ImplicitSha256Digest(_))
    }

    pub fn as_sequence_number(&self) -> Option<u64> {
        match self {
            Component::SequenceNumber(n) => Some(*n),
            _ => None,
        }
    }

    /// True if this is a generic component whose bytes equal `text`
    pub fn is_text(&self, text: &str) -> bool {
        matches!(self, Component::Generic(bytes) if bytes.as_slice() == text.as_bytes())
    }

    /// Bytes fed into packet digests and signatures.
    ///
    /// Each variant is tagged so `seq=1` and the text `"1"` never collide.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let (tag, value): (u8, Vec<u8>) = match self {
            Component::Generic(bytes) => (0x08, bytes.clone()),
            Component::SequenceNumber(n) => (0x3a, n.to_be_bytes().to_vec()),
            Component::ImplicitSha256Digest(digest) => (0x01, digest.to_vec()),
        };

        let mut out = Vec::with_capacity(value.len() + 9);
        out.push(tag);
        out.extend_from_slice(&(value.len() as u64).to_be_bytes());
        out.extend_from_slice(&value);
        out
    }

    pub fn to_uri(&self) -> String {
        match self {
            Component::Generic(bytes) => escape(bytes),
            Component::SequenceNumber(n) => format!("{}{}", SEQUENCE_PREFIX, n),
            Component::ImplicitSha256Digest(digest) => {
                format!("{}{}", DIGEST_PREFIX, hex::encode(digest))
            }
        }
    }

    /// Parse a single URI component (no slashes)
    pub fn parse(input: &str) -> Result<Self> {
        if input.contains('/') {
            return Err(NameError::InvalidComponent(input.to_string()));
        }

        if let Some(rest) = input.strip_prefix(SEQUENCE_PREFIX) {
            let n = rest
                .parse::<u64>()
                .map_err(|_| NameError::InvalidComponent(input.to_string()))?;
            return Ok(Component::SequenceNumber(n));
        }

        if let Some(rest) = input.strip_prefix(DIGEST_PREFIX) {
            let bytes = hex::decode(rest).map_err(|e| NameError::InvalidDigest(e.to_string()))?;
            let digest: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
                NameError::InvalidDigest(format!("expected 32 bytes, got {}", b.len()))
            })?;
            return Ok(Component::ImplicitSha256Digest(digest));
        }

        unescape(input).map(Component::Generic)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Component::Generic(value.as_bytes().to_vec())
    }
}

/// Everything outside `A-Z a-z 0-9 - . _ ~` is escaped
const COMPONENT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn escape(bytes: &[u8]) -> String {
    let escaped = percent_encode(bytes, COMPONENT_ESCAPE).to_string();
    // Components made only of periods would read as relative paths
    if bytes.iter().all(|b| *b == b'.') {
        format!("...{}", escaped)
    } else {
        escaped
    }
}

fn unescape(input: &str) -> Result<Vec<u8>> {
    let input = if !input.is_empty() && input.bytes().all(|b| b == b'.') {
        input
            .get(3..)
            .ok_or_else(|| NameError::InvalidComponent(input.to_string()))?
    } else {
        input
    };

    Ok(percent_decode_str(input).collect())
}
