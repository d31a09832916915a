//! Strand Packets
//!
//! Splits a file into sub-manifests of fixed-size packets, names each packet
//! with its sequence number and signs it through an injected [`Signer`].
//! Reading is the mirror image: a single packet is rebuilt from disk and only
//! returned if its full name still matches the one that was asked for.

mod chunk;
mod descriptor;
mod error;
mod packet;
mod packetizer;
mod signer;

pub use chunk::ChunkPolicy;
pub use descriptor::{resolve_data_file, FileManifest, TorrentSegment};
pub use error::{PacketError, SignError};
pub use packet::{DataPacket, Signature};
pub use packetizer::{packet_offset, Packetizer};
pub use signer::{Sha256Signer, Signer};

pub type Result<T> = std::result::Result<T, PacketError>;
