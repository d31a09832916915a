//! Torrent descriptor and file manifest records
//!
//! Only the fields the rest of the workspace needs; the wire encoding of these
//! objects belongs to the transfer layer.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

use strand_name::Name;

use crate::error::PacketError;
use crate::packet::DataPacket;
use crate::Result;

/// Join `file_name` onto `data_dir`, refusing anything but plain relative components
pub fn resolve_data_file(data_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let relative = Path::new(file_name);
    let mut components = relative.components().peekable();
    if components.peek().is_none() || !components.all(|c| matches!(c, Component::Normal(_))) {
        return Err(PacketError::UnsafeFileName(file_name.to_string()));
    }
    Ok(data_dir.join(relative))
}

/// One segment of a torrent descriptor, listing manifest full names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentSegment {
    pub name: Name,
    pub manifest_names: Vec<Name>,
    pub next_segment: Option<Name>,
}

impl TorrentSegment {
    pub fn new(name: Name, manifest_names: Vec<Name>) -> Self {
        Self {
            name,
            manifest_names,
            next_segment: None,
        }
    }

    pub fn full_name(&self) -> Name {
        let mut hasher = Sha256::new();
        hasher.update(self.name.wire_bytes());
        for manifest in &self.manifest_names {
            hasher.update(manifest.wire_bytes());
        }
        if let Some(next) = &self.next_segment {
            hasher.update(next.wire_bytes());
        }
        self.name.clone().append_implicit_digest(hasher.finalize().into())
    }
}

/// One sub-manifest of a file: the full names of its packets, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileManifest {
    /// `<file prefix>/seq=<sub-manifest number>`
    pub name: Name,
    /// File name relative to the data directory
    pub file_name: String,
    pub data_packet_size: u64,
    pub catalog: Vec<Name>,
    pub next_sub_manifest: Option<Name>,
}

impl FileManifest {
    /// Build the manifest for packets produced from sub-manifest `index`
    pub fn from_packets(
        file_prefix: &Name,
        file_name: impl Into<String>,
        index: u64,
        data_packet_size: u64,
        packets: &[DataPacket],
    ) -> Self {
        Self {
            name: file_prefix.clone().append_sequence_number(index),
            file_name: file_name.into(),
            data_packet_size,
            catalog: packets.iter().map(DataPacket::full_name).collect(),
            next_sub_manifest: None,
        }
    }

    pub fn sub_manifest_number(&self) -> Option<u64> {
        self.name
            .without_digest()
            .get(-1)
            .and_then(|c| c.as_sequence_number())
    }

    /// Location of the described file under `data_dir`
    pub fn data_path(&self, data_dir: &Path) -> Result<PathBuf> {
        resolve_data_file(data_dir, &self.file_name)
    }

    pub fn contains(&self, packet_full_name: &Name) -> bool {
        self.catalog.contains(packet_full_name)
    }

    pub fn full_name(&self) -> Name {
        let mut hasher = Sha256::new();
        hasher.update(self.name.wire_bytes());
        hasher.update(self.file_name.as_bytes());
        hasher.update(self.data_packet_size.to_be_bytes());
        for packet in &self.catalog {
            hasher.update(packet.wire_bytes());
        }
        if let Some(next) = &self.next_sub_manifest {
            hasher.update(next.wire_bytes());
        }
        self.name.clone().append_implicit_digest(hasher.finalize().into())
    }
}
