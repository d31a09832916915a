//! Content store adapter
//!
//! Boundary between a transfer and durable storage. Every write both lands on
//! disk and is recorded in the [`Database`] catalog.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use strand_name::Name;
use strand_packet::{packet_offset, DataPacket, FileManifest, Packetizer, TorrentSegment};

use crate::database::{Database, PacketRecord};
use crate::error::StorageError;
use crate::Result;

#[derive(Clone)]
pub struct ContentStore {
    db: Database,
    packetizer: Packetizer,
}

impl ContentStore {
    pub fn new(db: Database, packetizer: Packetizer) -> Self {
        Self { db, packetizer }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Write a torrent segment as JSON into `dir`
    pub fn write_torrent_segment(&self, segment: &TorrentSegment, dir: &Path) -> Result<PathBuf> {
        let full_name = segment.full_name();
        let path = write_json(dir, &full_name, segment)?;
        self.db.record_torrent_segment(&full_name, &path)?;

        tracing::debug!(name = %full_name, path = %path.display(), "Stored torrent segment");

        Ok(path)
    }

    /// Write a file manifest as JSON into `dir`
    pub fn write_file_manifest(&self, manifest: &FileManifest, dir: &Path) -> Result<PathBuf> {
        let full_name = manifest.full_name();
        let path = write_json(dir, &full_name, manifest)?;
        self.db
            .record_file_manifest(&full_name, &manifest.file_name, &path)?;

        tracing::debug!(
            name = %full_name,
            packets = manifest.catalog.len(),
            "Stored file manifest"
        );

        Ok(path)
    }

    /// Write a packet's content at its offset in `data_dir/<manifest file name>`.
    ///
    /// The packet must be listed in `manifest`.
    pub fn write_data(
        &self,
        packet: &DataPacket,
        manifest: &FileManifest,
        sub_manifest_size: u64,
        data_dir: &Path,
    ) -> Result<()> {
        let (full_name, record) = placement(packet, manifest, sub_manifest_size)?;

        let path = manifest.data_path(data_dir)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.seek(SeekFrom::Start(record.byte_offset))?;
        file.write_all(packet.content())?;
        file.sync_data()?;

        self.db.record_data_packet(&full_name, &record)?;

        tracing::trace!(name = %full_name, byte_offset = record.byte_offset, "Stored data packet");

        Ok(())
    }

    /// Catalog a packet whose bytes are already in place, as when publishing a local file
    pub fn record_held_packet(
        &self,
        packet: &DataPacket,
        manifest: &FileManifest,
        sub_manifest_size: u64,
    ) -> Result<()> {
        let (full_name, record) = placement(packet, manifest, sub_manifest_size)?;
        self.db.record_data_packet(&full_name, &record)
    }

    /// Rebuild a stored packet.
    ///
    /// `None` if the catalog does not hold it under `manifest`, or if the bytes
    /// on disk fail the full-name check.
    pub fn read_data_packet(
        &self,
        packet_full_name: &Name,
        manifest: &FileManifest,
        sub_manifest_size: u64,
        data_dir: &Path,
    ) -> Result<Option<DataPacket>> {
        let Some(record) = self.db.packet_record(packet_full_name)? else {
            tracing::trace!(name = %packet_full_name, "Packet not in catalog");
            return Ok(None);
        };
        if record.manifest_name != manifest.full_name() {
            tracing::warn!(
                name = %packet_full_name,
                catalogued = %record.manifest_name,
                "Packet is catalogued under another manifest"
            );
            return Ok(None);
        }

        let packet = self
            .packetizer
            .read_data_packet(packet_full_name, manifest, sub_manifest_size, data_dir)?;
        if let Some(packet) = &packet {
            if packet.content().len() as u64 != record.length {
                tracing::warn!(
                    name = %packet_full_name,
                    length = packet.content().len(),
                    catalogued = record.length,
                    "Stored packet length differs from catalog"
                );
                return Ok(None);
            }
        }
        Ok(packet)
    }

    pub fn load_torrent_segment(&self, full_name: &Name) -> Result<Option<TorrentSegment>> {
        match self.db.torrent_segment_path(full_name)? {
            Some(path) => read_json(&path),
            None => Ok(None),
        }
    }

    pub fn load_file_manifest(&self, full_name: &Name) -> Result<Option<FileManifest>> {
        match self.db.file_manifest_path(full_name)? {
            Some(path) => read_json(&path),
            None => Ok(None),
        }
    }

    pub fn has_torrent_segment(&self, full_name: &Name) -> Result<bool> {
        Ok(self.db.torrent_segment_path(full_name)?.is_some())
    }

    pub fn has_file_manifest(&self, full_name: &Name) -> Result<bool> {
        Ok(self.db.file_manifest_path(full_name)?.is_some())
    }

    pub fn has_data_packet(&self, full_name: &Name) -> Result<bool> {
        self.db.has_data_packet(full_name)
    }

    /// Catalog entries of `manifest` that have not been stored yet
    pub fn missing_packets(&self, manifest: &FileManifest) -> Result<Vec<Name>> {
        let mut missing = Vec::new();
        for name in &manifest.catalog {
            if !self.db.has_data_packet(name)? {
                missing.push(name.clone());
            }
        }
        Ok(missing)
    }
}

/// Check manifest membership and work out where the packet lives in the file
fn placement(
    packet: &DataPacket,
    manifest: &FileManifest,
    sub_manifest_size: u64,
) -> Result<(Name, PacketRecord)> {
    let full_name = packet.full_name();
    if !manifest.contains(&full_name) {
        return Err(StorageError::NotInManifest(full_name.to_uri()));
    }

    let name = packet.name();
    let (sub_manifest, seq) = match (
        name.get(-2).and_then(|c| c.as_sequence_number()),
        name.get(-1).and_then(|c| c.as_sequence_number()),
    ) {
        (Some(sub_manifest), Some(seq)) => (sub_manifest, seq),
        _ => return Err(StorageError::InvalidName(name.to_uri())),
    };
    let byte_offset = packet_offset(sub_manifest, seq, sub_manifest_size, manifest.data_packet_size)?;

    let record = PacketRecord {
        manifest_name: manifest.full_name(),
        sub_manifest,
        seq,
        byte_offset,
        length: packet.content().len() as u64,
    };
    Ok((full_name, record))
}

/// Files are named after the hex digest of the object's full name
fn file_name_for(full_name: &Name) -> Result<String> {
    match full_name.get(-1) {
        Some(strand_name::Component::ImplicitSha256Digest(digest)) => {
            Ok(format!("{}.json", hex::encode(digest)))
        }
        _ => Err(StorageError::InvalidName(full_name.to_uri())),
    }
}

fn write_json<T: serde::Serialize>(dir: &Path, full_name: &Name, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name_for(full_name)?);
    fs::write(&path, serde_json::to_vec_pretty(value)?)?;
    Ok(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Catalogued file is missing");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
