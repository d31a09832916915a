//! File packetization and single-packet reconstruction

use bytes::Bytes;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use strand_name::Name;

use crate::chunk::ChunkPolicy;
use crate::descriptor::FileManifest;
use crate::error::PacketError;
use crate::packet::DataPacket;
use crate::signer::Signer;
use crate::Result;

/// Byte offset of packet `packet_num` in sub-manifest `sub_manifest_num`
pub fn packet_offset(
    sub_manifest_num: u64,
    packet_num: u64,
    sub_manifest_size: u64,
    data_packet_size: u64,
) -> Result<u64> {
    sub_manifest_num
        .checked_mul(sub_manifest_size)
        .and_then(|n| n.checked_add(packet_num))
        .and_then(|n| n.checked_mul(data_packet_size))
        .ok_or_else(|| {
            PacketError::OutOfRange(format!(
                "packet {} of sub-manifest {} overflows the file offset",
                packet_num, sub_manifest_num
            ))
        })
}

#[derive(Clone)]
pub struct Packetizer {
    signer: Arc<dyn Signer>,
    policy: ChunkPolicy,
}

impl Packetizer {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self::with_policy(signer, ChunkPolicy::default())
    }

    pub fn with_policy(signer: Arc<dyn Signer>, policy: ChunkPolicy) -> Self {
        Self { signer, policy }
    }

    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }

    /// Split sub-manifest `sub_manifest_index` of a file into signed packets.
    ///
    /// Packets are named `common_prefix/seq=<i>` with `i` counting from zero
    /// within this call. Either every packet is signed and returned, or the
    /// call fails.
    pub fn packetize(
        &self,
        file_path: &Path,
        common_prefix: &Name,
        data_packet_size: u64,
        sub_manifest_size: u64,
        sub_manifest_index: u64,
    ) -> Result<Vec<DataPacket>> {
        if data_packet_size == 0 {
            return Err(PacketError::InvalidPacketSize);
        }

        let mut file = File::open(file_path)?;
        let file_size = file.metadata()?.len();

        let nominal_length = sub_manifest_size
            .checked_mul(data_packet_size)
            .ok_or_else(|| {
                PacketError::OutOfRange(format!(
                    "{} packets of {} bytes overflow a sub-manifest",
                    sub_manifest_size, data_packet_size
                ))
            })?;
        let start_offset = packet_offset(sub_manifest_index, 0, sub_manifest_size, data_packet_size)?;
        let remaining_file = file_size.checked_sub(start_offset).ok_or_else(|| {
            PacketError::OutOfRange(format!(
                "sub-manifest {} starts at {} beyond file size {}",
                sub_manifest_index, start_offset, file_size
            ))
        })?;
        let sub_manifest_length = nominal_length.min(remaining_file);

        let packet_len = to_usize(data_packet_size)?;
        let mut packets =
            Vec::with_capacity(to_usize(sub_manifest_length.div_ceil(data_packet_size))?);

        file.seek(SeekFrom::Start(start_offset))?;

        let mut bytes_read = 0u64;
        while bytes_read < sub_manifest_length {
            let chunk_len = self
                .policy
                .chunk_len(data_packet_size, sub_manifest_length - bytes_read);
            let mut buffer = vec![0u8; to_usize(chunk_len)?];
            file.read_exact(&mut buffer)?;
            let chunk = Bytes::from(buffer);

            let mut offset = 0;
            while offset < chunk.len() {
                let end = offset.saturating_add(packet_len).min(chunk.len());
                let name = common_prefix
                    .clone()
                    .append_sequence_number(packets.len() as u64);
                packets.push(DataPacket::new(name, chunk.slice(offset..end)));
                offset = end;
            }

            bytes_read += chunk_len;
        }

        let signed = packets
            .into_iter()
            .map(|packet| self.signer.sign(packet))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!(
            prefix = %common_prefix,
            sub_manifest = sub_manifest_index,
            start_offset,
            length = sub_manifest_length,
            packets = signed.len(),
            "Packetized sub-manifest"
        );

        Ok(signed)
    }

    /// Rebuild one packet from `data_dir/<manifest file name>`.
    ///
    /// Returns `None` when the bytes are missing or the rebuilt packet's full
    /// name differs from `packet_full_name`.
    pub fn read_data_packet(
        &self,
        packet_full_name: &Name,
        manifest: &FileManifest,
        sub_manifest_size: u64,
        data_dir: &Path,
    ) -> Result<Option<DataPacket>> {
        let invalid = || PacketError::InvalidName(packet_full_name.to_uri());

        if !packet_full_name
            .get(-1)
            .is_some_and(|c| c.is_implicit_digest())
        {
            return Err(invalid());
        }
        let packet_name = packet_full_name.without_digest();
        let sub_manifest_num = packet_name
            .get(-2)
            .and_then(|c| c.as_sequence_number())
            .ok_or_else(invalid)?;
        let packet_num = packet_name
            .get(-1)
            .and_then(|c| c.as_sequence_number())
            .ok_or_else(invalid)?;

        let data_packet_size = manifest.data_packet_size;
        if data_packet_size == 0 {
            return Err(PacketError::InvalidPacketSize);
        }
        let offset = packet_offset(sub_manifest_num, packet_num, sub_manifest_size, data_packet_size)?;

        let path = manifest.data_path(data_dir)?;
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file_size = file.metadata()?.len();
        if offset >= file_size {
            return Ok(None);
        }

        let read_len = data_packet_size.min(file_size - offset);
        let mut buffer = vec![0u8; to_usize(read_len)?];
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;

        let packet = self.signer.sign(DataPacket::new(packet_name, buffer))?;
        if packet.full_name() == *packet_full_name {
            Ok(Some(packet))
        } else {
            tracing::warn!(
                name = %packet_full_name,
                path = %path.display(),
                "Stored packet does not match requested full name"
            );
            Ok(None)
        }
    }
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| PacketError::OutOfRange(format!("{} bytes exceed addressable memory", value)))
}
