//! Peer state container
//!
//! Owns the catalog, the content store and the signer, and hands out
//! sequential fetchers that share them.

use std::fs;
use std::sync::Arc;

use strand_fetch::{DescriptorDirs, DownloadSession, SequentialFetcher, TransferManager};
use strand_name::{Name, TORRENT_FILE_COMPONENT};
use strand_packet::{
    resolve_data_file, DataPacket, FileManifest, Packetizer, Sha256Signer, Signer, TorrentSegment,
};
use strand_storage::{ContentStore, Database};

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

/// Descriptors produced by publishing one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub torrent: TorrentSegment,
    pub manifests: Vec<FileManifest>,
}

impl Publication {
    /// Full name other peers use to start a download
    pub fn torrent_file_name(&self) -> Name {
        self.torrent.full_name()
    }
}

#[derive(Clone)]
pub struct Peer {
    config: Config,
    db: Database,
    packetizer: Packetizer,
    store: ContentStore,
}

impl Peer {
    /// Open the catalog at `config.database_path` and sign with [`Sha256Signer`]
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = config.database_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Database::open(&config.database_path)?;

        Ok(Self::with_database(config, db, Arc::new(Sha256Signer::new())))
    }

    pub fn with_database(config: Config, db: Database, signer: Arc<dyn Signer>) -> Self {
        let packetizer = Packetizer::with_policy(signer, config.chunk_policy());
        let store = ContentStore::new(db.clone(), packetizer.clone());

        Self {
            config,
            db,
            packetizer,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Packetize `data_dir/<file_name>` and store its descriptors.
    ///
    /// The torrent is named `<prefix>/torrent-file`, the file `<prefix>/<file_name>`.
    /// Sub-manifests are handled one at a time and their packets dropped once
    /// catalogued as held, so only one sub-manifest is in memory at once.
    pub fn publish_file(&self, prefix: &Name, file_name: &str) -> Result<Publication> {
        let label = prefix
            .get(-1)
            .map(|c| c.to_uri())
            .ok_or_else(|| CoreError::Config("publish prefix must not be empty".to_string()))?;
        let path = resolve_data_file(&self.config.data_dir, file_name)?;
        let file_size = fs::metadata(&path)?.len();

        let packet_size = self.config.data_packet_size;
        let sub_manifest_size = self.config.sub_manifest_size;
        let manifest_bytes = packet_size.checked_mul(sub_manifest_size).ok_or_else(|| {
            CoreError::Config("sub-manifest byte length overflows".to_string())
        })?;
        let manifest_count = file_size.div_ceil(manifest_bytes).max(1);

        let dirs = DescriptorDirs::new(&self.config.data_dir, &label);
        let file_prefix = prefix.clone().append(file_name);
        let mut manifests = Vec::new();
        for index in 0..manifest_count {
            let packets = self.packetizer.packetize(
                &path,
                &file_prefix.clone().append_sequence_number(index),
                packet_size,
                sub_manifest_size,
                index,
            )?;
            let manifest =
                FileManifest::from_packets(&file_prefix, file_name, index, packet_size, &packets);

            self.store.write_file_manifest(&manifest, &dirs.manifests())?;
            for packet in &packets {
                self.store
                    .record_held_packet(packet, &manifest, sub_manifest_size)?;
            }
            manifests.push(manifest);
        }

        let torrent = TorrentSegment::new(
            prefix.clone().append(TORRENT_FILE_COMPONENT),
            manifests.iter().map(FileManifest::full_name).collect(),
        );
        self.store
            .write_torrent_segment(&torrent, &dirs.torrent_files())?;

        tracing::info!(
            torrent = %torrent.full_name(),
            file = %file_name,
            file_size,
            manifests = manifests.len(),
            "Published file"
        );

        Ok(Publication { torrent, manifests })
    }

    /// Rebuild a held packet for serving; `None` if it is not held intact
    pub fn read_data_packet(&self, full_name: &Name, manifest: &FileManifest) -> Result<Option<DataPacket>> {
        Ok(self.store.read_data_packet(
            full_name,
            manifest,
            self.config.sub_manifest_size,
            &self.config.data_dir,
        )?)
    }

    /// Store a received packet under this peer's data directory
    pub fn write_data(&self, packet: &DataPacket, manifest: &FileManifest) -> Result<()> {
        Ok(self.store.write_data(
            packet,
            manifest,
            self.config.sub_manifest_size,
            &self.config.data_dir,
        )?)
    }

    /// Build a fetcher for `torrent_file_name` over `manager`
    pub fn fetcher<M: TransferManager>(
        &self,
        torrent_file_name: Name,
        manager: M,
    ) -> Result<SequentialFetcher<M>> {
        let session =
            DownloadSession::new(torrent_file_name, &self.config.data_dir, self.config.seed)?;

        tracing::debug!(session_id = %session.id(), "Created download session");

        Ok(SequentialFetcher::with_retry_policy(
            session,
            manager,
            self.config.retry_policy(),
        ))
    }
}
