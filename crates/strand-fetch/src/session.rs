//! Download session data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use strand_name::{classify, Name, NameType};

use crate::error::FetchError;
use crate::Result;

/// Directory under the data path holding per-torrent descriptors
const APPDATA_DIR: &str = ".appdata";

/// Where one torrent's descriptors live: `<data>/.appdata/<torrent>/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorDirs {
    root: PathBuf,
}

impl DescriptorDirs {
    pub fn new(data_path: &Path, torrent_label: &str) -> Self {
        Self {
            root: data_path.join(APPDATA_DIR).join(torrent_label),
        }
    }

    /// Where torrent segments are stored
    pub fn torrent_files(&self) -> PathBuf {
        self.root.join("torrent_files")
    }

    /// Where file manifests are stored
    pub fn manifests(&self) -> PathBuf {
        self.root.join("manifests")
    }
}

/// One peer's download of one torrent. Fixed once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSession {
    id: String,
    torrent_file_name: Name,
    data_path: PathBuf,
    seed: bool,
    created_at: DateTime<Utc>,
}

impl DownloadSession {
    pub fn new(torrent_file_name: Name, data_path: impl Into<PathBuf>, seed: bool) -> Result<Self> {
        if classify(&torrent_file_name) != NameType::TorrentFile {
            return Err(FetchError::InvalidTorrentName(torrent_file_name.to_uri()));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            torrent_file_name,
            data_path: data_path.into(),
            seed,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn torrent_file_name(&self) -> &Name {
        &self.torrent_file_name
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Keep serving other peers after completion instead of shutting down
    pub fn is_seeding(&self) -> bool {
        self.seed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The torrent's own name: the component before `torrent-file`
    pub fn torrent_label(&self) -> String {
        self.torrent_file_name
            .get(-3)
            .map(|c| c.to_uri())
            .unwrap_or_default()
    }

    pub fn descriptor_dirs(&self) -> DescriptorDirs {
        DescriptorDirs::new(&self.data_path, &self.torrent_label())
    }

    pub fn torrent_path(&self) -> PathBuf {
        self.descriptor_dirs().torrent_files()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.descriptor_dirs().manifests()
    }
}
