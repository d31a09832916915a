//! Suffix-based name classification
//!
//! Names carry no explicit type field, so the role of a name is read off the
//! components at positions `len - 2` and `len - 3` (the last component of a
//! full name is its digest). First match wins:
//!
//! 1. either position is the text `torrent-file` → [`NameType::TorrentFile`]
//! 2. both positions are sequence numbers       → [`NameType::DataPacket`]
//! 3. only `len - 2` is a sequence number        → [`NameType::FileManifest`]
//! 4. anything else, or fewer than 3 components  → [`NameType::Unknown`]

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::name::Name;

pub const TORRENT_FILE_COMPONENT: &str = "torrent-file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameType {
    TorrentFile,
    FileManifest,
    DataPacket,
    Unknown,
}

impl NameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NameType::TorrentFile => "torrent_file",
            NameType::FileManifest => "file_manifest",
            NameType::DataPacket => "data_packet",
            NameType::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, NameType::Unknown)
    }
}

impl fmt::Display for NameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a name by the shape of its trailing components
pub fn classify(name: &Name) -> NameType {
    let (Some(second_last), Some(third_last)) = (name.get(-2), name.get(-3)) else {
        return NameType::Unknown;
    };

    if second_last.is_text(TORRENT_FILE_COMPONENT) || third_last.is_text(TORRENT_FILE_COMPONENT) {
        NameType::TorrentFile
    } else if second_last.is_sequence_number() && third_last.is_sequence_number() {
        NameType::DataPacket
    } else if second_last.is_sequence_number() {
        NameType::FileManifest
    } else {
        NameType::Unknown
    }
}

impl Name {
    pub fn name_type(&self) -> NameType {
        classify(self)
    }
}
