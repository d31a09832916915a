//! Download stage, derived from completeness queries

use std::fmt;

use strand_name::Name;

use crate::transfer::RequestIssuer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStage {
    /// Some torrent segments are missing
    NeedTorrentFile,
    /// Torrent file complete; these manifests are missing
    NeedManifests(Vec<Name>),
    /// Manifests complete; these packets are missing
    NeedDataPackets(Vec<Name>),
    /// Nothing is missing
    Complete,
}

impl DownloadStage {
    /// Walk torrent file → manifests → packets, stopping at the first level
    /// that is incomplete. Later levels are not queried until earlier ones are
    /// confirmed complete.
    pub fn evaluate(manager: &dyn RequestIssuer) -> Self {
        if !manager.has_all_torrent_segments() {
            return DownloadStage::NeedTorrentFile;
        }

        let manifests = manager.find_file_manifests_to_download();
        if !manifests.is_empty() {
            return DownloadStage::NeedManifests(manifests);
        }

        let packets = manager.find_all_missing_data_packets();
        if !packets.is_empty() {
            return DownloadStage::NeedDataPackets(packets);
        }

        DownloadStage::Complete
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, DownloadStage::Complete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStage::NeedTorrentFile => "need_torrent_file",
            DownloadStage::NeedManifests(_) => "need_manifests",
            DownloadStage::NeedDataPackets(_) => "need_data_packets",
            DownloadStage::Complete => "complete",
        }
    }
}

impl fmt::Display for DownloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
