//! Transfer manager boundary
//!
//! The transfer manager owns request issuance, descriptor bookkeeping and the
//! event loop. The orchestrator only queries it and asks it to issue requests;
//! completions come back through [`TransferHandler`], one at a time, from inside
//! [`TransferManager::process_events`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use strand_name::Name;
use strand_packet::DataPacket;

use crate::Result;

/// A named request that failed in the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalFailure {
    pub name: Name,
    pub error_code: String,
}

impl RetrievalFailure {
    pub fn new(name: Name, error_code: impl Into<String>) -> Self {
        Self {
            name,
            error_code: error_code.into(),
        }
    }
}

/// Queries and request issuance, usable from inside callbacks
pub trait RequestIssuer {
    fn has_all_torrent_segments(&self) -> bool;

    /// Full names of manifests listed by the torrent file but not yet held
    fn find_file_manifests_to_download(&self) -> Vec<Name>;

    /// Full names of packets listed by held manifests but not yet held
    fn find_all_missing_data_packets(&self) -> Vec<Name>;

    /// Request every missing torrent segment; they are stored under `path`
    fn download_torrent_file(&mut self, path: &Path);

    fn download_file_manifest(&mut self, name: &Name, path: &Path);

    fn download_data_packet(&mut self, name: &Name);

    /// Stop the event loop and release the face
    fn shutdown(&mut self);
}

pub trait TransferManager: RequestIssuer {
    fn initialize(&mut self) -> Result<()>;

    /// Run the event loop until it is shut down or `timeout` elapses.
    ///
    /// Every completed or failed request is reported to `handler`, which may
    /// issue further requests through the `RequestIssuer` it is given.
    fn process_events(&mut self, timeout: Duration, handler: &mut dyn TransferHandler) -> Result<()>;
}

/// Completion callbacks, invoked serially by the event loop
pub trait TransferHandler {
    /// A torrent segment arrived; `manifest_names` are the manifests it lists
    fn on_torrent_segment_received(&mut self, manager: &mut dyn RequestIssuer, manifest_names: &[Name]);

    /// A manifest arrived; `packet_names` are the packets it lists
    fn on_manifest_received(&mut self, manager: &mut dyn RequestIssuer, packet_names: &[Name]);

    /// A packet arrived and has already been recorded by the manager
    fn on_data_packet_received(&mut self, manager: &mut dyn RequestIssuer, packet: &DataPacket);

    fn on_retrieval_failure(&mut self, manager: &mut dyn RequestIssuer, failure: RetrievalFailure);
}
