//! Scripted transfer manager for orchestrator tests

use std::cell::Cell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use strand_name::Name;
use strand_packet::DataPacket;

use crate::transfer::{RequestIssuer, RetrievalFailure, TransferHandler, TransferManager};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    TorrentFile(PathBuf),
    Manifest(Name, PathBuf),
    DataPacket(Name),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum Event {
    /// The torrent file arrived, listing these manifests
    TorrentSegment(Vec<Name>),
    /// A manifest arrived, listing these packets
    Manifest(Name, Vec<Name>),
    Packet(DataPacket),
    Failure(RetrievalFailure),
}

#[derive(Debug, Default)]
pub struct MockTransferManager {
    pub has_torrent_file: bool,
    pub missing_manifests: Vec<Name>,
    pub missing_packets: Vec<Name>,
    pub requests: Vec<Request>,
    pub events: VecDeque<Event>,
    pub initialized: bool,
    pub shut_down: bool,
    pub last_timeout: Option<Duration>,
    pub queries: Cell<usize>,
}

impl MockTransferManager {
    fn count_query(&self) {
        self.queries.set(self.queries.get() + 1);
    }
}

impl RequestIssuer for MockTransferManager {
    fn has_all_torrent_segments(&self) -> bool {
        self.count_query();
        self.has_torrent_file
    }

    fn find_file_manifests_to_download(&self) -> Vec<Name> {
        self.count_query();
        self.missing_manifests.clone()
    }

    fn find_all_missing_data_packets(&self) -> Vec<Name> {
        self.count_query();
        self.missing_packets.clone()
    }

    fn download_torrent_file(&mut self, path: &Path) {
        self.requests.push(Request::TorrentFile(path.to_path_buf()));
    }

    fn download_file_manifest(&mut self, name: &Name, path: &Path) {
        self.requests
            .push(Request::Manifest(name.clone(), path.to_path_buf()));
    }

    fn download_data_packet(&mut self, name: &Name) {
        self.requests.push(Request::DataPacket(name.clone()));
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
        self.requests.push(Request::Shutdown);
    }
}

impl TransferManager for MockTransferManager {
    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    /// Replay scripted events until the queue is empty or the manager is shut down.
    ///
    /// Arrivals are marked as held before the handler sees them.
    fn process_events(&mut self, timeout: Duration, handler: &mut dyn TransferHandler) -> Result<()> {
        self.last_timeout = Some(timeout);

        while !self.shut_down {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            match event {
                Event::TorrentSegment(names) => {
                    self.has_torrent_file = true;
                    handler.on_torrent_segment_received(self, &names);
                }
                Event::Manifest(manifest, names) => {
                    self.missing_manifests.retain(|name| *name != manifest);
                    handler.on_manifest_received(self, &names);
                }
                Event::Packet(packet) => {
                    let full_name = packet.full_name();
                    self.missing_packets.retain(|name| *name != full_name);
                    handler.on_data_packet_received(self, &packet);
                }
                Event::Failure(failure) => handler.on_retrieval_failure(self, failure),
            }
        }

        Ok(())
    }
}
