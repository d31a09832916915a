//! Sequential fetcher
//!
//! Issues requests for whatever the download is missing, reacts to completions
//! by pipelining the next level, and routes failures by name type.
//!
//! Completion is checked against the manager's queries whenever the requests
//! this fetcher issued have all been answered, not on every single callback.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use strand_name::{classify, Name, NameType};
use strand_packet::DataPacket;

use crate::error::FetchError;
use crate::retry::{AlwaysRetry, RetryDecision, RetryPolicy};
use crate::session::DownloadSession;
use crate::stage::DownloadStage;
use crate::transfer::{RequestIssuer, RetrievalFailure, TransferHandler, TransferManager};
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    pub torrent_segments_received: u64,
    pub manifests_received: u64,
    pub packets_received: u64,
    pub failures: u64,
    pub retries: u64,
}

pub struct SequentialFetcher<M: TransferManager> {
    manager: M,
    cascade: Cascade,
}

impl<M: TransferManager> SequentialFetcher<M> {
    pub fn new(session: DownloadSession, manager: M) -> Self {
        Self::with_retry_policy(session, manager, Box::new(AlwaysRetry))
    }

    pub fn with_retry_policy(
        session: DownloadSession,
        manager: M,
        retry: Box<dyn RetryPolicy>,
    ) -> Self {
        Self {
            manager,
            cascade: Cascade {
                session,
                retry,
                stats: FetchStats::default(),
                unrecoverable: Vec::new(),
                outstanding: 0,
                finished: false,
            },
        }
    }

    /// Issue the initial requests, then block in the manager's event loop
    pub fn start(&mut self, timeout: Duration) -> Result<()> {
        self.manager.initialize()?;

        tracing::info!(
            session_id = %self.cascade.session.id(),
            torrent = %self.cascade.session.torrent_file_name(),
            seed = self.cascade.session.is_seeding(),
            "Starting download"
        );

        self.cascade.advance(&mut self.manager);
        self.manager.process_events(timeout, &mut self.cascade)
    }

    pub fn pause(&mut self) -> Result<()> {
        Err(FetchError::NotImplemented("pause"))
    }

    pub fn resume(&mut self) -> Result<()> {
        Err(FetchError::NotImplemented("resume"))
    }

    /// Current stage, recomputed from the manager
    pub fn stage(&self) -> DownloadStage {
        DownloadStage::evaluate(&self.manager)
    }

    pub fn session(&self) -> &DownloadSession {
        &self.cascade.session
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut M {
        &mut self.manager
    }

    pub fn stats(&self) -> FetchStats {
        self.cascade.stats
    }

    /// Failures that were not retried
    pub fn unrecoverable_failures(&self) -> &[RetrievalFailure] {
        &self.cascade.unrecoverable
    }

    /// Requests issued by this fetcher that have not been answered yet
    pub fn outstanding_requests(&self) -> usize {
        self.cascade.outstanding
    }
}

/// Callback state, kept apart from the manager so both can be borrowed mutably
struct Cascade {
    session: DownloadSession,
    retry: Box<dyn RetryPolicy>,
    stats: FetchStats,
    unrecoverable: Vec<RetrievalFailure>,
    outstanding: usize,
    finished: bool,
}

impl Cascade {
    fn advance(&mut self, manager: &mut dyn RequestIssuer) {
        let stage = DownloadStage::evaluate(manager);
        tracing::info!(stage = %stage, "Evaluated download stage");

        match stage {
            DownloadStage::NeedTorrentFile => self.request_torrent_file(manager),
            DownloadStage::NeedManifests(names) => self.request_manifests(manager, &names),
            DownloadStage::NeedDataPackets(names) => self.request_packets(manager, &names),
            DownloadStage::Complete => self.finish(manager),
        }
    }

    fn request_torrent_file(&mut self, manager: &mut dyn RequestIssuer) {
        self.outstanding += 1;
        manager.download_torrent_file(&self.session.torrent_path());
    }

    fn request_manifests(&mut self, manager: &mut dyn RequestIssuer, names: &[Name]) {
        let path = self.session.manifest_path();
        self.outstanding += names.len();
        for name in names {
            manager.download_file_manifest(name, &path);
        }
    }

    fn request_packets(&mut self, manager: &mut dyn RequestIssuer, names: &[Name]) {
        self.outstanding += names.len();
        for name in names {
            manager.download_data_packet(name);
        }
    }

    /// One issued request was answered
    fn answered(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }

    /// With nothing in flight, ask the manager whether anything is still missing
    fn settle(&mut self, manager: &mut dyn RequestIssuer) {
        if self.finished || self.outstanding > 0 {
            return;
        }

        let stage = DownloadStage::evaluate(manager);
        tracing::debug!(stage = %stage, "No requests in flight");
        if stage.is_complete() {
            self.finish(manager);
        }
    }

    fn finish(&mut self, manager: &mut dyn RequestIssuer) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.retry.reset();

        if self.session.is_seeding() {
            tracing::info!(session_id = %self.session.id(), "Download complete, seeding");
        } else {
            tracing::info!(session_id = %self.session.id(), "Download complete, shutting down");
            manager.shutdown();
        }
    }

    fn give_up(&mut self, failure: RetrievalFailure) {
        tracing::error!(
            name = %failure.name,
            error_code = %failure.error_code,
            "Giving up on request"
        );
        self.unrecoverable.push(failure);
    }
}

impl TransferHandler for Cascade {
    fn on_torrent_segment_received(&mut self, manager: &mut dyn RequestIssuer, manifest_names: &[Name]) {
        self.stats.torrent_segments_received += 1;
        self.answered();
        self.retry.record_success(self.session.torrent_file_name());
        tracing::debug!(manifests = manifest_names.len(), "Torrent segment received");

        self.request_manifests(manager, manifest_names);
        self.settle(manager);
    }

    fn on_manifest_received(&mut self, manager: &mut dyn RequestIssuer, packet_names: &[Name]) {
        self.stats.manifests_received += 1;
        self.answered();
        tracing::debug!(packets = packet_names.len(), "Manifest received");

        self.request_packets(manager, packet_names);
        self.settle(manager);
    }

    fn on_data_packet_received(&mut self, manager: &mut dyn RequestIssuer, packet: &DataPacket) {
        self.stats.packets_received += 1;
        self.answered();
        self.retry.record_success(&packet.full_name());
        tracing::trace!(name = %packet.name(), "Data packet received");

        self.settle(manager);
    }

    fn on_retrieval_failure(&mut self, manager: &mut dyn RequestIssuer, failure: RetrievalFailure) {
        self.stats.failures += 1;
        self.answered();

        let kind = classify(&failure.name);
        if kind == NameType::Unknown {
            tracing::error!(
                name = %failure.name,
                error_code = %failure.error_code,
                "Failed request has an unknown name type"
            );
            self.unrecoverable.push(failure);
            self.settle(manager);
            return;
        }

        tracing::error!(
            name = %failure.name,
            kind = %kind,
            error_code = %failure.error_code,
            "Request failed"
        );

        if self.retry.decide(&failure, kind) == RetryDecision::GiveUp {
            self.give_up(failure);
            self.settle(manager);
            return;
        }

        self.stats.retries += 1;
        tracing::debug!(name = %failure.name, kind = %kind, "Retrying request");

        match kind {
            NameType::TorrentFile => self.request_torrent_file(manager),
            NameType::FileManifest => {
                self.request_manifests(manager, std::slice::from_ref(&failure.name))
            }
            NameType::DataPacket => self.request_packets(manager, std::slice::from_ref(&failure.name)),
            NameType::Unknown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, MockTransferManager, Request};
    use crate::retry::CappedRetry;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn session(seed: bool) -> DownloadSession {
        let name: Name = "/NTORRENT/linux/torrent-file".parse().unwrap();
        DownloadSession::new(name.append_implicit_digest([9; 32]), "/data", seed).unwrap()
    }

    fn manifest_name(index: u64) -> Name {
        "/NTORRENT/linux/a.bin"
            .parse::<Name>()
            .unwrap()
            .append_sequence_number(index)
            .append_implicit_digest([index as u8; 32])
    }

    fn packet(seq: u64) -> DataPacket {
        let name = "/NTORRENT/linux/a.bin"
            .parse::<Name>()
            .unwrap()
            .append_sequence_number(0)
            .append_sequence_number(seq);
        DataPacket::new(name, vec![seq as u8; 16])
    }

    fn manifest_path() -> std::path::PathBuf {
        "/data/.appdata/linux/manifests".into()
    }

    fn fetcher(manager: MockTransferManager, seed: bool) -> SequentialFetcher<MockTransferManager> {
        SequentialFetcher::new(session(seed), manager)
    }

    #[test]
    fn test_start_requests_only_torrent_file() {
        let mut manager = MockTransferManager::default();
        manager.missing_manifests = vec![manifest_name(0)];
        manager.missing_packets = vec![packet(0).full_name()];

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(
            fetcher.manager().requests,
            vec![Request::TorrentFile("/data/.appdata/linux/torrent_files".into())]
        );
    }

    #[test]
    fn test_start_initializes_and_passes_timeout() {
        let mut fetcher = fetcher(MockTransferManager::default(), false);
        fetcher.start(TIMEOUT).unwrap();

        assert!(fetcher.manager().initialized);
        assert_eq!(fetcher.manager().last_timeout, Some(TIMEOUT));
    }

    #[test]
    fn test_start_requests_single_missing_packet() {
        let missing = packet(3).full_name();
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = vec![missing.clone()];

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(fetcher.manager().requests, vec![Request::DataPacket(missing)]);
    }

    #[test]
    fn test_start_requests_every_missing_manifest() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_manifests = vec![manifest_name(0), manifest_name(1)];
        manager.missing_packets = vec![packet(0).full_name()];

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(
            fetcher.manager().requests,
            vec![
                Request::Manifest(manifest_name(0), manifest_path()),
                Request::Manifest(manifest_name(1), manifest_path()),
            ]
        );
    }

    #[test]
    fn test_manifest_failure_retries_that_name_once() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_manifests = vec![manifest_name(0), manifest_name(1)];
        manager
            .events
            .push_back(Event::Failure(RetrievalFailure::new(manifest_name(1), "nack")));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        let requests = &fetcher.manager().requests;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2], Request::Manifest(manifest_name(1), manifest_path()));
        assert_eq!(fetcher.stats().retries, 1);
        assert!(fetcher.unrecoverable_failures().is_empty());
    }

    #[test]
    fn test_data_packet_failure_retries_that_name() {
        let missing = packet(1).full_name();
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = vec![missing.clone()];
        manager
            .events
            .push_back(Event::Failure(RetrievalFailure::new(missing.clone(), "timeout")));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(
            fetcher.manager().requests,
            vec![
                Request::DataPacket(missing.clone()),
                Request::DataPacket(missing)
            ]
        );
    }

    #[test]
    fn test_torrent_file_failure_reissues_torrent_request() {
        let mut manager = MockTransferManager::default();
        manager.events.push_back(Event::Failure(RetrievalFailure::new(
            session(false).torrent_file_name().clone(),
            "timeout",
        )));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        let torrent_path: std::path::PathBuf = "/data/.appdata/linux/torrent_files".into();
        assert_eq!(
            fetcher.manager().requests,
            vec![
                Request::TorrentFile(torrent_path.clone()),
                Request::TorrentFile(torrent_path)
            ]
        );
    }

    #[test]
    fn test_unknown_failure_is_surfaced_not_retried() {
        let missing = packet(0).full_name();
        let unknown: Name = "/some/other/name".parse().unwrap();
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = vec![missing.clone()];
        manager
            .events
            .push_back(Event::Failure(RetrievalFailure::new(unknown.clone(), "nack")));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(fetcher.manager().requests, vec![Request::DataPacket(missing)]);
        assert_eq!(fetcher.unrecoverable_failures().len(), 1);
        assert_eq!(fetcher.unrecoverable_failures()[0].name, unknown);
        assert_eq!(fetcher.stats().failures, 1);
        assert_eq!(fetcher.stats().retries, 0);
    }

    #[test]
    fn test_capped_retry_gives_up() {
        let failed = RetrievalFailure::new(manifest_name(0), "nack");
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_manifests = vec![manifest_name(0)];
        manager.events.push_back(Event::Failure(failed.clone()));
        manager.events.push_back(Event::Failure(failed.clone()));

        let mut fetcher =
            SequentialFetcher::with_retry_policy(session(false), manager, Box::new(CappedRetry::new(1)));
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(fetcher.manager().requests.len(), 2);
        assert_eq!(fetcher.unrecoverable_failures(), &[failed]);
        assert_eq!(fetcher.stats().failures, 2);
        assert_eq!(fetcher.stats().retries, 1);
    }

    #[test]
    fn test_completions_pipeline_next_level() {
        let mut manager = MockTransferManager::default();
        manager
            .events
            .push_back(Event::TorrentSegment(vec![manifest_name(0), manifest_name(1)]));
        manager.events.push_back(Event::Manifest(
            manifest_name(0),
            vec![packet(0).full_name(), packet(1).full_name()],
        ));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        let requests = &fetcher.manager().requests;
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[1], Request::Manifest(manifest_name(0), manifest_path()));
        assert_eq!(requests[2], Request::Manifest(manifest_name(1), manifest_path()));
        assert_eq!(requests[3], Request::DataPacket(packet(0).full_name()));
        assert_eq!(requests[4], Request::DataPacket(packet(1).full_name()));

        let stats = fetcher.stats();
        assert_eq!(stats.torrent_segments_received, 1);
        assert_eq!(stats.manifests_received, 1);
    }

    #[test]
    fn test_empty_manifest_completes_download() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_manifests = vec![manifest_name(0)];
        manager
            .events
            .push_back(Event::Manifest(manifest_name(0), Vec::new()));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(
            fetcher.manager().requests,
            vec![
                Request::Manifest(manifest_name(0), manifest_path()),
                Request::Shutdown
            ]
        );
        assert_eq!(fetcher.outstanding_requests(), 0);
    }

    #[test]
    fn test_torrent_without_manifests_completes_download() {
        let mut manager = MockTransferManager::default();
        manager.events.push_back(Event::TorrentSegment(Vec::new()));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(fetcher.manager().requests.last(), Some(&Request::Shutdown));
        assert!(fetcher.stage().is_complete());
    }

    #[test]
    fn test_completion_checked_only_when_nothing_in_flight() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = (0..3).map(|seq| packet(seq).full_name()).collect();
        for seq in 0..3 {
            manager.events.push_back(Event::Packet(packet(seq)));
        }

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        // one full cascade at start, one after the last packet
        assert_eq!(fetcher.manager().queries.get(), 6);
        assert_eq!(fetcher.manager().requests.last(), Some(&Request::Shutdown));
        assert_eq!(fetcher.stats().packets_received, 3);
    }

    #[test]
    fn test_received_packet_clears_retry_count() {
        let p0 = packet(0).full_name();
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = vec![p0.clone(), packet(1).full_name()];
        let failed = RetrievalFailure::new(p0.clone(), "timeout");
        manager.events.push_back(Event::Failure(failed.clone()));
        manager.events.push_back(Event::Packet(packet(0)));
        manager.events.push_back(Event::Failure(failed));

        let mut fetcher =
            SequentialFetcher::with_retry_policy(session(false), manager, Box::new(CappedRetry::new(1)));
        fetcher.start(TIMEOUT).unwrap();

        let retried = fetcher
            .manager()
            .requests
            .iter()
            .filter(|r| **r == Request::DataPacket(p0.clone()))
            .count();
        assert_eq!(retried, 3);
        assert!(fetcher.unrecoverable_failures().is_empty());
    }

    #[test]
    fn test_packet_received_while_incomplete_issues_nothing() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = vec![packet(0).full_name(), packet(1).full_name()];
        manager.events.push_back(Event::Packet(packet(0)));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(fetcher.manager().requests.len(), 2);
        assert!(!fetcher.manager().shut_down);
        assert_eq!(fetcher.stats().packets_received, 1);
        assert!(matches!(fetcher.stage(), DownloadStage::NeedDataPackets(names) if names.len() == 1));
    }

    #[test]
    fn test_last_packet_shuts_down() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = vec![packet(0).full_name()];
        manager.events.push_back(Event::Packet(packet(0)));

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(fetcher.manager().requests.last(), Some(&Request::Shutdown));
        assert!(fetcher.stage().is_complete());
    }

    #[test]
    fn test_seeding_never_shuts_down() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;
        manager.missing_packets = vec![packet(0).full_name()];
        manager.events.push_back(Event::Packet(packet(0)));

        let mut fetcher = fetcher(manager, true);
        fetcher.start(TIMEOUT).unwrap();

        assert!(!fetcher.manager().shut_down);
        assert!(!fetcher.manager().requests.contains(&Request::Shutdown));
        assert!(fetcher.stage().is_complete());
    }

    #[test]
    fn test_already_complete_shuts_down_on_start() {
        let mut manager = MockTransferManager::default();
        manager.has_torrent_file = true;

        let mut fetcher = fetcher(manager, false);
        fetcher.start(TIMEOUT).unwrap();

        assert_eq!(fetcher.manager().requests, vec![Request::Shutdown]);
    }

    #[test]
    fn test_pause_and_resume_not_implemented() {
        let mut fetcher = fetcher(MockTransferManager::default(), false);

        assert!(matches!(fetcher.pause(), Err(FetchError::NotImplemented("pause"))));
        assert!(matches!(fetcher.resume(), Err(FetchError::NotImplemented("resume"))));
        assert!(fetcher.manager().requests.is_empty());
        assert!(!fetcher.manager().initialized);
        assert_eq!(fetcher.stats(), FetchStats::default());
    }
}
