//! Strand Core
//!
//! Configuration and wiring for one peer: a catalog database, a content
//! store, a signer, and sequential fetchers built on top of them.

mod config;
mod error;
mod peer;

pub use config::Config;
pub use error::CoreError;
pub use peer::{Peer, Publication};

// Re-export core components
pub use strand_fetch::{
    DownloadSession, DownloadStage, FetchError, FetchStats, RequestIssuer, RetrievalFailure,
    RetryPolicy, SequentialFetcher, TransferHandler, TransferManager,
};
pub use strand_name::{classify, Component, Name, NameError, NameType};
pub use strand_packet::{
    ChunkPolicy, DataPacket, FileManifest, PacketError, Packetizer, Sha256Signer, Signer,
    TorrentSegment,
};
pub use strand_storage::{ContentStore, Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
