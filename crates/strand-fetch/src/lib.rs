//! Strand Download Orchestration
//!
//! Drives one peer's retrieval of a torrent:
//! ```text
//! NeedTorrentFile
//!   ↓ all torrent segments held
//! NeedManifests
//!   ↓ all manifests held
//! NeedDataPackets
//!   ↓ all packets held
//! Complete (shutdown unless seeding)
//! ```
//! The stage is never stored; it is recomputed from the transfer manager's
//! completeness queries every time it is needed.

mod error;
mod fetcher;
mod retry;
mod session;
mod stage;
mod transfer;

#[cfg(test)]
mod mock;

pub use error::FetchError;
pub use fetcher::{FetchStats, SequentialFetcher};
pub use retry::{AlwaysRetry, CappedRetry, RetryDecision, RetryPolicy};
pub use session::{DescriptorDirs, DownloadSession};
pub use stage::DownloadStage;
pub use transfer::{RequestIssuer, RetrievalFailure, TransferHandler, TransferManager};

pub type Result<T> = std::result::Result<T, FetchError>;
