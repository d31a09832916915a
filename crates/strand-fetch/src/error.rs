//! Fetch error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Not implemented yet: {0}")]
    NotImplemented(&'static str),

    #[error("Not a torrent file name: {0}")]
    InvalidTorrentName(String),

    #[error("Transfer error: {0}")]
    Transfer(String),
}
