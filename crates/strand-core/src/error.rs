//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Name error: {0}")]
    Name(#[from] strand_name::NameError),

    #[error("Packet error: {0}")]
    Packet(#[from] strand_packet::PacketError),

    #[error("Storage error: {0}")]
    Storage(#[from] strand_storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] strand_fetch::FetchError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
