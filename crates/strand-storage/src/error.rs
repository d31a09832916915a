//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Packet error: {0}")]
    Packet(#[from] strand_packet::PacketError),

    #[error("Packet {0} is not listed in its manifest")]
    NotInManifest(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),
}
