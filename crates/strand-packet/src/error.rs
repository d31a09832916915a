//! Packet error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Data packet size must be greater than zero")]
    InvalidPacketSize,

    #[error("Byte range out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid packet name: {0}")]
    InvalidName(String),

    #[error("File name leaves the data directory: {0}")]
    UnsafeFileName(String),

    #[error("Signing failed: {0}")]
    Sign(#[from] SignError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot sign {name}: {reason}")]
pub struct SignError {
    pub name: String,
    pub reason: String,
}
