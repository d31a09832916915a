//! Strand Storage Layer
//!
//! Durable side of a transfer: torrent segments and manifests are written as
//! JSON files, packet bytes land at their offset in the target file, and every
//! write is recorded in a SQLite catalog so a restarted peer knows what it
//! already holds.

mod database;
mod error;
mod migrations;
mod store;

pub use database::Database;
pub use error::StorageError;
pub use store::ContentStore;

pub type Result<T> = std::result::Result<T, StorageError>;
