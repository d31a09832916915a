//! Naming error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Invalid name URI: {0}")]
    InvalidUri(String),

    #[error("Invalid component: {0}")]
    InvalidComponent(String),

    #[error("Invalid sha256 digest: {0}")]
    InvalidDigest(String),
}
