//! Peer configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use strand_fetch::{AlwaysRetry, CappedRetry, RetryPolicy};
use strand_packet::ChunkPolicy;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding shared files and the `.appdata` descriptor tree
    pub data_dir: PathBuf,
    /// Path to the catalog database file
    pub database_path: PathBuf,
    /// Bytes per data packet
    pub data_packet_size: u64,
    /// Packets per sub-manifest
    pub sub_manifest_size: u64,
    /// Upper bound on the packetizer's read buffer
    pub max_buffer_size: u64,
    /// Keep serving after a download completes
    pub seed: bool,
    pub event_timeout_ms: u64,
    /// Retries per name; `None` retries forever
    pub max_retries: Option<u32>,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("strand.db"),
            data_dir,
            data_packet_size: 1024,
            sub_manifest_size: 128,
            max_buffer_size: ChunkPolicy::DEFAULT_MAX_BUFFER_SIZE,
            seed: false,
            event_timeout_ms: 10_000,
            max_retries: None,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Strand"))
            .unwrap_or_else(|| PathBuf::from(".strand"))
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_packet_size == 0 {
            return Err(CoreError::Config("data_packet_size must be positive".to_string()));
        }
        if self.sub_manifest_size == 0 {
            return Err(CoreError::Config("sub_manifest_size must be positive".to_string()));
        }
        if self.max_buffer_size == 0 {
            return Err(CoreError::Config("max_buffer_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy::new(self.max_buffer_size)
    }

    pub fn retry_policy(&self) -> Box<dyn RetryPolicy> {
        match self.max_retries {
            Some(max) => Box::new(CappedRetry::new(max)),
            None => Box::new(AlwaysRetry),
        }
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Simple dirs implementation for the platform data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
