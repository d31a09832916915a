//! Database connection and catalog operations

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strand_name::Name;

use crate::migrations::run_migrations;
use crate::Result;

/// A packet row in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PacketRecord {
    pub manifest_name: Name,
    pub sub_manifest: u64,
    pub seq: u64,
    pub byte_offset: u64,
    pub length: u64,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn record_torrent_segment(&self, full_name: &Name, path: &Path) -> Result<()> {
        let stored_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO torrent_segments (name, path, stored_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![full_name.to_uri(), path.to_string_lossy(), stored_at],
            )?;
            Ok(())
        })
    }

    pub fn record_file_manifest(&self, full_name: &Name, file_name: &str, path: &Path) -> Result<()> {
        let stored_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO file_manifests (name, file_name, path, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![full_name.to_uri(), file_name, path.to_string_lossy(), stored_at],
            )?;
            Ok(())
        })
    }

    pub(crate) fn record_data_packet(&self, full_name: &Name, record: &PacketRecord) -> Result<()> {
        let stored_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO data_packets
                 (name, manifest_name, sub_manifest, seq, byte_offset, length, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    full_name.to_uri(),
                    record.manifest_name.to_uri(),
                    record.sub_manifest as i64,
                    record.seq as i64,
                    record.byte_offset as i64,
                    record.length as i64,
                    stored_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Path a torrent segment was written to, if it is stored
    pub fn torrent_segment_path(&self, full_name: &Name) -> Result<Option<PathBuf>> {
        self.lookup_path("SELECT path FROM torrent_segments WHERE name = ?1", full_name)
    }

    /// Path a file manifest was written to, if it is stored
    pub fn file_manifest_path(&self, full_name: &Name) -> Result<Option<PathBuf>> {
        self.lookup_path("SELECT path FROM file_manifests WHERE name = ?1", full_name)
    }

    pub fn has_data_packet(&self, full_name: &Name) -> Result<bool> {
        self.with_connection(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM data_packets WHERE name = ?1",
                    [full_name.to_uri()],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Number of packets recorded for one manifest
    pub fn stored_packet_count(&self, manifest_full_name: &Name) -> Result<u64> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM data_packets WHERE manifest_name = ?1",
                [manifest_full_name.to_uri()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Catalog row of a held packet
    pub(crate) fn packet_record(&self, full_name: &Name) -> Result<Option<PacketRecord>> {
        let row = self.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT manifest_name, sub_manifest, seq, byte_offset, length
                     FROM data_packets WHERE name = ?1",
                    [full_name.to_uri()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    },
                )
                .optional()?;
            Ok(row)
        })?;

        let Some((manifest, sub_manifest, seq, byte_offset, length)) = row else {
            return Ok(None);
        };
        let manifest_name = manifest
            .parse::<Name>()
            .map_err(|e| crate::StorageError::InvalidName(e.to_string()))?;

        Ok(Some(PacketRecord {
            manifest_name,
            sub_manifest: sub_manifest as u64,
            seq: seq as u64,
            byte_offset: byte_offset as u64,
            length: length as u64,
        }))
    }

    fn lookup_path(&self, sql: &str, full_name: &Name) -> Result<Option<PathBuf>> {
        self.with_connection(|conn| {
            let path: Option<String> = conn
                .query_row(sql, [full_name.to_uri()], |row| row.get(0))
                .optional()?;
            Ok(path.map(PathBuf::from))
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
