//! Consumer-to-manifest associations and session-to-version pins.
//!
//! An association binds a page URL to the manifest it registered with; it is
//! created once and never overwritten for that URL. A pin commits an
//! ephemeral session to the specific version it first resolved against, so a
//! loaded page keeps using the version it loaded with even after the
//! manifest updates.

use super::connection::CacheDb;
use crate::Error;
use std::collections::HashSet;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Bind a consumer URL to a manifest URL. Insert-once: an existing
    /// association for the same consumer URL is left untouched.
    pub async fn associate_consumer(&self, consumer_url: &str, manifest_url: &str) -> Result<(), Error> {
        let consumer_url = consumer_url.to_string();
        let manifest_url = manifest_url.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO consumer_associations (consumer_url, manifest_url, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![consumer_url, manifest_url, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The manifest URL a consumer is bound to, if any.
    pub async fn manifest_for_consumer(&self, consumer_url: &str) -> Result<Option<String>, Error> {
        let consumer_url = consumer_url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT manifest_url FROM consumer_associations WHERE consumer_url = ?1",
                    params![consumer_url],
                    |row| row.get(0),
                );
                match result {
                    Ok(url) => Ok(Some(url)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Every consumer URL ever associated with a manifest URL. These are the
    /// master entries carried into each new version's cache set.
    pub async fn consumers_of_manifest(&self, manifest_url: &str) -> Result<Vec<String>, Error> {
        let manifest_url = manifest_url.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT consumer_url FROM consumer_associations WHERE manifest_url = ?1 ORDER BY consumer_url",
                )?;
                let rows = stmt.query_map(params![manifest_url], |row| row.get::<_, String>(0))?;
                let mut consumers = Vec::new();
                for row in rows {
                    consumers.push(row?);
                }
                Ok(consumers)
            })
            .await
            .map_err(Error::from)
    }

    /// Pin a session to a version hash. Insert-once: a session already
    /// pinned keeps its original pin.
    pub async fn pin_session(&self, session_id: &str, version_hash: &str) -> Result<(), Error> {
        let session_id = session_id.to_string();
        let version_hash = version_hash.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO session_pins (session_id, version_hash, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![session_id, version_hash, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The version hash a session is pinned to, if any.
    pub async fn pinned_version(&self, session_id: &str) -> Result<Option<String>, Error> {
        let session_id = session_id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT version_hash FROM session_pins WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                );
                match result {
                    Ok(hash) => Ok(Some(hash)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// All recorded pins as (session id, version hash) pairs.
    pub async fn all_pins(&self) -> Result<Vec<(String, String)>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT session_id, version_hash FROM session_pins")?;
                let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
                let mut pins = Vec::new();
                for row in rows {
                    pins.push(row?);
                }
                Ok(pins)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the pins for the given session ids. Returns the number removed.
    pub async fn remove_pins(&self, session_ids: &[String]) -> Result<u64, Error> {
        let session_ids = session_ids.to_vec();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut removed = 0u64;
                {
                    let mut stmt = tx.prepare("DELETE FROM session_pins WHERE session_id = ?1")?;
                    for session_id in &session_ids {
                        removed += stmt.execute(params![session_id])? as u64;
                    }
                }
                tx.commit()?;
                Ok(removed)
            })
            .await
            .map_err(Error::from)
    }

    /// The set of version hashes still held by some pin.
    pub async fn pinned_hashes(&self) -> Result<HashSet<String>, Error> {
        self.conn
            .call(|conn| -> Result<HashSet<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT version_hash FROM session_pins")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut hashes = HashSet::new();
                for row in rows {
                    hashes.insert(row?);
                }
                Ok(hashes)
            })
            .await
            .map_err(Error::from)
    }
}
