//! Version history operations.
//!
//! Each manifest URL owns an append-only ordered sequence of versions;
//! the highest position is the current version. No two rows share a hash:
//! appending an already-known hash is a no-op, which is what makes
//! re-entrant updates idempotent.

use super::connection::CacheDb;
use crate::manifest::{Manifest, ManifestVersion};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

fn row_to_version(hash: String, manifest_json: &str) -> Result<ManifestVersion, Error> {
    let manifest: Manifest = serde_json::from_str(manifest_json)?;
    Ok(ManifestVersion { hash, manifest })
}

impl CacheDb {
    /// Append a new version to a manifest's history.
    ///
    /// Runs the duplicate check and the position assignment in one
    /// transaction, so concurrent appends for the same manifest URL cannot
    /// lose updates. Returns false if the hash is already recorded anywhere
    /// in this manifest's history (no update needed).
    pub async fn append_version(&self, manifest_url: &str, hash: &str, manifest: &Manifest) -> Result<bool, Error> {
        let manifest_url = manifest_url.to_string();
        let hash = hash.to_string();
        let manifest_json = serde_json::to_string(manifest)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;

                let known: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM manifest_versions WHERE manifest_url = ?1 AND hash = ?2)",
                    params![manifest_url, hash],
                    |row| row.get(0),
                )?;
                if known {
                    return Ok(false);
                }

                let next_position: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(position), -1) + 1 FROM manifest_versions WHERE manifest_url = ?1",
                    params![manifest_url],
                    |row| row.get(0),
                )?;

                tx.execute(
                    "INSERT INTO manifest_versions (manifest_url, position, hash, manifest_json, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![manifest_url, next_position, hash, manifest_json, created_at],
                )?;

                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(Error::from)
    }

    /// The full version history for a manifest URL, oldest first.
    pub async fn version_history(&self, manifest_url: &str) -> Result<Vec<ManifestVersion>, Error> {
        let manifest_url = manifest_url.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<ManifestVersion>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT hash, manifest_json FROM manifest_versions
                     WHERE manifest_url = ?1 ORDER BY position ASC",
                )?;
                let rows = stmt.query_map(params![manifest_url], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;

                let mut history = Vec::new();
                for row in rows {
                    let (hash, json) = row?;
                    history.push(row_to_version(hash, &json)?);
                }
                Ok(history)
            })
            .await
            .map_err(Error::from)
    }

    /// The current (last-appended) version for a manifest URL.
    pub async fn current_version(&self, manifest_url: &str) -> Result<Option<ManifestVersion>, Error> {
        let manifest_url = manifest_url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ManifestVersion>, Error> {
                let result = conn.query_row(
                    "SELECT hash, manifest_json FROM manifest_versions
                     WHERE manifest_url = ?1 ORDER BY position DESC LIMIT 1",
                    params![manifest_url],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                );

                match result {
                    Ok((hash, json)) => Ok(Some(row_to_version(hash, &json)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a version by its hash, across all manifests.
    pub async fn find_version(&self, hash: &str) -> Result<Option<ManifestVersion>, Error> {
        let hash = hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ManifestVersion>, Error> {
                let result = conn.query_row(
                    "SELECT hash, manifest_json FROM manifest_versions WHERE hash = ?1",
                    params![hash],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                );

                match result {
                    Ok((hash, json)) => Ok(Some(row_to_version(hash, &json)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// All manifest URLs with at least one recorded version, in lexicographic
    /// order (the documented cross-manifest scan order).
    pub async fn manifest_urls(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT DISTINCT manifest_url FROM manifest_versions ORDER BY manifest_url ASC")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut urls = Vec::new();
                for row in rows {
                    urls.push(row?);
                }
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Hashes of all non-current versions for a manifest URL.
    pub async fn superseded_hashes(&self, manifest_url: &str) -> Result<Vec<String>, Error> {
        let manifest_url = manifest_url.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT hash FROM manifest_versions
                     WHERE manifest_url = ?1
                       AND position < (SELECT MAX(position) FROM manifest_versions WHERE manifest_url = ?1)
                     ORDER BY position ASC",
                )?;
                let rows = stmt.query_map(params![manifest_url], |row| row.get::<_, String>(0))?;
                let mut hashes = Vec::new();
                for row in rows {
                    hashes.push(row?);
                }
                Ok(hashes)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a version row from its history. Used by the garbage collector
    /// once the version's content namespace has been reclaimed.
    pub async fn remove_version(&self, hash: &str) -> Result<(), Error> {
        let hash = hash.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM manifest_versions WHERE hash = ?1", params![hash])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
