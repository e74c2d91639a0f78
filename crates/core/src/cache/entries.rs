//! Content-cache operations.
//!
//! Captured responses are stored per version hash, keyed within that
//! namespace by absolute URL. A version's namespace is born when the updater
//! materializes it and dies wholesale when the garbage collector reclaims
//! the version.

use super::connection::CacheDb;
use crate::response::CapturedResponse;
use crate::Error;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Store a captured response under a version's namespace.
    ///
    /// Uses UPSERT semantics: re-materializing a URL replaces the entry.
    pub async fn put_entry(&self, version_hash: &str, url: &str, response: &CapturedResponse) -> Result<(), Error> {
        let version_hash = version_hash.to_string();
        let url = url.to_string();
        let final_url = response.final_url.clone();
        let status = response.status;
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (version_hash, url, final_url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(version_hash, url) DO UPDATE SET
                        final_url = excluded.final_url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![version_hash, url, final_url, status, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the cached response for a URL under a version's namespace.
    pub async fn match_entry(&self, version_hash: &str, url: &str) -> Result<Option<CapturedResponse>, Error> {
        let version_hash = version_hash.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CapturedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT url, final_url, status, headers_json, body FROM cache_entries
                     WHERE version_hash = ?1 AND url = ?2",
                    params![version_hash, url],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u16>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                        ))
                    },
                );

                match result {
                    Ok((url, final_url, status, headers_json, body)) => {
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                        Ok(Some(CapturedResponse { url, final_url, status, headers, body: Bytes::from(body) }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Copy one URL's entry from a previous version's namespace into a new
    /// one, preserving continuity for entries an update could not refresh.
    /// Returns false if the previous version had no entry for the URL.
    pub async fn copy_entry_from(&self, from_hash: &str, to_hash: &str, url: &str) -> Result<bool, Error> {
        let from_hash = from_hash.to_string();
        let to_hash = to_hash.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let copied = conn.execute(
                    "INSERT OR IGNORE INTO cache_entries
                        (version_hash, url, final_url, status, headers_json, body, stored_at)
                     SELECT ?2, url, final_url, status, headers_json, body, stored_at
                     FROM cache_entries WHERE version_hash = ?1 AND url = ?3",
                    params![from_hash, to_hash, url],
                )?;
                Ok(copied > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a version's entire namespace. Returns the number of entries
    /// removed.
    pub async fn delete_namespace(&self, version_hash: &str) -> Result<u64, Error> {
        let version_hash = version_hash.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE version_hash = ?1", params![version_hash])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored under a version's namespace.
    pub async fn entry_count(&self, version_hash: &str) -> Result<u64, Error> {
        let version_hash = version_hash.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE version_hash = ?1",
                    params![version_hash],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
