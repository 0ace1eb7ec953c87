//! Named cache store operations.
//!
//! A store is a named `url -> response` mapping. Stores are created lazily,
//! looked up in creation order for store-agnostic matches, and deleted
//! wholesale (entries cascade).

use super::connection::CacheDb;
use crate::Error;
use crate::http::{Response, ResponseType};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Listing row for one cached entry.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryInfo {
    pub url: String,
    pub status: u16,
    pub response_type: String,
    pub body_len: u64,
    pub cached_at: String,
}

const ENTRY_COLUMNS: &str = "e.url, e.status, e.status_text, e.response_type, e.headers_json, e.body";

fn read_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, u16, String, String, String, Vec<u8>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

fn decode_response(
    (url, status, status_text, response_type, headers_json, body): (String, u16, String, String, String, Vec<u8>),
) -> Result<Response, Error> {
    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("{url}: {e}")))?;
    Ok(Response {
        response_type: ResponseType::parse(&response_type)?,
        url,
        status,
        status_text,
        headers,
        body: body.into(),
    })
}

impl CacheDb {
    /// Create the store if it does not exist yet.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns false if the store did not exist.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All store names in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under `url`, creating the store if needed.
    ///
    /// Uses UPSERT semantics so repeated puts of the same URL never duplicate.
    pub async fn put_entry(&self, store: &str, url: &str, response: &Response) -> Result<(), Error> {
        let store = store.to_string();
        let url = url.to_string();
        let status = response.status;
        let status_text = response.status_text.clone();
        let response_type = response.response_type.as_str();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        store, url, method, status, status_text, response_type,
                        headers_json, body, body_len, cached_at
                    ) VALUES (?1, ?2, 'GET', ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(store, url) DO UPDATE SET
                        status = excluded.status,
                        status_text = excluded.status_text,
                        response_type = excluded.response_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        body_len = excluded.body_len,
                        cached_at = excluded.cached_at",
                    params![
                        store,
                        url,
                        status,
                        status_text,
                        response_type,
                        headers_json,
                        body,
                        body.len() as i64,
                        now
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `url` in one store.
    pub async fn match_in_store(&self, store: &str, url: &str) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let url = url.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<_, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM cache_entries e WHERE e.store = ?1 AND e.url = ?2");
                match conn.query_row(&sql, params![store, url], read_response) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_response).transpose()
    }

    /// Look up `url` across every store; the oldest store wins.
    pub async fn match_any_store(&self, url: &str) -> Result<Option<Response>, Error> {
        let url = url.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<_, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM cache_entries e
                     JOIN cache_stores s ON s.name = e.store
                     WHERE e.url = ?1
                     ORDER BY s.rowid LIMIT 1"
                );
                match conn.query_row(&sql, params![url], read_response) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_response).transpose()
    }

    /// Entries in a store, ordered by URL.
    pub async fn list_entries(&self, store: &str) -> Result<Vec<EntryInfo>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, response_type, body_len, cached_at
                     FROM cache_entries WHERE store = ?1 ORDER BY url",
                )?;
                let entries = stmt
                    .query_map(params![store], |row| {
                        Ok(EntryInfo {
                            url: row.get(0)?,
                            status: row.get(1)?,
                            response_type: row.get(2)?,
                            body_len: row.get::<_, i64>(3)? as u64,
                            cached_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every store. Returns how many were removed.
    pub async fn delete_all_stores(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_stores", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
