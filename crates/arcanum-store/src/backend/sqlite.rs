// SPDX-FileCopyrightText: 2026 Arcanum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed durable byte storage.
//!
//! All access is serialized through tokio-rusqlite's single background
//! thread, which eliminates SQLITE_BUSY errors between our own writers.
//! WAL mode plus `synchronous=FULL` gives synchronous write-through: every
//! `put_*` is durable before it returns.

use std::path::Path;

use arcanum_core::{ArcanumError, SecretUuid, ValueBackend};
use async_trait::async_trait;
use rusqlite::params;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Durable SQLite [`ValueBackend`].
pub struct SqliteBackend {
    conn: tokio_rusqlite::Connection,
}

impl SqliteBackend {
    /// Open (creating if necessary) the database at `path` and run
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, ArcanumError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ArcanumError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        let journal_mode = if wal_mode { "WAL" } else { "DELETE" };
        let pragmas = format!(
            "PRAGMA journal_mode={journal_mode}; PRAGMA synchronous=FULL; PRAGMA busy_timeout=5000;"
        );
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(&pragmas)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), refinery::Error> {
            embedded::migrations::runner().run(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| ArcanumError::Storage {
            source: Box::new(e),
        })?;

        debug!(path = %path, "sqlite backend opened");
        Ok(Self { conn })
    }

    /// Checkpoint the WAL so all committed data lands in the main file.
    pub async fn checkpoint(&self) -> Result<(), ArcanumError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ValueBackend for SqliteBackend {
    async fn put_value(&self, uuid: SecretUuid, ciphertext: &[u8]) -> Result<(), ArcanumError> {
        let uuid_str = uuid.to_string();
        let blob = ciphertext.to_vec();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO secret_values (uuid, blob) VALUES (?1, ?2)",
                    params![uuid_str, blob],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_value(&self, uuid: SecretUuid) -> Result<Option<Vec<u8>>, ArcanumError> {
        let uuid_str = uuid.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT blob FROM secret_values WHERE uuid = ?1",
                    params![uuid_str],
                    |row| row.get(0),
                );
                match result {
                    Ok(blob) => Ok(Some(blob)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_value(&self, uuid: SecretUuid) -> Result<(), ArcanumError> {
        let uuid_str = uuid.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM secret_values WHERE uuid = ?1",
                    params![uuid_str],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), ArcanumError> {
        let key = key.to_string();
        let value = value.to_vec();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?1, ?2)",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, ArcanumError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT value FROM store_meta WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                );
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    async fn put_record(&self, uuid: SecretUuid, record: &[u8]) -> Result<(), ArcanumError> {
        let uuid_str = uuid.to_string();
        let record = record.to_vec();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT OR REPLACE INTO secret_records (uuid, record) VALUES (?1, ?2)",
                    params![uuid_str, record],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_records(&self) -> Result<Vec<Vec<u8>>, ArcanumError> {
        self.conn
            .call(|conn| -> Result<Vec<Vec<u8>>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT record FROM secret_records ORDER BY uuid")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                Ok(records)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_record(&self, uuid: SecretUuid) -> Result<(), ArcanumError> {
        let uuid_str = uuid.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM secret_records WHERE uuid = ?1",
                    params![uuid_str],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Map tokio-rusqlite errors to the Arcanum taxonomy.
///
/// Busy/locked conditions become the retryable `StorageUnavailable`;
/// everything else is a hard storage error.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ArcanumError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(code, _)) = &e
        && matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        )
    {
        return ArcanumError::StorageUnavailable(e.to_string());
    }
    ArcanumError::Storage {
        source: Box::new(e),
    }
}
