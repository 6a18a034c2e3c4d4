//! SQLite-backed vector index using the `sqlite-vec` extension.
//!
//! Vectors are stored as float32 blobs in a plain table and ranked with
//! `vec_distance_cosine`, which keeps upserts trivially idempotent (the id is
//! the primary key) at the cost of an exact scan per query. Good for corpora
//! up to the low hundreds of thousands of chunks.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi};

use super::{QueryMatch, VectorIndex, VectorRecord};
use crate::types::RetrievalError;

/// Single-file vector index addressed by an index name (its table name).
#[derive(Clone)]
pub struct SqliteVectorIndex {
    conn: Connection,
    table: String,
}

impl SqliteVectorIndex {
    /// Opens (creating if needed) the index stored at `path` under
    /// `index_name`.
    pub async fn open(path: impl AsRef<Path>, index_name: &str) -> Result<Self, RetrievalError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|e| index_err(tokio_rusqlite::Error::Error(e)))?;
        let table = sanitize_identifier(index_name);
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             id TEXT PRIMARY KEY, \
             embedding BLOB NOT NULL, \
             metadata TEXT NOT NULL, \
             content TEXT NOT NULL)"
        );
        conn.call(move |conn| {
            conn.execute_batch(&ddl)
                ?;
            Ok(())
        })
        .await
        .map_err(index_err)?;
        Ok(Self { conn, table })
    }

    /// Name of the backing table.
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), RetrievalError> {
        if records.is_empty() {
            return Ok(());
        }
        // Serialize outside the connection closure so only storage errors
        // can surface from it.
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let embedding_json = serde_json::to_string(&record.embedding)
                .map_err(|err| RetrievalError::Index(err.to_string()))?;
            rows.push((
                record.id,
                embedding_json,
                record.metadata.to_string(),
                record.text,
            ));
        }

        let sql = format!(
            "INSERT INTO {} (id, embedding, metadata, content) \
             VALUES (?1, vec_f32(?2), ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET \
             embedding = excluded.embedding, \
             metadata = excluded.metadata, \
             content = excluded.content",
            self.table
        );
        self.conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    ?;
                {
                    let mut stmt = tx.prepare(&sql)?;
                    for (id, embedding, metadata, content) in &rows {
                        stmt.execute((id, embedding, metadata, content))
                            ?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(index_err)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, RetrievalError> {
        let embedding_json =
            serde_json::to_string(vector).map_err(|err| RetrievalError::Index(err.to_string()))?;
        let sql = format!(
            "SELECT id, metadata, content, \
             vec_distance_cosine(embedding, vec_f32(?1)) AS distance \
             FROM {} ORDER BY distance ASC LIMIT {}",
            self.table, top_k
        );
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        let metadata: String = row.get(1)?;
                        let distance: f32 = row.get(3)?;
                        Ok(QueryMatch {
                            id: row.get(0)?,
                            // cosine distance -> similarity
                            score: 1.0 - distance,
                            metadata: serde_json::from_str(&metadata).unwrap_or_default(),
                            text: Some(row.get(2)?),
                        })
                    })
                    ?;

                let mut matches = Vec::new();
                for row in rows {
                    matches.push(row?);
                }
                Ok(matches)
            })
            .await
            .map_err(index_err)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        self.conn
            .call(move |conn| {
                let count: i64 = conn
                    .query_row(&sql, [], |row| row.get(0))
                    ?;
                Ok(count as usize)
            })
            .await
            .map_err(index_err)
    }
}

fn index_err(err: tokio_rusqlite::Error) -> RetrievalError {
    RetrievalError::Index(err.to_string())
}

fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Registers the sqlite-vec extension for every connection opened by this
/// process. Safe to call repeatedly; registration happens once.
fn register_sqlite_vec() -> Result<(), RetrievalError> {
    static REGISTRATION: OnceLock<Result<(), String>> = OnceLock::new();

    REGISTRATION
        .get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn = transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc == 0 {
                Ok(())
            } else {
                Err(format!("failed to register sqlite-vec extension (code {rc})"))
            }
        })
        .clone()
        .map_err(RetrievalError::Index)
}
