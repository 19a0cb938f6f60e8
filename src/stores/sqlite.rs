//! SQLite-backed vector store.
//!
//! Layout: one table per collection (`seq` autoincrement preserves insertion
//! order, `tenant_id` is indexed for the tenant-filtered scan) plus a
//! `collections` meta table that records each collection's established
//! vector dimension. Vectors and metadata are stored as JSON text.
//!
//! Similarity is computed in-process after the tenant-filtered scan, so the
//! ranking contract (cosine score, insertion-order tie-break) is identical
//! to the in-memory backend.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::types::{NewRecord, Record, RecordMetadata, VaultError};

use super::{SearchHit, VectorStore, cosine_similarity, rank_hits, validate_batch};

/// Durable [`VectorStore`] implementation over a single SQLite file.
///
/// Every operation runs as one call on the serialized connection, and
/// mutations execute inside a transaction, so a concurrent search observes
/// either none or all of a batch insert or tenant delete.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Connection,
}

impl SqliteVectorStore {
    /// Open (or create) the store at `path`.
    #[tracing::instrument(skip(path), err)]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        Self::init(conn).await
    }

    /// Open a transient in-memory database. Useful for tests.
    pub async fn open_in_memory() -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| VaultError::Storage(err.to_string()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, VaultError> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS collections (
                     name TEXT PRIMARY KEY,
                     table_name TEXT NOT NULL UNIQUE,
                     dimension INTEGER NOT NULL
                 );",
            )
            .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(from_store)?;
        Ok(Self { conn })
    }
}

/// Meta row for one collection.
struct CollectionRow {
    table_name: String,
    dimension: usize,
}

fn lookup_collection(
    tx: &Transaction<'_>,
    name: &str,
) -> Result<Option<CollectionRow>, tokio_rusqlite::Error> {
    tx.prepare("SELECT table_name, dimension FROM collections WHERE name = ?")
        .and_then(|mut stmt| {
            stmt.query_row([name], |row| {
                Ok(CollectionRow {
                    table_name: row.get(0)?,
                    dimension: row.get::<_, i64>(1)? as usize,
                })
            })
            .optional()
        })
        .map_err(tokio_rusqlite::Error::Rusqlite)
}

/// Create the meta row and backing table for a new collection.
///
/// Table names derive from the sanitized collection name; when two distinct
/// collection names sanitize identically a numeric suffix keeps the physical
/// tables apart.
fn create_collection(
    tx: &Transaction<'_>,
    name: &str,
    dimension: usize,
) -> Result<CollectionRow, tokio_rusqlite::Error> {
    let base = format!("records_{}", sanitize_identifier(name));
    let mut table_name = base.clone();
    let mut suffix = 2usize;
    loop {
        let taken: bool = tx
            .prepare("SELECT EXISTS(SELECT 1 FROM collections WHERE table_name = ?)")
            .and_then(|mut stmt| stmt.query_row([&table_name], |row| row.get(0)))
            .map_err(tokio_rusqlite::Error::Rusqlite)?;
        if !taken {
            break;
        }
        table_name = format!("{base}_{suffix}");
        suffix += 1;
    }

    tx.execute(
        "INSERT INTO collections (name, table_name, dimension) VALUES (?, ?, ?)",
        (name, &table_name, dimension as i64),
    )
    .map_err(tokio_rusqlite::Error::Rusqlite)?;

    tx.execute_batch(&format!(
        "CREATE TABLE \"{table_name}\" (
             seq INTEGER PRIMARY KEY AUTOINCREMENT,
             id TEXT NOT NULL UNIQUE,
             tenant_id TEXT NOT NULL,
             vector TEXT NOT NULL,
             content TEXT NOT NULL,
             metadata TEXT NOT NULL
         );
         CREATE INDEX \"idx_{table_name}_tenant\" ON \"{table_name}\" (tenant_id);"
    ))
    .map_err(tokio_rusqlite::Error::Rusqlite)?;

    Ok(CollectionRow {
        table_name,
        dimension,
    })
}

fn sanitize_identifier(input: &str) -> String {
    let mut out: String = input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push_str("default");
    }
    out
}

fn domain(err: VaultError) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(err))
}

/// Unwrap domain errors smuggled through the connection; everything else
/// collapses into [`VaultError::Storage`] with a readable cause string.
fn from_store(err: tokio_rusqlite::Error) -> VaultError {
    match err {
        tokio_rusqlite::Error::Other(inner) => match inner.downcast::<VaultError>() {
            Ok(vault) => *vault,
            Err(other) => VaultError::Storage(other.to_string()),
        },
        other => VaultError::Storage(other.to_string()),
    }
}

fn parse_record(
    id: String,
    tenant_id: String,
    vector_json: &str,
    content: String,
    metadata_json: &str,
) -> Result<Record, tokio_rusqlite::Error> {
    let vector: Vec<f32> = serde_json::from_str(vector_json)
        .map_err(|err| domain(VaultError::Storage(format!("corrupt vector payload: {err}"))))?;
    let metadata: RecordMetadata = serde_json::from_str(metadata_json)
        .map_err(|err| domain(VaultError::Storage(format!("corrupt metadata payload: {err}"))))?;
    Ok(Record {
        id,
        tenant_id,
        vector,
        content,
        metadata,
    })
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[tracing::instrument(skip(self, records), fields(batch = records.len()), err)]
    async fn insert(
        &self,
        collection: &str,
        records: Vec<NewRecord>,
    ) -> Result<Vec<String>, VaultError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let batch_dimension = validate_batch(collection, &records)?;
        let collection = collection.to_string();

        self.conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let row = match lookup_collection(&tx, &collection)? {
                    Some(row) => {
                        if row.dimension != batch_dimension {
                            return Err(domain(VaultError::DimensionMismatch {
                                collection,
                                expected: row.dimension,
                                actual: batch_dimension,
                            }));
                        }
                        row
                    }
                    None => create_collection(&tx, &collection, batch_dimension)?,
                };

                let exists_sql = format!(
                    "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE id = ?)",
                    row.table_name
                );
                let id_exists = |id: &str| -> Result<bool, tokio_rusqlite::Error> {
                    tx.prepare(&exists_sql)
                        .and_then(|mut stmt| stmt.query_row([id], |row| row.get(0)))
                        .map_err(tokio_rusqlite::Error::Rusqlite)
                };

                // Resolve every id up front; a duplicate aborts the
                // transaction before any row lands.
                let mut assigned: Vec<String> = Vec::with_capacity(records.len());
                for record in &records {
                    let id = match &record.id {
                        Some(id) => {
                            if id_exists(id)? || assigned.iter().any(|seen| seen == id) {
                                return Err(domain(VaultError::DuplicateId(id.clone())));
                            }
                            id.clone()
                        }
                        None => loop {
                            let candidate = Uuid::new_v4().to_string();
                            if !id_exists(&candidate)?
                                && !assigned.iter().any(|seen| seen == &candidate)
                            {
                                break candidate;
                            }
                        },
                    };
                    assigned.push(id);
                }

                let insert_sql = format!(
                    "INSERT INTO \"{}\" (id, tenant_id, vector, content, metadata)
                     VALUES (?, ?, ?, ?, ?)",
                    row.table_name
                );
                for (record, id) in records.iter().zip(&assigned) {
                    let vector_json = serde_json::to_string(&record.vector).map_err(|err| {
                        domain(VaultError::Storage(format!("vector encoding: {err}")))
                    })?;
                    let metadata_json =
                        serde_json::to_string(&record.metadata).map_err(|err| {
                            domain(VaultError::Storage(format!("metadata encoding: {err}")))
                        })?;
                    tx.execute(
                        &insert_sql,
                        (
                            id,
                            &record.tenant_id,
                            &vector_json,
                            &record.content,
                            &metadata_json,
                        ),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }

                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(assigned)
            })
            .await
            .map_err(from_store)
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        tenant_id: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, VaultError> {
        let collection = collection.to_string();
        let tenant_id = tenant_id.to_string();
        let query = query.to_vec();

        self.conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let Some(row) = lookup_collection(&tx, &collection)? else {
                    return Ok(Vec::new());
                };
                if query.len() != row.dimension {
                    return Err(domain(VaultError::DimensionMismatch {
                        collection,
                        expected: row.dimension,
                        actual: query.len(),
                    }));
                }

                let select_sql = format!(
                    "SELECT id, tenant_id, vector, content, metadata
                     FROM \"{}\" WHERE tenant_id = ? ORDER BY seq ASC",
                    row.table_name
                );
                let mut hits = Vec::new();
                {
                    let mut stmt = tx
                        .prepare(&select_sql)
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    let rows = stmt
                        .query_map([&tenant_id], |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, String>(4)?,
                            ))
                        })
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;

                    for raw in rows {
                        let (id, tenant, vector_json, content, metadata_json) =
                            raw.map_err(tokio_rusqlite::Error::Rusqlite)?;
                        let record =
                            parse_record(id, tenant, &vector_json, content, &metadata_json)?;
                        let score = cosine_similarity(&query, &record.vector);
                        hits.push(SearchHit { record, score });
                    }
                }
                Ok(rank_hits(hits, k))
            })
            .await
            .map_err(from_store)
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_by_tenant(
        &self,
        collection: &str,
        tenant_id: &str,
    ) -> Result<usize, VaultError> {
        let collection = collection.to_string();
        let tenant_id = tenant_id.to_string();

        self.conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let Some(row) = lookup_collection(&tx, &collection)? else {
                    return Ok(0);
                };
                let deleted = tx
                    .execute(
                        &format!("DELETE FROM \"{}\" WHERE tenant_id = ?", row.table_name),
                        [&tenant_id],
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(deleted)
            })
            .await
            .map_err(from_store)
    }

    async fn count(&self, collection: &str) -> Result<usize, VaultError> {
        let collection = collection.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let Some(row) = lookup_collection(&tx, &collection)? else {
                    return Ok(0);
                };
                let count: i64 = tx
                    .query_row(
                        &format!("SELECT COUNT(*) FROM \"{}\"", row.table_name),
                        [],
                        |row| row.get(0),
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(from_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_identifier_flattens_awkward_names() {
        assert_eq!(sanitize_identifier("pdf-embeddings"), "pdf_embeddings");
        assert_eq!(sanitize_identifier("a/b c"), "a_b_c");
        assert_eq!(sanitize_identifier(""), "default");
    }

    #[tokio::test]
    async fn domain_errors_round_trip_through_the_connection() {
        let store = SqliteVectorStore::open_in_memory().await.unwrap();
        store
            .insert(
                "docs",
                vec![NewRecord::new("tenant-a", vec![1.0, 0.0], "seed")],
            )
            .await
            .unwrap();

        let err = store
            .search("docs", &[1.0, 0.0, 0.0], "tenant-a", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }
}
