use crate::constants::STORE_DB_FILE;
use crate::types::{Document, DocumentKind, SearchResult};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use turso::{params, Connection, Database, Row, Value as TursoValue};

pub mod sql;

/// Custom error types for the vector store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("Failed to prepare store directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize document metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("Got {embeddings} embeddings for {documents} documents")]
    LengthMismatch { documents: usize, embeddings: usize },
    #[error("Stored document is malformed: {0}")]
    Malformed(String),
}

/// A persistent, named collection of embedded documents.
///
/// The store is an explicitly owned value: the indexer and the retriever both
/// receive it from the caller. Cloning shares the same underlying database.
#[derive(Clone)]
pub struct VectorStore {
    db: Database,
    dir: PathBuf,
    collection: String,
}

impl VectorStore {
    /// Opens (creating if needed) the store in `dir` and selects `collection`.
    pub async fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let db_path = dir.join(STORE_DB_FILE);
        let db_path_str = db_path.to_string_lossy().to_string();

        info!("Opening vector store at '{db_path_str}' (collection '{collection}')");
        let db = turso::Builder::new_local(&db_path_str).build().await?;

        let conn = db.connect()?;
        // Use `query` for PRAGMA statements that return a value to avoid "unexpected row" errors.
        conn.query("PRAGMA journal_mode=WAL;", ()).await?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }

        Ok(Self {
            db,
            dir,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(self.db.connect()?)
    }

    /// Returns the marker recorded by the last successful build, if any.
    pub async fn marker(&self) -> Result<Option<String>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(sql::SELECT_MARKER, params![self.collection.as_str()])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(text_at(&row, 0)?)),
            None => Ok(None),
        }
    }

    /// Records the marker describing the data the collection was built from.
    pub async fn set_marker(&self, marker: &str, document_count: usize) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let built_at = chrono::Utc::now().to_rfc3339();
        conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = async {
            conn.execute(sql::DELETE_MARKER, params![self.collection.as_str()])
                .await?;
            conn.execute(
                sql::INSERT_MARKER,
                params![
                    self.collection.as_str(),
                    marker,
                    document_count as i64,
                    built_at.as_str()
                ],
            )
            .await?;
            Ok::<(), turso::Error>(())
        }
        .await;
        finish_transaction(&conn, result).await
    }

    /// Removes every document and the marker of the current collection.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            sql::DELETE_COLLECTION_DOCUMENTS,
            params![self.collection.as_str()],
        )
        .await?;
        conn.execute(sql::DELETE_MARKER, params![self.collection.as_str()])
            .await?;
        info!("Cleared collection '{}'", self.collection);
        Ok(())
    }

    /// Inserts a batch of documents with their embeddings in one transaction.
    pub async fn add_documents(
        &self,
        documents: &[Document],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StoreError> {
        if documents.len() != embeddings.len() {
            return Err(StoreError::LengthMismatch {
                documents: documents.len(),
                embeddings: embeddings.len(),
            });
        }
        if documents.is_empty() {
            return Ok(0);
        }

        let conn = self.connect()?;
        let mut encoded = Vec::with_capacity(documents.len());
        for doc in documents {
            encoded.push(serde_json::to_string(&doc.metadata)?);
        }

        conn.execute("BEGIN TRANSACTION", ()).await?;
        let result = async {
            let mut stmt = conn.prepare(sql::INSERT_DOCUMENT).await?;
            for ((doc, metadata), vector) in documents.iter().zip(&encoded).zip(embeddings) {
                let params: Vec<TursoValue> = vec![
                    TursoValue::Text(self.collection.clone()),
                    TursoValue::Text(doc.id.clone()),
                    TursoValue::Text(doc.kind.as_str().to_string()),
                    TursoValue::Text(doc.source.clone()),
                    TursoValue::Text(doc.content.clone()),
                    TursoValue::Text(metadata.clone()),
                    TursoValue::Blob(vector_to_bytes(vector)),
                ];
                stmt.execute(params).await?;
            }
            Ok::<(), turso::Error>(())
        }
        .await;
        finish_transaction(&conn, result).await?;

        debug!(
            "Inserted {} documents into '{}'",
            documents.len(),
            self.collection
        );
        Ok(documents.len())
    }

    /// Counts the documents in the current collection.
    pub async fn count(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(sql::COUNT_DOCUMENTS, params![self.collection.as_str()])
            .await?;
        let count = match rows.next().await? {
            Some(row) => match row.get_value(0)? {
                TursoValue::Integer(n) => n as usize,
                _ => 0,
            },
            None => 0,
        };
        Ok(count)
    }

    /// Looks a document up by id.
    pub async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                sql::SELECT_DOCUMENT_BY_ID,
                params![self.collection.as_str(), id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(document_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Returns every document of the given kind, ordered by id.
    pub async fn documents_of_kind(&self, kind: DocumentKind) -> Result<Vec<Document>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                sql::SELECT_DOCUMENTS_BY_KIND,
                params![self.collection.as_str(), kind.as_str()],
            )
            .await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(document_from_row(&row)?);
        }
        Ok(documents)
    }

    /// Returns the `limit` documents closest to `query_vector` by cosine distance.
    pub async fn similarity_search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let query = sql::similarity_search(&sql::vector_literal(query_vector), limit);

        debug!("Executing vector search over '{}'", self.collection);
        let mut rows = conn
            .query(&query, params![self.collection.as_str()])
            .await?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            let document = document_from_row(&row)?;
            let distance = match row.get_value(5)? {
                TursoValue::Real(f) => f,
                TursoValue::Integer(i) => i as f64,
                _ => f64::MAX,
            };
            results.push(SearchResult { document, distance });
        }
        Ok(results)
    }

    /// Flushes the write-ahead log and releases the database.
    pub async fn close(self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.query("PRAGMA wal_checkpoint(TRUNCATE);", ()).await?;
        info!("Closed vector store at '{}'", self.dir.display());
        Ok(())
    }
}

impl Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("dir", &self.dir)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

/// Commits on success, rolls back on failure.
async fn finish_transaction(
    conn: &Connection,
    result: Result<(), turso::Error>,
) -> Result<(), StoreError> {
    match result {
        Ok(()) => {
            conn.execute("COMMIT", ()).await?;
            Ok(())
        }
        Err(e) => {
            warn!("Store write failed: {e:?}. Rolling back transaction.");
            conn.execute("ROLLBACK", ()).await?;
            Err(StoreError::Database(e))
        }
    }
}

/// Encodes a vector as little-endian f32 bytes, the layout Turso's vector functions read.
fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn text_at(row: &Row, index: usize) -> Result<String, StoreError> {
    match row.get_value(index)? {
        TursoValue::Text(s) => Ok(s),
        TursoValue::Null => Ok(String::new()),
        other => Err(StoreError::Malformed(format!(
            "expected text in column {index}, got {other:?}"
        ))),
    }
}

fn document_from_row(row: &Row) -> Result<Document, StoreError> {
    let id = text_at(row, 0)?;
    let kind_str = text_at(row, 1)?;
    let kind = DocumentKind::parse(&kind_str)
        .ok_or_else(|| StoreError::Malformed(format!("unknown kind '{kind_str}' for '{id}'")))?;
    let source = text_at(row, 2)?;
    let content = text_at(row, 3)?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&text_at(row, 4)?)?;
    Ok(Document {
        id,
        kind,
        source,
        content,
        metadata,
    })
}
