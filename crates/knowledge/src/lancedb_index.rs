//! LanceDB-backed vector index implementation.

use crate::config::TABLE_NAME;
use crate::types::{DocumentChunk, ScoredChunk};
use crate::vector_index::{cosine_similarity, VectorIndex};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow_schema::{DataType, Field, Schema};
use flashcards_core::{AppError, AppResult};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::Path;
use std::sync::Arc;

/// LanceDB-backed vector index for document chunks.
pub struct LanceDbIndex {
    table: Table,
    embedding_dim: usize,
}

impl LanceDbIndex {
    /// Create a new index at `db_path`, seeded with the first batch of chunks.
    ///
    /// Fails if the directory already holds a chunks table.
    pub async fn create(
        db_path: &Path,
        embedding_dim: usize,
        seed: &[DocumentChunk],
    ) -> AppResult<Self> {
        std::fs::create_dir_all(db_path).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index directory: {}", e))
        })?;

        let conn = connect(db_path).await?;
        let schema = create_schema(embedding_dim);
        let batch = chunks_to_batch(&schema, embedding_dim, seed)?;

        let table = conn
            .create_table(TABLE_NAME, RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to create table: {}", e)))?;

        tracing::debug!(
            "Created LanceDB index at {:?} with {} chunks",
            db_path,
            seed.len()
        );

        Ok(Self {
            table,
            embedding_dim,
        })
    }

    /// Open an existing index read-only.
    ///
    /// Returns `AppError::IndexNotFound` when the directory holds no chunks table.
    pub async fn open(db_path: &Path, embedding_dim: usize) -> AppResult<Self> {
        if !db_path.is_dir() {
            return Err(AppError::IndexNotFound(db_path.to_path_buf()));
        }

        let conn = connect(db_path).await?;
        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to list tables: {}", e)))?;

        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(AppError::IndexNotFound(db_path.to_path_buf()));
        }

        let table = conn
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to open table: {}", e)))?;

        tracing::debug!("Opened LanceDB index at {:?}", db_path);

        Ok(Self {
            table,
            embedding_dim,
        })
    }
}

async fn connect(db_path: &Path) -> AppResult<lancedb::Connection> {
    let uri = db_path.to_string_lossy().to_string();
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| AppError::Knowledge(format!("Failed to connect to LanceDB: {}", e)))
}

/// Arrow schema for the chunks table.
fn create_schema(embedding_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, false),
        Field::new("position", DataType::UInt32, false),
        Field::new("text", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                embedding_dim as i32,
            ),
            false,
        ),
    ]))
}

/// Convert embedded chunks to one Arrow RecordBatch.
fn chunks_to_batch(
    schema: &Arc<Schema>,
    embedding_dim: usize,
    chunks: &[DocumentChunk],
) -> AppResult<RecordBatch> {
    let mut values = Vec::with_capacity(chunks.len() * embedding_dim);
    for chunk in chunks {
        let embedding = chunk.embedding.as_ref().ok_or_else(|| {
            AppError::Knowledge(format!("Chunk {} is missing its embedding", chunk.id))
        })?;

        if embedding.len() != embedding_dim {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                embedding_dim,
                embedding.len()
            )));
        }
        values.extend_from_slice(embedding);
    }

    let embedding_array = FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        embedding_dim as i32,
        Arc::new(Float32Array::from(values)),
        None,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to build embedding column: {}", e)))?;

    RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.source.as_str()))),
            Arc::new(UInt32Array::from_iter_values(chunks.iter().map(|c| c.page))),
            Arc::new(UInt32Array::from_iter_values(chunks.iter().map(|c| c.position))),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
            Arc::new(embedding_array),
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create RecordBatch: {}", e)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid {} column", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid {} column", name)))
}

/// Convert every row of an Arrow RecordBatch back to chunks.
fn batch_to_chunks(batch: &RecordBatch) -> AppResult<Vec<DocumentChunk>> {
    let ids = string_column(batch, "id")?;
    let sources = string_column(batch, "source")?;
    let pages = u32_column(batch, "page")?;
    let positions = u32_column(batch, "position")?;
    let texts = string_column(batch, "text")?;
    let embeddings = batch
        .column_by_name("embedding")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
        .ok_or_else(|| AppError::Knowledge("Invalid embedding column".to_string()))?;

    (0..batch.num_rows())
        .map(|row| {
            let row_values = embeddings.value(row);
            let values = row_values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| AppError::Knowledge("Invalid embedding values".to_string()))?;

            Ok(DocumentChunk {
                id: ids.value(row).to_string(),
                source: sources.value(row).to_string(),
                page: pages.value(row),
                position: positions.value(row),
                text: texts.value(row).to_string(),
                embedding: Some(values.values().to_vec()),
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    async fn add_chunks(&mut self, chunks: &[DocumentChunk]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let schema = create_schema(self.embedding_dim);
        let batch = chunks_to_batch(&schema, self.embedding_dim, chunks)?;

        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to add chunks: {}", e)))?;

        tracing::debug!("Inserted {} chunks into LanceDB", chunks.len());
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        if query_embedding.len() != self.embedding_dim {
            return Err(AppError::Knowledge(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                query_embedding.len()
            )));
        }

        let batches = self
            .table
            .query()
            .nearest_to(query_embedding.to_vec())
            .map_err(|e| AppError::Knowledge(format!("Failed to create query: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to execute search: {}", e)))?
            .try_collect::<Vec<RecordBatch>>()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to collect results: {}", e)))?;

        let mut results = Vec::new();
        for batch in &batches {
            for chunk in batch_to_chunks(batch)? {
                let score = chunk
                    .embedding
                    .as_deref()
                    .map(|e| cosine_similarity(query_embedding, e))
                    .unwrap_or(0.0);
                results.push(ScoredChunk { chunk, score });
            }
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to count rows: {}", e)))
    }
}
