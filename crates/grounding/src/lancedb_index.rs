//! LanceDB-backed vector index.
//!
//! The table is populated by an external ingestion job and only queried here.
//! Expected columns: `text` (utf8), `source` (utf8), `metadata` (utf8 JSON
//! object, nullable) and `vector` (fixed-size list of float32).

use crate::filter::SourceFilter;
use crate::types::{RetrievedDocument, SOURCE_KEY};
use crate::vector_index::VectorIndex;
use arrow_array::{Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use codelogic_core::{AppError, AppResult};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Read-only LanceDB index over corpus passages.
pub struct LanceDbIndex {
    table: Table,
}

impl LanceDbIndex {
    /// Open an existing table.
    pub async fn open(db_path: &Path, table_name: &str) -> AppResult<Self> {
        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Config(format!("Failed to connect to LanceDB at {:?}: {}", db_path, e)))?;

        let table = conn.open_table(table_name).execute().await.map_err(|e| {
            AppError::Config(format!(
                "Failed to open LanceDB table '{}' at {:?}: {}",
                table_name, db_path, e
            ))
        })?;

        tracing::debug!("Opened LanceDB table '{}' at {:?}", table_name, db_path);

        Ok(Self { table })
    }

    /// Arrow schema the ingestion job writes.
    pub fn schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("text", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, true),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
        ]))
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| AppError::Retrieval(format!("Invalid or missing '{}' column", name)))
    }

    fn batch_to_documents(batch: &RecordBatch) -> AppResult<Vec<RetrievedDocument>> {
        let text = Self::string_column(batch, "text")?;
        let source = Self::string_column(batch, "source")?;
        let metadata = batch
            .column_by_name("metadata")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>());

        let mut documents = Vec::with_capacity(batch.num_rows());

        for row in 0..batch.num_rows() {
            let mut meta = match metadata {
                Some(col) if !col.is_null(row) => {
                    serde_json::from_str::<Map<String, Value>>(col.value(row)).map_err(|e| {
                        AppError::Retrieval(format!("Failed to parse metadata: {}", e))
                    })?
                }
                _ => Map::new(),
            };
            meta.insert(
                SOURCE_KEY.to_string(),
                Value::String(source.value(row).to_string()),
            );

            documents.push(RetrievedDocument {
                page_content: text.value(row).to_string(),
                metadata: meta,
            });
        }

        Ok(documents)
    }
}

#[async_trait]
impl VectorIndex for LanceDbIndex {
    fn backend_name(&self) -> &str {
        "lancedb"
    }

    async fn similarity_search_with_filter(
        &self,
        vector: &[f32],
        filter: &SourceFilter,
        k: usize,
    ) -> AppResult<Vec<RetrievedDocument>> {
        let mut query = self
            .table
            .query()
            .nearest_to(vector.to_vec())
            .map_err(|e| AppError::Retrieval(format!("Failed to create query: {}", e)))?
            .limit(k);

        if let Some(predicate) = filter.to_sql() {
            query = query.only_if(predicate);
        }

        let batches: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to collect results: {}", e)))?;

        let mut documents = Vec::new();
        for batch in &batches {
            documents.extend(Self::batch_to_documents(batch)?);
        }

        tracing::debug!("LanceDB returned {} passages (requested top-{})", documents.len(), k);

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{FixedSizeListArray, Float32Array, RecordBatchIterator};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    async fn seed(dir: &Path) {
        let schema = LanceDbIndex::schema(2);
        let vectors = FixedSizeListArray::new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            2,
            Arc::new(Float32Array::from(vec![1.0, 0.0, 0.9, 0.1, 0.0, 1.0])),
            None,
        );
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["fire passage", "building passage", "far passage"])),
                Arc::new(StringArray::from(vec!["docs/fire.pdf", "docs/building.pdf", "docs/building.pdf"])),
                Arc::new(StringArray::from(vec![Some(r#"{"page": 4}"#), None, None])),
                Arc::new(vectors),
            ],
        )
        .unwrap();

        let conn = lancedb::connect(&dir.to_string_lossy()).execute().await.unwrap();
        conn.create_table("chunks", RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_search_with_filter() {
        let temp = TempDir::new().unwrap();
        seed(temp.path()).await;

        let index = LanceDbIndex::open(temp.path(), "chunks").await.unwrap();

        let all = index
            .similarity_search_with_filter(&[1.0, 0.0], &SourceFilter::Unrestricted, 2)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].page_content, "fire passage");
        assert_eq!(all[0].metadata["page"], serde_json::json!(4));

        let filter = SourceFilter::SourceIn(BTreeSet::from(["docs/building.pdf".to_string()]));
        let filtered = index
            .similarity_search_with_filter(&[1.0, 0.0], &filter, 9)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered
            .iter()
            .all(|d| d.source() == Some("docs/building.pdf")));
        assert_eq!(filtered[0].page_content, "building passage");
    }

    #[tokio::test]
    async fn test_open_missing_table() {
        let temp = TempDir::new().unwrap();
        assert!(LanceDbIndex::open(temp.path(), "missing").await.is_err());
    }
}
