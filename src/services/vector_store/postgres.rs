use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::Row;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use std::time::Duration;

use super::{VectorStore, effective_filter};
use crate::error::StoreError;
use crate::models::{
    ChunkText, DatabaseConfig, Document, NewChunk, NewDocument, ScoredChunk, StoreDriver,
    StoreStats,
};

pub struct PgVectorStore {
    pool: PgPool,
    embedding_dim: usize,
}

impl PgVectorStore {
    pub async fn connect(
        url: &str,
        config: &DatabaseConfig,
        embedding_dim: usize,
    ) -> Result<Self, StoreError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| StoreError::ConnectionError(e.to_string()))?;
        let options = options.options([(
            "statement_timeout",
            format!("{}s", config.statement_timeout_secs),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        Ok(Self::from_pool(pool, embedding_dim))
    }

    pub fn from_pool(pool: PgPool, embedding_dim: usize) -> Self {
        Self {
            pool,
            embedding_dim,
        }
    }

    async fn check_pgvector_extension(&self) -> Result<(), StoreError> {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT extname::text FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await?;

        if result.is_none() {
            return Err(StoreError::ExtensionMissing(
                "pgvector extension is not installed. Run: CREATE EXTENSION vector;".to_string(),
            ));
        }

        Ok(())
    }

    fn schema_statements(&self) -> Vec<String> {
        vec![
            "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id BIGSERIAL PRIMARY KEY,
                source TEXT NOT NULL,
                title TEXT,
                url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
            .to_string(),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS chunks (
                    id BIGSERIAL PRIMARY KEY,
                    document_id BIGINT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                    content TEXT NOT NULL CHECK (length(content) > 0),
                    embedding vector({}),
                    metadata JSONB,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )
                "#,
                self.embedding_dim
            ),
            "CREATE INDEX IF NOT EXISTS chunks_document_id_idx ON chunks (document_id, id)"
                .to_string(),
        ]
    }
}

/// Escape ILIKE wildcards so the filter matches literally.
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for c in filter.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn chunk_text(row: PgRow) -> ChunkText {
    ChunkText {
        id: row.get("id"),
        content: row.get("content"),
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| StoreError::ConnectionError(e.to_string()))
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        for statement in self.schema_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }

        self.check_pgvector_extension().await
    }

    async fn insert_document(
        &self,
        document: &NewDocument,
        chunks: &[NewChunk],
    ) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let (document_id,): (i64,) = sqlx::query_as(
            "INSERT INTO documents (source, title, url) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&document.source)
        .bind(&document.title)
        .bind(&document.url)
        .fetch_one(&mut *tx)
        .await?;

        // One row at a time so ids follow text order.
        for chunk in chunks {
            sqlx::query("INSERT INTO chunks (document_id, content, metadata) VALUES ($1, $2, $3)")
                .bind(document_id)
                .bind(&chunk.content)
                .bind(chunk.metadata.map(|m| m.to_json()))
                .execute(&mut *tx)
                .await?;
        }

        // Dropping the transaction on an early return rolls it back.
        tx.commit().await?;
        Ok(document_id)
    }

    async fn select_chunks_missing_embedding(&self) -> Result<Vec<ChunkText>, StoreError> {
        let rows = sqlx::query("SELECT id, content FROM chunks WHERE embedding IS NULL ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(chunk_text).collect())
    }

    async fn set_embedding(&self, chunk_id: i64, embedding: &[f32]) -> Result<(), StoreError> {
        let embedding = Vector::from(embedding.to_vec());
        let result =
            sqlx::query("UPDATE chunks SET embedding = $1 WHERE id = $2 AND embedding IS NULL")
                .bind(&embedding)
                .bind(chunk_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("chunk {chunk_id} missing or already embedded; left unchanged");
        }
        Ok(())
    }

    async fn list_chunks(
        &self,
        document_id: i64,
        filter: Option<&str>,
    ) -> Result<Vec<ChunkText>, StoreError> {
        let rows = match effective_filter(filter) {
            Some(filter) => {
                sqlx::query(
                    r#"
                    SELECT id, content
                    FROM chunks
                    WHERE document_id = $1 AND content ILIKE $2 ESCAPE '\'
                    ORDER BY id
                    "#,
                )
                .bind(document_id)
                .bind(like_pattern(filter))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, content FROM chunks WHERE document_id = $1 ORDER BY id")
                    .bind(document_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(chunk_text).collect())
    }

    async fn nearest_chunks(
        &self,
        document_id: i64,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let embedding = Vector::from(query.to_vec());

        let rows = sqlx::query(
            r#"
            SELECT id, content, (embedding <-> $1) AS distance
            FROM chunks
            WHERE document_id = $2 AND embedding IS NOT NULL
            ORDER BY embedding <-> $1, id
            LIMIT $3
            "#,
        )
        .bind(&embedding)
        .bind(document_id)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row: PgRow| ScoredChunk {
                id: row.get("id"),
                content: row.get("content"),
                distance: row.get("distance"),
            })
            .collect())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        let rows =
            sqlx::query("SELECT id, source, title, url, created_at FROM documents ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|row: PgRow| Document {
                id: row.get("id"),
                source: row.get("source"),
                title: row.get("title"),
                url: row.get("url"),
                created_at: row.get::<DateTime<Utc>, _>("created_at"),
            })
            .collect())
    }

    async fn delete_document(&self, document_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let (documents, chunks, embedded): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM documents),
                (SELECT COUNT(*) FROM chunks),
                (SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            documents: documents as u64,
            chunks: chunks as u64,
            embedded_chunks: embedded as u64,
        })
    }

    fn driver(&self) -> StoreDriver {
        StoreDriver::PostgreSQL
    }
}
