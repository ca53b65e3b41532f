use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::models::{ChunkText, ScoredChunk};
use crate::services::RagService;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ChunksQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChunksResponse {
    pub document_id: i64,
    pub q: Option<String>,
    pub count: usize,
    pub chunks: Vec<ChunkText>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub document_id: i64,
    pub q: String,
    pub k: usize,
    pub results: Vec<ScoredChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub document_id: i64,
    pub question: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub document_id: i64,
    pub question: String,
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /documents/{document_id}/chunks
pub async fn list_chunks(
    State(service): State<RagService>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<ChunksQuery>, QueryRejection>,
) -> Result<Json<ChunksResponse>, ApiError> {
    let Path(document_id) = path?;
    let Query(query) = query?;
    let chunks = service
        .store()
        .list_chunks(document_id, query.q.as_deref())
        .await
        .map_err(crate::error::RagError::from)?;

    Ok(Json(ChunksResponse {
        document_id,
        q: query.q,
        count: chunks.len(),
        chunks,
    }))
}

/// GET /documents/{document_id}/search
pub async fn search(
    State(service): State<RagService>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Path(document_id) = path?;
    let Query(query) = query?;
    let k = query.k.unwrap_or(service.default_k());
    let results = service
        .retriever()
        .retrieve(document_id, &query.q, k)
        .await?;

    Ok(Json(SearchResponse {
        document_id,
        q: query.q,
        k,
        results,
    }))
}

/// POST /ask
pub async fn ask(
    State(service): State<RagService>,
    request: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = request?;
    tracing::info!(document_id = request.document_id, "ask");

    let k = request.k.unwrap_or(service.default_k());
    let answer = service
        .synthesizer()
        .answer(request.document_id, &request.question, k)
        .await?;

    Ok(Json(AskResponse {
        document_id: request.document_id,
        question: request.question,
        answer: answer.answer,
        sources: answer.sources,
    }))
}
