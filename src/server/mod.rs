//! HTTP surface over the retrieval pipeline.

mod error;
pub mod routes;

use std::future::Future;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::services::RagService;

pub use error::ApiError;

pub fn router(service: RagService) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/documents/{document_id}/chunks", get(routes::list_chunks))
        .route("/documents/{document_id}/search", get(routes::search))
        .route("/ask", post(routes::ask))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<S>(service: RagService, bind: &str, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let addr = listener.local_addr().context("failed to read bound address")?;

    tracing::info!(
        driver = %service.store().driver(),
        "listening on http://{addr}"
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::models::{Config, NewChunk, NewDocument};
    use crate::services::testing::{FailingCompleter, KeywordEmbedder, RecordingCompleter};
    use crate::services::{Completer, Embedder, MemoryStore, VectorStore};

    async fn service_with(completer: Arc<dyn Completer>) -> (RagService, i64) {
        let embedder = Arc::new(KeywordEmbedder::new(&["foo", "bar"]));
        let store = Arc::new(MemoryStore::new(2));

        let doc = store
            .insert_document(
                &NewDocument::new("local", "notes.txt"),
                &[
                    NewChunk::new("FOO at the start"),
                    NewChunk::new("only bar here"),
                    NewChunk::new("ends with foo"),
                ],
            )
            .await
            .unwrap();
        for chunk in store.select_chunks_missing_embedding().await.unwrap() {
            let vector = embedder.embed(&chunk.content).await.unwrap();
            store.set_embedding(chunk.id, &vector).await.unwrap();
        }

        let service = RagService::new(store, embedder, completer, &Config::default());
        (service, doc)
    }

    async fn service() -> (RagService, i64) {
        service_with(Arc::new(RecordingCompleter::new(" Foo is mentioned twice. "))).await
    }

    async fn send(service: RagService, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(service).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (service, _) = service().await;
        let (status, body) = send(service, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_chunks_filter_case_insensitive_in_id_order() {
        let (service, doc) = service().await;
        let (status, body) = send(service, get(&format!("/documents/{doc}/chunks?q=foo"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document_id"], doc);
        assert_eq!(body["q"], "foo");
        assert_eq!(body["count"], 2);

        let chunks = body["chunks"].as_array().unwrap();
        assert_eq!(chunks[0]["content"], "FOO at the start");
        assert_eq!(chunks[1]["content"], "ends with foo");
        assert!(chunks[0]["id"].as_i64() < chunks[1]["id"].as_i64());
    }

    #[tokio::test]
    async fn test_chunks_without_filter() {
        let (service, doc) = service().await;
        let (_, body) = send(service, get(&format!("/documents/{doc}/chunks"))).await;

        assert_eq!(body["q"], Value::Null);
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_search_defaults_k() {
        let (service, doc) = service().await;
        let (status, body) = send(service, get(&format!("/documents/{doc}/search?q=bar"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["k"], 5);
        assert_eq!(body["q"], "bar");

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["content"], "only bar here");
        assert_eq!(results[0]["distance"], 0.0);
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let (service, doc) = service().await;
        let (_, body) = send(service, get(&format!("/documents/{doc}/search?q=foo&k=1"))).await;

        assert_eq!(body["k"], 1);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_unknown_document_is_empty() {
        let (service, _) = service().await;
        let (status, body) = send(service, get("/documents/9999/search?q=foo")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_invalid_k() {
        let (service, doc) = service().await;
        let (status, body) =
            send(service, get(&format!("/documents/{doc}/search?q=foo&k=0"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request");
    }

    #[tokio::test]
    async fn test_search_malformed_k_is_json_error() {
        let (service, doc) = service().await;
        let (status, body) =
            send(service, get(&format!("/documents/{doc}/search?q=a&k=abc"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request");
        assert!(body["error"]["message"].as_str().unwrap().contains("k"));
    }

    #[tokio::test]
    async fn test_non_numeric_document_id_is_json_error() {
        let (service, _) = service().await;
        let (status, body) = send(service, get("/documents/abc/chunks")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request");
    }

    #[tokio::test]
    async fn test_ask_missing_question_is_json_error() {
        let (service, doc) = service().await;
        let (status, body) = send(
            service,
            post_json("/ask", serde_json::json!({"document_id": doc})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("question")
        );
    }

    #[tokio::test]
    async fn test_ask() {
        let (service, doc) = service().await;
        let request = post_json(
            "/ask",
            serde_json::json!({"document_id": doc, "question": "where is foo?", "k": 2}),
        );
        let (status, body) = send(service, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document_id"], doc);
        assert_eq!(body["question"], "where is foo?");
        assert_eq!(body["answer"], "Foo is mentioned twice.");
        assert_eq!(body["sources"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ask_provider_failure_is_bad_gateway() {
        let (service, doc) = service_with(Arc::new(FailingCompleter)).await;
        let request = post_json(
            "/ask",
            serde_json::json!({"document_id": doc, "question": "where is foo?"}),
        );
        let (status, body) = send(service, request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "provider_error");
    }
}
