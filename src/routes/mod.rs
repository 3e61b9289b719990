//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/` - Single page UI
//! - `/api/health` - Health checks
//! - `/api/sessions` - Upload, question, chart and JSON column endpoints

pub mod health;
pub mod sessions;
pub mod ui;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
///
/// Uploads are bounded by `MAX_UPLOAD_BYTES`; everything else goes through
/// the same CORS and trace layers.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);
    let body_limit = DefaultBodyLimit::max(state.config.data.max_upload_bytes);

    Router::new()
        .merge(sessions::router(state.clone()))
        .merge(health::router(state))
        .merge(ui::router())
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::tests::RecordingRenderer;
    use crate::charts::ChartDispatcher;
    use crate::config::Config;
    use crate::llm::provider::{testing::ScriptedAdapter, LLM};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "ask-csv-test-boundary";

    struct TestApp {
        _dir: TempDir,
        adapter: ScriptedAdapter,
        router: Router,
    }

    fn test_app() -> TestApp {
        let dir = TempDir::new().unwrap();
        let mut config = Config::for_tests();
        config.data.upload_dir = dir.path().to_path_buf();

        let adapter = ScriptedAdapter::replying("There are 3 rows.");
        let llm = Arc::new(LLM::from_adapter("scripted", Box::new(adapter.clone())));
        let charts = ChartDispatcher::new(Arc::new(RecordingRenderer::default()));

        TestApp {
            _dir: dir,
            adapter,
            router: create_router(AppState::new(config, llm, charts)),
        }
    }

    fn upload_request(csv: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
            b = BOUNDARY,
            csv = csv
        );
        Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_session(app: &TestApp, csv: &str) -> String {
        let response = app.router.clone().oneshot(upload_request(csv)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let view = body_json(response).await;
        view["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_upload_returns_preview() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(upload_request("A,B\n1,x\n2,y\n3,x\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let view = body_json(response).await;
        assert_eq!(view["row_count"], 3);
        assert_eq!(view["preview"]["columns"], json!(["A", "B"]));
        assert_eq!(view["preview"]["rows"][0], json!([1, "x"]));
        assert_eq!(view["revision"], 1);
        assert!(view["answer"].is_null());
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let app = test_app();
        let response = app.router.clone().oneshot(upload_request("A,B\n")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let error = body_json(response).await;
        assert_eq!(error["details"], crate::types::EMPTY_DATASET_MESSAGE);
    }

    #[tokio::test]
    async fn test_question_is_answered() {
        let app = test_app();
        let id = create_session(&app, "A,B\n1,x\n2,y\n3,x\n").await;

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/sessions/{}/question", id),
                json!({ "question": "How many rows are there?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let view = body_json(response).await;
        assert_eq!(view["answer"], "There are 3 rows.");
        assert!(view["chart"].is_null());
        assert_eq!(app.adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_chart_question_then_selection() {
        let app = test_app();
        let id = create_session(&app, "A,B\n1,x\n2,y\n3,x\n").await;

        let view = body_json(
            app.router
                .clone()
                .oneshot(json_request(
                    "POST",
                    &format!("/api/sessions/{}/question", id),
                    json!({ "question": "Make a pie plot of B" }),
                ))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view["chart"]["kind"], "pie");
        assert_eq!(view["chart"]["prompts"][0]["key"], "column");

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/sessions/{}/chart", id),
                json!({ "column": "B" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chart = body_json(response).await;
        assert_eq!(chart["title"], "Pie Chart of B");
        assert_eq!(chart["format"], "svg");
        assert_eq!(chart["revision"], view["revision"].as_u64().unwrap() + 1);
    }

    #[tokio::test]
    async fn test_chart_without_chart_question_is_rejected() {
        let app = test_app();
        let id = create_session(&app, "A,B\n1,x\n").await;

        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/sessions/{}/chart", id),
                json!({ "column": "A" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_json_column() {
        let app = test_app();
        let id = create_session(&app, "title,tags\nfoo,\"['a', 'b']\"\nbar,oops\n").await;

        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/api/sessions/{}/columns/tags/json", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["values"], json!([["a", "b"], []]));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = test_app();
        let id = create_session(&app, "A\n1\n").await;
        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/sessions/{}", id))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.router.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/api/sessions/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.router.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = test_app();
        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/api/sessions/{}", uuid::Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_counts_sessions() {
        let app = test_app();
        create_session(&app, "A\n1\n").await;

        let response = app.router.clone().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health = body_json(response).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["sessions"], 1);
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = test_app();
        let response = app.router.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("ASK YOUR CSV"));
    }
}
