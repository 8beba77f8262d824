//! Router assembly: health page, HTTP API, uploaded files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod extract;
pub mod http;

/// Build the application router with:
/// - `/healthz` liveness probe and `/` HTML status page
/// - REST-ish API under `/api/v1/...`
/// - Shared documents and logos under `/files/...`
/// - Request body limit from `body_limit_bytes` (base64 uploads travel in JSON)
/// - CORS (allow any origin/method/headers), adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let files = ServeDir::new(&state.files_dir);
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        // Health
        .route("/", get(http::landing))
        .route("/healthz", get(http::healthz))
        // Workspace-wide
        .route("/api/v1/status", get(http::http_status))
        .route("/api/v1/profile", get(http::http_get_profile))
        .route("/api/v1/branding", get(http::http_get_branding).put(http::http_put_branding))
        .route("/api/v1/branding/logo", post(http::http_post_logo))
        // Intent queue
        .route(
            "/api/v1/workspaces/:ws/intents",
            get(http::http_get_intents)
                .post(http::http_add_intent)
                .put(http::http_put_intents),
        )
        .route("/api/v1/workspaces/:ws/intents/template", post(http::http_apply_template))
        .route(
            "/api/v1/workspaces/:ws/intents/:index",
            patch(http::http_update_intent).delete(http::http_remove_intent),
        )
        // Generation
        .route("/api/v1/workspaces/:ws/curriculum", post(http::http_post_curriculum))
        .route("/api/v1/workspaces/:ws/generate", post(http::http_post_generate))
        .route("/api/v1/workspaces/:ws/generate/cancel", post(http::http_post_cancel))
        // Archive & renderer
        .route("/api/v1/workspaces/:ws/archive", get(http::http_get_archive))
        .route(
            "/api/v1/workspaces/:ws/archive/:id",
            get(http::http_get_document).delete(http::http_delete_document),
        )
        .route("/api/v1/workspaces/:ws/archive/:id/edits", post(http::http_post_edits))
        .route("/api/v1/workspaces/:ws/archive/:id/export", get(http::http_get_export))
        .route("/api/v1/workspaces/:ws/archive/:id/share", post(http::http_post_share))
        // Practice
        .route("/api/v1/workspaces/:ws/archive/:id/practice", get(http::http_get_practice))
        .route("/api/v1/workspaces/:ws/archive/:id/practice/answer", post(http::http_post_answer))
        .route("/api/v1/workspaces/:ws/archive/:id/practice/submit", post(http::http_post_submit))
        .route("/api/v1/workspaces/:ws/archive/:id/practice/reset", post(http::http_post_reset))
        .route("/api/v1/workspaces/:ws/archive/:id/practice/history", get(http::http_get_history))
        // State + CORS + HTTP tracing
        .with_state(state)
        .nest_service("/files", files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::backend::GenerationBackend;
    use base64::Engine as _;

    use crate::generator::tests::{draft, ScriptedBackend, StalledBackend};
    use crate::state::tests::memory_state;

    async fn call(app: Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn call_raw(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn healthz_says_ok() {
        let app = build_router(Arc::new(memory_state(None)));
        let res = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn generate_without_credentials_is_401() {
        let app = build_router(Arc::new(memory_state(None)));
        let (status, body) = call(
            app,
            "POST",
            "/api/v1/workspaces/ws/generate",
            Some(serde_json::json!({ "topic": "Photosynthesis", "audience": "SECONDARY", "educationalLevel": "Grade 7" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "credential_missing");
    }

    #[tokio::test]
    async fn template_then_generate_then_practice() {
        let drafts = vec![Ok(draft("Homework", 1, 0)), Ok(draft("Quiz", 1, 0)), Ok(draft("Exam", 1, 0))];
        let backend: Arc<dyn GenerationBackend> = Arc::new(ScriptedBackend::with_documents(drafts));
        let state = Arc::new(memory_state(Some(backend)));

        let (status, body) = call(
            build_router(state.clone()),
            "POST",
            "/api/v1/workspaces/ws/intents/template",
            Some(serde_json::json!({ "name": "standard_suite" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "replaced");
        let types: Vec<_> = body["intents"].as_array().unwrap().iter().map(|i| i["documentType"].clone()).collect();
        assert_eq!(types, vec!["HOMEWORK", "QUIZ", "EXAM"]);

        let (status, body) = call(
            build_router(state.clone()),
            "POST",
            "/api/v1/workspaces/ws/generate",
            Some(serde_json::json!({ "topic": "Photosynthesis", "audience": "SECONDARY", "educationalLevel": "Grade 7" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "review");
        assert_eq!(body["documents"].as_array().unwrap().len(), 3);

        let (_, archive) = call(build_router(state.clone()), "GET", "/api/v1/workspaces/ws/archive", None).await;
        let id = archive["documents"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            build_router(state.clone()),
            "POST",
            &format!("/api/v1/workspaces/ws/archive/{id}/practice/answer"),
            Some(serde_json::json!({ "questionId": "m0", "answer": "light" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "answering");

        let (status, body) = call(
            build_router(state.clone()),
            "POST",
            &format!("/api/v1/workspaces/ws/archive/{id}/practice/submit"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["attempt"]["score"], 1);
    }

    #[tokio::test]
    async fn unknown_document_is_404() {
        let app = build_router(Arc::new(memory_state(None)));
        let (status, body) = call(app, "GET", "/api/v1/workspaces/ws/archive/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn missing_topic_is_missing_input() {
        let backend: Arc<dyn GenerationBackend> = Arc::new(ScriptedBackend::default());
        for state in [memory_state(None), memory_state(Some(backend))] {
            let (status, body) = call(
                build_router(Arc::new(state)),
                "POST",
                "/api/v1/workspaces/ws/generate",
                Some(serde_json::json!({ "audience": "SECONDARY", "educationalLevel": "Grade 7" })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "missing_input");
        }
    }

    #[tokio::test]
    async fn extractor_rejections_use_the_error_body() {
        let state = Arc::new(memory_state(None));

        let (status, body) = call_raw(build_router(state.clone()), "POST", "/api/v1/workspaces/ws/generate", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");

        let (status, body) = call(
            build_router(state.clone()),
            "POST",
            "/api/v1/workspaces/ws/generate",
            Some(serde_json::json!({ "topic": "Tides", "audience": "KINDERGARTEN" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");

        let (status, body) = call(
            build_router(state.clone()),
            "PATCH",
            "/api/v1/workspaces/ws/intents/abc",
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn unsafe_workspace_ids_are_rejected() {
        let state = Arc::new(memory_state(None));
        let (status, body) = call(build_router(state.clone()), "GET", "/api/v1/workspaces/team.a/archive", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");

        let long = "w".repeat(300);
        let (status, _) = call(build_router(state), "GET", &format!("/api/v1/workspaces/{long}/archive"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn large_uploads_reach_validation() {
        let state = Arc::new(memory_state(None));

        // 2.2 MB of base64: past axum's default limit, well within ours
        let pdf = "A".repeat(2_200_000);
        let (status, body) = call(
            build_router(state.clone()),
            "POST",
            "/api/v1/workspaces/ws/curriculum",
            Some(serde_json::json!({ "file": { "mimeType": "application/pdf", "dataBase64": pdf } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "credential_missing");

        let logo = base64::engine::general_purpose::STANDARD.encode(vec![0u8; 2 * 1024 * 1024 + 1]);
        let (status, body) = call(
            build_router(state),
            "POST",
            "/api/v1/branding/logo",
            Some(serde_json::json!({ "mimeType": "image/png", "dataBase64": logo })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert!(body["message"].as_str().unwrap().contains("logo exceeds"));
    }

    #[tokio::test]
    async fn cancel_endpoint_stops_an_in_flight_generation() {
        let stalled = Arc::new(StalledBackend::default());
        let backend: Arc<dyn GenerationBackend> = stalled.clone();
        let state = Arc::new(memory_state(Some(backend)));

        let pending = tokio::spawn(call(
            build_router(state.clone()),
            "POST",
            "/api/v1/workspaces/ws/generate",
            Some(serde_json::json!({ "topic": "Tides", "audience": "SECONDARY", "educationalLevel": "Grade 5" })),
        ));
        stalled.started.notified().await;

        let (status, body) = call(build_router(state.clone()), "POST", "/api/v1/workspaces/ws/generate/cancel", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cancelled"], true);

        let (status, body) = pending.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "cancelled");
        assert!(state.archive.load("ws").unwrap().is_empty());

        let (_, body) = call(build_router(state), "POST", "/api/v1/workspaces/ws/generate/cancel", None).await;
        assert_eq!(body["cancelled"], false);
    }

    #[tokio::test]
    async fn curriculum_returns_to_the_builder() {
        let scripted = ScriptedBackend::default();
        let lesson = crate::backend::LessonSummary {
            title: "Fractions".into(),
            summary: "Parts of a whole.".into(),
            suggested_questions: vec![],
        };
        scripted.lessons.lock().unwrap().push(Ok(vec![lesson]));
        let backend: Arc<dyn GenerationBackend> = Arc::new(scripted);
        let state = Arc::new(memory_state(Some(backend)));

        let (status, body) = call(
            build_router(state),
            "POST",
            "/api/v1/workspaces/ws/curriculum",
            Some(serde_json::json!({ "text": "Unit 3: fractions" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "builder");
        assert_eq!(body["intents"].as_array().unwrap().len(), 1);
    }
}
