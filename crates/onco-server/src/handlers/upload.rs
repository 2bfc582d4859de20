//! `/upload`: validate, store, and analyze a report file.
//!
//! The test identity gets an inline extract-and-summarize with no database
//! row; everyone else gets a `processing` row and a queued analysis job.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use crate::auth::{CurrentUser, TEST_USER_ID};
use crate::db;
use crate::dto::UploadResponse;
use crate::error::AppError;
use crate::services::analysis::{analyze_file, AnalysisJob, UploadKind};
use crate::state::AppState;

pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

const ALLOWED_TYPES: &[(&str, UploadKind)] = &[
    ("application/pdf", UploadKind::Pdf),
    ("image/jpeg", UploadKind::Image),
    ("image/png", UploadKind::Image),
];

/// Checks content type and size. Runs before any disk write.
pub fn validate_upload(content_type: &str, size: usize) -> Result<UploadKind, AppError> {
    let kind = ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == content_type)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| AppError::BadRequest("Invalid file type".into()))?;

    if size > MAX_FILE_SIZE {
        return Err(AppError::BadRequest("File too large".into()));
    }

    Ok(kind)
}

/// Storage name: namespaced by user id, spaces flattened. Repeated uploads
/// of the same filename overwrite.
pub fn stored_file_name(user_id: &str, original: &str) -> String {
    format!("{}_{}", user_id, original.replace(' ', "_"))
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .ok_or_else(|| AppError::BadRequest("Missing content type".into()))?
            .to_string();
        let file_name = field.file_name().unwrap_or("report").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        file = Some((content_type, file_name, bytes));
        break;
    }

    let (content_type, file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing file field".into()))?;

    let kind = validate_upload(&content_type, bytes.len())?;

    tokio::fs::create_dir_all(&state.settings.upload_dir)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let file_path = PathBuf::from(&state.settings.upload_dir)
        .join(stored_file_name(&user.id, &file_name));
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!("Stored upload at {} ({} bytes)", file_path.display(), bytes.len());

    if user.id == TEST_USER_ID {
        // Inline analysis, no database row.
        let summary = match analyze_file(&state, &file_path, kind).await {
            Ok(summary) => summary,
            Err(e) => format!("Could not parse file: {e}"),
        };
        return Ok(Json(UploadResponse {
            message: "Report uploaded successfully.".into(),
            report_id: 999,
            status: "analyzed",
            summary: Some(summary),
        }));
    }

    let report_id = {
        let conn = state
            .db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".into()))?;
        db::insert_report(&conn, &user.id, &user.role, &file_path.to_string_lossy())
            .map_err(|e| AppError::Internal(e.to_string()))?
    };

    state
        .analysis_tx
        .send(AnalysisJob { report_id, file_path, kind })
        .map_err(|e| AppError::Internal(format!("analysis queue closed: {e}")))?;

    Ok(Json(UploadResponse {
        message: "Report uploaded. AI analysis started.".into(),
        report_id,
        status: "processing",
        summary: None,
    }))
}


#[cfg(all(test, feature = "test-bypass"))]
mod bypass_tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use onco_config::{AuthSettings, LlmSettings, Settings, VisionSettings};
    use onco_core::{ConversationalPath, CoreError, DiagnosticPath};
    use onco_inference::{Summarizer, VisionClient};
    use onco_rag::KeywordClassifier;
    use rusqlite::Connection;
    use tower::ServiceExt;

    use crate::auth::BYPASS_TOKEN;
    use crate::db;
    use crate::services::analysis::AnalysisJob;
    use crate::services::supervisor::Supervisor;
    use crate::state::AppState;

    use super::upload;

    struct UnusedPath;

    #[async_trait]
    impl DiagnosticPath for UnusedPath {
        async fn analyze(
            &self,
            _query: &str,
            _vision_score: Option<f64>,
        ) -> Result<String, CoreError> {
            Err(CoreError::Llm("not under test".into()))
        }
    }

    #[async_trait]
    impl ConversationalPath for UnusedPath {
        async fn respond(&self, _query: &str) -> Result<String, CoreError> {
            Err(CoreError::Llm("not under test".into()))
        }
    }

    fn test_state(
        upload_dir: &Path,
    ) -> (Arc<AppState>, tokio::sync::mpsc::UnboundedReceiver<AnalysisJob>) {
        let conn = Connection::open_in_memory().unwrap();
        db::create_tables(&conn).unwrap();

        let http = reqwest::Client::new();
        let (analysis_tx, analysis_rx) = tokio::sync::mpsc::unbounded_channel();

        let settings = Settings {
            server_addr: "127.0.0.1:0".into(),
            database_path: ":memory:".into(),
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            auth: AuthSettings {
                base_url: "http://127.0.0.1:1".into(),
                anon_key: "anon".into(),
            },
            llm: LlmSettings {
                api_key: "k".into(),
                api_base: "http://127.0.0.1:1".into(),
                chat_model: "m".into(),
                team_model: "m".into(),
            },
            qdrant: None,
            vision: VisionSettings { base_url: "http://127.0.0.1:1".into(), model: "m".into() },
            serpapi_key: None,
            embed_model_dir: None,
            cancer_model_path: None,
        };

        let state = Arc::new(AppState {
            vision: VisionClient::new(http.clone(), &settings.vision.base_url, &settings.vision.model),
            settings,
            http,
            db: Mutex::new(conn),
            supervisor: Supervisor::new(
                Box::new(KeywordClassifier::new()),
                Box::new(UnusedPath),
                Box::new(UnusedPath),
            ),
            summarizer: Summarizer::spawn(),
            predictor: None,
            analysis_tx,
        });
        (state, analysis_rx)
    }

    /// One-page PDF with an empty content stream: parses cleanly but yields
    /// no extractable text.
    fn pdf_without_text() -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {},
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn multipart_upload(token: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "upload-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn bypass_identity_upload_answers_inline_and_writes_no_row() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _analysis_rx) = test_state(dir.path());

        let app = Router::new().route("/upload", post(upload)).with_state(state.clone());
        let request =
            multipart_upload(BYPASS_TOKEN, "empty scan.pdf", "application/pdf", &pdf_without_text());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["report_id"], 999);
        assert_eq!(body["status"], "analyzed");
        assert_eq!(body["summary"], "No readable text found.");

        // The file is stored, but no report row exists for the test identity.
        assert!(dir.path().join("mock_test_id_123_empty_scan.pdf").exists());
        let count: i64 = state
            .db
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
