//! In-process mock extraction services for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use tablecheck_common::{ExportRequest, ExtractedTable, ExtractionResponse, XLSX_MIME};
use tablecheck_e2e::fixture::{HEADERS, ROWS};
use tablecheck_e2e::HarnessConfig;

/// The only credential the mock's "upstream provider" accepts
pub const GOOD_KEY: &str = "good-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Honors the whole contract and echoes the ground-truth table
    Faithful,
    /// Answers 5xx to everything
    Broken,
    /// Claims success on extraction but returns no data
    EmptySuccess,
    /// Like `Faithful`, but the first cell names the upload format
    /// ("IMG" or "PDF")
    TaggedByFormat,
    /// Like `TaggedByFormat`, but PDF extractions report failure
    PdfFails,
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    extract_calls: Arc<AtomicUsize>,
    export_calls: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<String>>>,
    exports: Arc<Mutex<Vec<serde_json::Value>>>,
}

/// Handle to a running mock; the server stops when dropped
pub struct MockService {
    pub base_url: String,
    extract_calls: Arc<AtomicUsize>,
    export_calls: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<String>>>,
    exports: Arc<Mutex<Vec<serde_json::Value>>>,
    handle: JoinHandle<()>,
}

impl MockService {
    pub async fn spawn(behavior: Behavior) -> Self {
        let state = MockState {
            behavior,
            extract_calls: Arc::new(AtomicUsize::new(0)),
            export_calls: Arc::new(AtomicUsize::new(0)),
            uploads: Arc::new(Mutex::new(Vec::new())),
            exports: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/api/", get(health))
            .route("/api/extract-table", post(extract))
            .route("/api/export-excel", post(export))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock service");
        let addr = listener.local_addr().expect("mock service address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock service");
        });

        Self {
            base_url: format!("http://{}", addr),
            extract_calls: state.extract_calls,
            export_calls: state.export_calls,
            uploads: state.uploads,
            exports: state.exports,
            handle,
        }
    }

    pub fn config(&self) -> HarnessConfig {
        config_for(&self.base_url)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn export_calls(&self) -> usize {
        self.export_calls.load(Ordering::SeqCst)
    }

    /// `file name (content type)` of every upload, in arrival order
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().expect("uploads lock").clone()
    }

    /// JSON bodies received by the export endpoint, in arrival order
    pub fn exports(&self) -> Vec<serde_json::Value> {
        self.exports.lock().expect("exports lock").clone()
    }

    /// First cell of the first table of every export body
    pub fn exported_first_cells(&self) -> Vec<String> {
        self.exports()
            .iter()
            .filter_map(|body| body.pointer("/extracted_data/tables/0/rows/0/0"))
            .filter_map(|cell| cell.as_str().map(str::to_string))
            .collect()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn config_for(base_url: &str) -> HarnessConfig {
    HarnessConfig {
        base_url: base_url.to_string(),
        credential: Some(GOOD_KEY.to_string()),
        timeout_secs: 5,
        ..Default::default()
    }
}

/// A base URL nothing is listening on
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind scratch listener");
    let addr = listener.local_addr().expect("scratch listener address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn ground_truth_table() -> ExtractedTable {
    ExtractedTable {
        headers: HEADERS.iter().map(|h| h.to_string()).collect(),
        rows: ROWS
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

async fn health(State(state): State<MockState>) -> Response {
    match state.behavior {
        Behavior::Broken => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => Json(json!({"message": "Table Extractor API Ready"})).into_response(),
    }
}

async fn extract(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    state.extract_calls.fetch_add(1, Ordering::SeqCst);

    let mut file: Option<(String, String)> = None;
    let mut api_key: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let _ = field.bytes().await;
                file = Some((file_name, content_type));
            }
            Some("api_key") => api_key = field.text().await.ok(),
            _ => {}
        }
    }

    if let Some((file_name, content_type)) = &file {
        state
            .uploads
            .lock()
            .expect("uploads lock")
            .push(format!("{} ({})", file_name, content_type));
    }

    if state.behavior == Behavior::Broken {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }

    // Required-field validation runs before anything looks at the file
    let (Some((file_name, content_type)), Some(api_key)) = (file, api_key) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "api_key"], "msg": "field required"}]})),
        )
            .into_response();
    };

    if !(content_type.starts_with("image/") || content_type == "application/pdf") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Only image files and PDFs are supported"})),
        )
            .into_response();
    }

    if api_key != GOOD_KEY {
        return Json(ExtractionResponse::failed(file_name, "API key not valid")).into_response();
    }

    let is_pdf = content_type == "application/pdf";
    match state.behavior {
        Behavior::EmptySuccess => Json(json!({
            "success": true,
            "filename": file_name,
            "extracted_data": null
        }))
        .into_response(),
        Behavior::PdfFails if is_pdf => {
            Json(ExtractionResponse::failed(file_name, "could not read PDF")).into_response()
        }
        Behavior::TaggedByFormat | Behavior::PdfFails => {
            let mut table = ground_truth_table();
            table.rows[0][0] = if is_pdf { "PDF" } else { "IMG" }.to_string();
            Json(ExtractionResponse::succeeded(file_name, vec![table])).into_response()
        }
        _ => Json(ExtractionResponse::succeeded(file_name, vec![ground_truth_table()])).into_response(),
    }
}

async fn export(State(state): State<MockState>, body: Bytes) -> Response {
    state.export_calls.fetch_add(1, Ordering::SeqCst);
    if let Ok(body) = serde_json::from_slice::<serde_json::Value>(&body) {
        state.exports.lock().expect("exports lock").push(body);
    }

    if state.behavior == Behavior::Broken {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match serde_json::from_slice::<ExportRequest>(&body) {
        Ok(request) if !request.extracted_data.tables.is_empty() => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, XLSX_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}.xlsx", request.filename),
                ),
            ],
            b"PK\x03\x04mock-xlsx".to_vec(),
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "extracted_data is required"})),
        )
            .into_response(),
    }
}
