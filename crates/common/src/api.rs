//! HTTP contract of the table-extraction service

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Health check endpoint
pub const HEALTH_PATH: &str = "/api/";

/// Table extraction endpoint (multipart upload)
pub const EXTRACT_PATH: &str = "/api/extract-table";

/// Spreadsheet export endpoint (JSON body)
pub const EXPORT_PATH: &str = "/api/export-excel";

/// Multipart field carrying the uploaded document
pub const FORM_FILE: &str = "file";

/// Multipart field carrying the upstream provider credential
pub const FORM_API_KEY: &str = "api_key";

/// MIME type the export endpoint is expected to answer with
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Whether a `Content-Type` value names a spreadsheet document
pub fn is_spreadsheet_mime(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("spreadsheet") || lower.contains("excel")
}

/// Body of `GET /api/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

impl HealthResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        decode_object(body, "health", &["message"])
    }
}

/// One table recovered by the extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    /// A table counts as extracted only when it has both headers and rows
    pub fn is_populated(&self) -> bool {
        !self.headers.is_empty() && !self.rows.is_empty()
    }
}

/// The `extracted_data` object, passed back verbatim to the export endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub tables: Vec<ExtractedTable>,
}

impl ExtractedData {
    /// Tables carrying both headers and rows
    pub fn populated_tables(&self) -> impl Iterator<Item = &ExtractedTable> {
        self.tables.iter().filter(|t| t.is_populated())
    }

    pub fn has_populated_table(&self) -> bool {
        self.populated_tables().next().is_some()
    }
}

/// Body of `POST /api/extract-table`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResponse {
    /// Decode an extraction body; `success` is mandatory and every present
    /// field must have the documented type.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        decode_object(body, "extraction", &["success"])
    }

    /// Successful response carrying the given tables
    pub fn succeeded(filename: impl Into<String>, tables: Vec<ExtractedTable>) -> Self {
        Self {
            success: true,
            filename: Some(filename.into()),
            extracted_data: Some(ExtractedData { tables }),
            error: None,
        }
    }

    /// In-band failure, e.g. a credential rejected by the upstream provider
    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            filename: Some(filename.into()),
            extracted_data: None,
            error: Some(error.into()),
        }
    }
}

/// Body of `POST /api/export-excel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub extracted_data: ExtractedData,
    pub filename: String,
}

/// Anything the harness may send to the export endpoint. `Raw` exists to
/// probe the service's input validation with non-conforming JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExportPayload {
    Request(ExportRequest),
    Raw(serde_json::Value),
}

impl From<ExportRequest> for ExportPayload {
    fn from(request: ExportRequest) -> Self {
        ExportPayload::Request(request)
    }
}

/// Parse `body` as a JSON object, report the first absent `required` key as
/// `MissingField`, then decode into `T`.
fn decode_object<T: DeserializeOwned>(
    body: &[u8],
    what: &'static str,
    required: &[&str],
) -> Result<T> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|source| Error::Decode { what, source })?;

    if let Some(object) = value.as_object() {
        if let Some(missing) = required.iter().find(|key| !object.contains_key(**key)) {
            return Err(Error::MissingField((*missing).to_string()));
        }
    }

    serde_json::from_value(value).map_err(|source| Error::Decode { what, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success_response() {
        let body = br#"{
            "success": true,
            "filename": "test_table.jpg",
            "extracted_data": {
                "tables": [
                    {"headers": ["Product", "Price"], "rows": [["Laptop", "$999"]]}
                ]
            }
        }"#;
        let response = ExtractionResponse::from_slice(body).unwrap();
        assert!(response.success);
        assert_eq!(response.filename.as_deref(), Some("test_table.jpg"));
        let data = response.extracted_data.unwrap();
        assert!(data.has_populated_table());
        assert_eq!(data.tables[0].rows[0], vec!["Laptop", "$999"]);
    }

    #[test]
    fn test_missing_success_is_reported_by_name() {
        let err = ExtractionResponse::from_slice(br#"{"filename": "x.jpg"}"#).unwrap_err();
        assert!(matches!(err, Error::MissingField(ref f) if f == "success"));
    }

    #[test]
    fn test_mistyped_field_fails_closed() {
        let err = ExtractionResponse::from_slice(br#"{"success": "yes"}"#).unwrap_err();
        assert!(matches!(err, Error::Decode { what: "extraction", .. }));

        let err = ExtractionResponse::from_slice(
            br#"{"success": true, "extracted_data": {"tables": "none"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_empty_tables_are_not_populated() {
        let data = ExtractedData {
            tables: vec![ExtractedTable { headers: vec!["A".into()], rows: vec![] }],
        };
        assert!(!data.has_populated_table());
    }

    #[test]
    fn test_spreadsheet_mime_detection() {
        assert!(is_spreadsheet_mime(XLSX_MIME));
        assert!(is_spreadsheet_mime("application/vnd.ms-excel"));
        assert!(is_spreadsheet_mime("Application/Vnd.MS-Excel; charset=binary"));
        assert!(!is_spreadsheet_mime("application/json"));
    }

    #[test]
    fn test_raw_payload_serializes_verbatim() {
        let payload = ExportPayload::Raw(serde_json::json!({"invalid": "data"}));
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"invalid":"data"}"#);
    }

    #[test]
    fn test_health_requires_message() {
        assert!(HealthResponse::from_slice(br#"{"message": "Table Extractor API Ready"}"#).is_ok());
        assert!(matches!(
            HealthResponse::from_slice(br#"{"status": "ok"}"#),
            Err(Error::MissingField(_))
        ));
    }
}
