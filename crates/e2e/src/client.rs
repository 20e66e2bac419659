//! HTTP driver for the service under test

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use tracing::debug;

use tablecheck_common::{ExportPayload, EXPORT_PATH, EXTRACT_PATH, FORM_API_KEY, FORM_FILE, HEALTH_PATH};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult, TransportError};
use crate::fixture::RenderedArtifact;

/// Longest body excerpt carried into failure details
const BODY_SNIPPET_LEN: usize = 200;

/// Result of one call: a response of any status, or no response at all
pub type CallResult = Result<RawResponse, TransportError>;

/// A complete HTTP response, status not yet judged
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    async fn read(response: reqwest::Response) -> CallResult {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!("Response {} ({} bytes)", status, body.len());
        Ok(Self { status, headers, body })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body text cut down for use in outcome details
    pub fn snippet(&self) -> String {
        let text = self.text_lossy();
        if text.chars().count() <= BODY_SNIPPET_LEN {
            return text;
        }
        let cut: String = text.chars().take(BODY_SNIPPET_LEN).collect();
        format!("{}…", cut)
    }
}

/// Issues the three service operations, each as a single attempt
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ServiceClient {
    pub fn new(config: &HarnessConfig) -> HarnessResult<Self> {
        let base_url = config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(HarnessError::ClientBuild)?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// `GET /api/`
    pub async fn check_health(&self) -> CallResult {
        let url = self.endpoint(HEALTH_PATH);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        RawResponse::read(response).await
    }

    /// `POST /api/extract-table`; `credential: None` leaves out the
    /// `api_key` field entirely.
    pub async fn extract_table(
        &self,
        artifact: &RenderedArtifact,
        credential: Option<&str>,
    ) -> CallResult {
        let url = self.endpoint(EXTRACT_PATH);
        let bytes = artifact.read_bytes()?;
        debug!(
            "POST {} file={} ({}, {} bytes) api_key={}",
            url,
            artifact.upload_name(),
            artifact.mime(),
            bytes.len(),
            if credential.is_some() { "set" } else { "absent" }
        );

        let part = Part::bytes(bytes)
            .file_name(artifact.upload_name().to_string())
            .mime_str(artifact.mime())?;
        let mut form = Form::new().part(FORM_FILE, part);
        if let Some(credential) = credential {
            form = form.text(FORM_API_KEY, credential.to_string());
        }

        let response = self.http.post(&url).multipart(form).send().await?;
        RawResponse::read(response).await
    }

    /// `POST /api/export-excel` with any JSON payload
    pub async fn export_to_spreadsheet(&self, payload: &ExportPayload) -> CallResult {
        let url = self.endpoint(EXPORT_PATH);
        debug!("POST {}", url);
        let response = self.http.post(&url).json(payload).send().await?;
        RawResponse::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ServiceClient {
        ServiceClient::new(&HarnessConfig {
            base_url: base_url.to_string(),
            credential: Some("key".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joining() {
        let c = client("http://127.0.0.1:8001");
        assert_eq!(c.endpoint(HEALTH_PATH), "http://127.0.0.1:8001/api/");
        assert_eq!(c.endpoint(EXTRACT_PATH), "http://127.0.0.1:8001/api/extract-table");

        let prefixed = client("https://example.com/extractor/");
        assert_eq!(prefixed.endpoint(EXPORT_PATH), "https://example.com/extractor/api/export-excel");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = ServiceClient::new(&HarnessConfig {
            base_url: "::nope".to_string(),
            credential: Some("key".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(HarnessError::InvalidConfig(_))));
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let response = RawResponse {
            status: 500,
            headers: HeaderMap::new(),
            body: Bytes::from("x".repeat(500)),
        };
        let snippet = response.snippet();
        assert_eq!(snippet.chars().count(), BODY_SNIPPET_LEN + 1);
        assert!(snippet.ends_with('…'));
    }
}
