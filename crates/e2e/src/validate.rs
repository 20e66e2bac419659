//! Response classification against the service contract

use tablecheck_common::{
    is_spreadsheet_mime, Error as WireError, ExtractedData, ExtractedTable, ExtractionResponse,
    HealthResponse,
};

use crate::client::{CallResult, RawResponse};
use crate::config::HarnessConfig;
use crate::fixture::TableFixture;
use crate::report::{Outcome, OutcomeKind};

/// What a response is supposed to look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// 200 with a readiness message
    Health,
    /// 200, `success=true` and at least one populated table
    ExtractSuccess,
    /// 422: `api_key` is a required field
    MissingCredential,
    /// 400: file type not accepted
    UnsupportedType,
    /// 200 with `success=false`, never a crash
    RejectedCredential,
    /// 200 with a non-empty spreadsheet body
    ExportSuccess,
    /// 400: payload lacks `extracted_data`
    ExportRejected,
}

/// Result of checking one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Ok(String),
    TransportFailure(String),
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        body: String,
    },
    MissingField(String),
    UnexpectedValue {
        field: String,
        expected: String,
        actual: String,
    },
}

impl Check {
    pub fn passed(&self) -> bool {
        matches!(self, Check::Ok(_))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Check::Ok(_) => OutcomeKind::Passed,
            Check::TransportFailure(_) => OutcomeKind::TransportFailure,
            Check::UnexpectedStatus { .. } | Check::MissingField(_) | Check::UnexpectedValue { .. } => {
                OutcomeKind::ContractViolation
            }
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Check::Ok(detail) => detail.clone(),
            Check::TransportFailure(e) => format!("transport failure: {}", e),
            Check::UnexpectedStatus { expected, actual, body } => {
                let crash = if *actual >= 500 { " (server error)" } else { "" };
                if body.is_empty() {
                    format!("expected status {}, got {}{}", expected, actual, crash)
                } else {
                    format!("expected status {}, got {}{}: {}", expected, actual, crash, body)
                }
            }
            Check::MissingField(field) => format!("missing field {}", field),
            Check::UnexpectedValue { field, expected, actual } => {
                format!("{}: expected {}, got {}", field, expected, actual)
            }
        }
    }

    pub fn into_outcome(self, scenario_name: &str) -> Outcome {
        if self.passed() {
            Outcome::pass(scenario_name, self.detail())
        } else {
            Outcome::fail(scenario_name, self.kind(), self.detail())
        }
    }
}

/// Judges responses; holds the readiness text and, when fidelity checking is
/// on, the table extractions must reproduce.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    ready_message: String,
    fidelity: Option<TableFixture>,
}

impl ResponseValidator {
    pub fn new(ready_message: impl Into<String>, fidelity: Option<TableFixture>) -> Self {
        Self {
            ready_message: ready_message.into(),
            fidelity,
        }
    }

    pub fn from_config(config: &HarnessConfig, table: &TableFixture) -> Self {
        let fidelity = config.check_fidelity.then(|| table.clone());
        Self::new(config.ready_message.clone(), fidelity)
    }

    pub fn validate(&self, expectation: Expectation, result: &CallResult) -> Check {
        let response = match result {
            Ok(response) => response,
            Err(e) => return Check::TransportFailure(e.to_string()),
        };

        match expectation {
            Expectation::Health => self.check_health(response),
            Expectation::ExtractSuccess => self.check_extraction(response).0,
            Expectation::MissingCredential => expect_status(response, 422),
            Expectation::UnsupportedType => expect_status(response, 400),
            Expectation::RejectedCredential => check_rejected_credential(response),
            Expectation::ExportSuccess => check_export(response),
            Expectation::ExportRejected => expect_status(response, 400),
        }
    }

    /// Like `validate(ExtractSuccess, ..)`, also handing back the extracted
    /// data when the check passed.
    pub fn validate_extraction(&self, result: &CallResult) -> (Check, Option<ExtractedData>) {
        match result {
            Ok(response) => self.check_extraction(response),
            Err(e) => (Check::TransportFailure(e.to_string()), None),
        }
    }

    fn check_health(&self, response: &RawResponse) -> Check {
        if response.status != 200 {
            return unexpected_status(response, 200);
        }

        let health = match HealthResponse::from_slice(&response.body) {
            Ok(health) => health,
            Err(e) => return decode_failure(e, response),
        };

        if health.message.contains(&self.ready_message) {
            Check::Ok(format!("ready: {}", health.message))
        } else {
            Check::UnexpectedValue {
                field: "message".to_string(),
                expected: format!("text containing '{}'", self.ready_message),
                actual: format!("'{}'", health.message),
            }
        }
    }

    fn check_extraction(&self, response: &RawResponse) -> (Check, Option<ExtractedData>) {
        if response.status != 200 {
            return (unexpected_status(response, 200), None);
        }

        let extraction = match ExtractionResponse::from_slice(&response.body) {
            Ok(extraction) => extraction,
            Err(e) => return (decode_failure(e, response), None),
        };

        if !extraction.success {
            return (
                Check::UnexpectedValue {
                    field: "success".to_string(),
                    expected: "true".to_string(),
                    actual: format!(
                        "false (error: {})",
                        extraction.error.as_deref().unwrap_or("none given")
                    ),
                },
                None,
            );
        }

        // A successful response must carry data; absence is a failure, not a skip
        let Some(data) = extraction.extracted_data else {
            return (Check::MissingField("extracted_data".to_string()), None);
        };
        let Some(table) = self.pick_table(&data) else {
            return (
                Check::MissingField("extracted_data.tables (no table with both headers and rows)".to_string()),
                None,
            );
        };

        if let Some(expected) = &self.fidelity {
            if table.headers != expected.headers() {
                return (
                    Check::UnexpectedValue {
                        field: "extracted_data.tables[].headers".to_string(),
                        expected: format!("{:?}", expected.headers()),
                        actual: format!("{:?}", table.headers),
                    },
                    None,
                );
            }
            if table.rows.len() != expected.rows().len() {
                return (
                    Check::UnexpectedValue {
                        field: "extracted_data.tables[].rows".to_string(),
                        expected: format!("{} rows", expected.rows().len()),
                        actual: format!("{} rows", table.rows.len()),
                    },
                    None,
                );
            }
        }

        let mut detail = format!(
            "{} table(s); headers {:?}; {} row(s); first row {:?}",
            data.tables.len(),
            table.headers,
            table.rows.len(),
            table.rows[0]
        );
        if let Some(filename) = &extraction.filename {
            detail.push_str(&format!("; file {}", filename));
        }
        if let Some(expected) = &self.fidelity {
            if table.rows[0] != expected.rows()[0] {
                detail.push_str(&format!("; first row differs from fixture {:?}", expected.rows()[0]));
            }
        }

        (Check::Ok(detail), Some(data))
    }

    /// With fidelity checking, prefer the table whose headers match the
    /// fixture; otherwise the first populated one.
    fn pick_table<'a>(&self, data: &'a ExtractedData) -> Option<&'a ExtractedTable> {
        let matching = self.fidelity.as_ref().and_then(|expected| {
            data.populated_tables().find(|t| t.headers == expected.headers())
        });
        matching.or_else(|| data.populated_tables().next())
    }
}

fn expect_status(response: &RawResponse, expected: u16) -> Check {
    if response.status == expected {
        Check::Ok(format!("status {} as expected", expected))
    } else {
        unexpected_status(response, expected)
    }
}

fn unexpected_status(response: &RawResponse, expected: u16) -> Check {
    Check::UnexpectedStatus {
        expected,
        actual: response.status,
        body: response.snippet(),
    }
}

fn decode_failure(error: WireError, response: &RawResponse) -> Check {
    match error {
        WireError::MissingField(field) => Check::MissingField(field),
        WireError::Decode { what, source } => Check::UnexpectedValue {
            field: "body".to_string(),
            expected: format!("a well-formed {} JSON object", what),
            actual: format!("{} ({})", response.snippet(), source),
        },
    }
}

fn check_rejected_credential(response: &RawResponse) -> Check {
    if response.status != 200 {
        return unexpected_status(response, 200);
    }

    let extraction = match ExtractionResponse::from_slice(&response.body) {
        Ok(extraction) => extraction,
        Err(e) => return decode_failure(e, response),
    };

    if extraction.success {
        return Check::UnexpectedValue {
            field: "success".to_string(),
            expected: "false for a rejected credential".to_string(),
            actual: "true".to_string(),
        };
    }

    Check::Ok(format!(
        "rejected in-band: {}",
        extraction.error.as_deref().unwrap_or("no error message")
    ))
}

fn check_export(response: &RawResponse) -> Check {
    if response.status != 200 {
        return unexpected_status(response, 200);
    }

    let Some(content_type) = response.content_type() else {
        return Check::MissingField("Content-Type header".to_string());
    };

    if !is_spreadsheet_mime(content_type) {
        return Check::UnexpectedValue {
            field: "Content-Type".to_string(),
            expected: "a spreadsheet or excel MIME type".to_string(),
            actual: content_type.to_string(),
        };
    }

    if response.body.is_empty() {
        return Check::UnexpectedValue {
            field: "body length".to_string(),
            expected: "more than 0 bytes".to_string(),
            actual: "0 bytes".to_string(),
        };
    }

    Check::Ok(format!("{} ({} bytes)", content_type, response.body.len()))
}
