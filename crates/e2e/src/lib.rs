//! tablecheck E2E Harness
//!
//! This crate checks the external contract of a table-extraction web service:
//! - Renders ground-truth table fixtures as JPEG images and PDFs
//! - Drives the health, extract and export endpoints over HTTP
//! - Classifies every response into a pass/fail Outcome
//! - Folds outcomes into a Report with an overall verdict
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ScenarioRunner                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Health → ExtractImage → ExtractPdf → Export                │
//! │         → ErrorMissingCredential → ErrorUnsupportedType     │
//! │         → ErrorInvalidCredential → ErrorMalformedExport     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FixtureGenerator ──► RenderedArtifact (temp file)          │
//! │  ServiceClient    ──► RawResponse | TransportError          │
//! │  ResponseValidator──► Check                                 │
//! │  ResultAggregator ──► Report                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod fixture;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod validate;

pub use client::{RawResponse, ServiceClient};
pub use config::HarnessConfig;
pub use error::{FixtureError, HarnessError, HarnessResult, TransportError};
pub use fixture::{ArtifactFormat, FixtureGenerator, RenderedArtifact, TableFixture};
pub use report::{Outcome, OutcomeKind, Report, ResultAggregator};
pub use runner::ScenarioRunner;
pub use scenario::Scenario;
pub use validate::{Check, Expectation, ResponseValidator};
