//! Scenario runner that drives fixtures, client and validator in sequence

use std::time::Instant;

use serde_json::json;
use tracing::{debug, error, info, warn};

use tablecheck_common::{ExportPayload, ExportRequest, ExtractedData};

use crate::client::{CallResult, ServiceClient};
use crate::config::HarnessConfig;
use crate::error::{FixtureError, HarnessError, HarnessResult};
use crate::fixture::{ArtifactFormat, FixtureGenerator, RenderedArtifact};
use crate::report::{Outcome, OutcomeKind, Report, ResultAggregator};
use crate::scenario::Scenario;
use crate::validate::{Expectation, ResponseValidator};

/// File name reported to the export endpoint
pub const EXPORT_FILENAME: &str = "test_export";

/// Where the runner is in its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Ready,
    Running(Scenario),
    Reported,
}

/// Runs the scenario sequence against one service
pub struct ScenarioRunner {
    client: ServiceClient,
    validator: ResponseValidator,
    fixtures: FixtureGenerator,
    aggregator: ResultAggregator,
    credential: String,
    invalid_credential: String,
    /// Data from the most recent successful extraction, consumed by Export
    last_extraction: Option<ExtractedData>,
    state: RunState,
}

impl ScenarioRunner {
    /// Build a runner; configuration problems surface here, before any
    /// request is sent.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let fixtures = FixtureGenerator::from_config(&config);
        Self::with_fixtures(config, fixtures)
    }

    pub fn with_fixtures(config: HarnessConfig, fixtures: FixtureGenerator) -> HarnessResult<Self> {
        let client = ServiceClient::new(&config)?;
        let credential = config
            .credential
            .clone()
            .ok_or_else(|| HarnessError::InvalidConfig("credential is required".to_string()))?;
        let validator = ResponseValidator::from_config(&config, fixtures.table());

        info!("Target service: {}", client.base_url());
        debug!("Harness config: {:?}", config);

        Ok(Self {
            client,
            validator,
            fixtures,
            aggregator: ResultAggregator::new(),
            credential,
            invalid_credential: config.invalid_credential,
            last_extraction: None,
            state: RunState::Ready,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every scenario in order and return the final report
    pub async fn run_all_scenarios(&mut self) -> Report {
        self.aggregator.clear();
        self.last_extraction = None;

        info!("Running {} scenario(s)...", Scenario::ALL.len());
        let start = Instant::now();

        for scenario in Scenario::ALL {
            self.run_scenario(scenario).await;
        }

        self.state = RunState::Reported;
        let report = self.aggregator.summarize();

        info!("");
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            report.passed_count(),
            report.failed_count(),
            start.elapsed().as_millis()
        );
        report
    }

    /// Run a single scenario, record its outcome and return a copy of it
    pub async fn run_scenario(&mut self, scenario: Scenario) -> Outcome {
        self.state = RunState::Running(scenario);
        debug!("Running scenario: {} - {}", scenario, scenario.description());

        let start = Instant::now();
        let outcome = self
            .execute(scenario)
            .await
            .with_duration_ms(start.elapsed().as_millis() as u64);

        match outcome.kind() {
            OutcomeKind::Passed => info!("✓ {} ({} ms)", scenario, outcome.duration_ms()),
            OutcomeKind::Skipped => warn!("✗ {} - {}", scenario, outcome.detail()),
            _ => error!("✗ {} - {}", scenario, outcome.detail()),
        }

        self.aggregator.record(outcome.clone());
        outcome
    }

    /// Outcomes recorded so far
    pub fn report(&self) -> Report {
        self.aggregator.summarize()
    }

    async fn execute(&mut self, scenario: Scenario) -> Outcome {
        let name = scenario.name();

        match scenario {
            Scenario::Health => {
                let response = self.client.check_health().await;
                self.validator.validate(Expectation::Health, &response).into_outcome(name)
            }
            Scenario::ExtractImage => self.extract_ground_truth(scenario, ArtifactFormat::Image).await,
            Scenario::ExtractPdf => self.extract_ground_truth(scenario, ArtifactFormat::Pdf).await,
            Scenario::Export => self.export_last_extraction().await,
            Scenario::ErrorMissingCredential => {
                match self.send_fixture(ArtifactFormat::Image, "test.jpg", None).await {
                    Ok(response) => self.judge(scenario, &response),
                    Err(e) => fixture_failure(name, e),
                }
            }
            Scenario::ErrorUnsupportedType => {
                match self.send_fixture(ArtifactFormat::Text, "test.txt", Some(&self.credential)).await {
                    Ok(response) => self.judge(scenario, &response),
                    Err(e) => fixture_failure(name, e),
                }
            }
            Scenario::ErrorInvalidCredential => {
                let credential = Some(self.invalid_credential.as_str());
                match self.send_fixture(ArtifactFormat::Image, "test.jpg", credential).await {
                    Ok(response) => self.judge(scenario, &response),
                    Err(e) => fixture_failure(name, e),
                }
            }
            Scenario::ErrorMalformedExport => {
                let payload = ExportPayload::Raw(json!({"invalid": "data"}));
                let response = self.client.export_to_spreadsheet(&payload).await;
                self.judge(scenario, &response)
            }
        }
    }

    fn judge(&self, scenario: Scenario, response: &CallResult) -> Outcome {
        self.validator
            .validate(scenario.expectation(), response)
            .into_outcome(scenario.name())
    }

    async fn extract_ground_truth(&mut self, scenario: Scenario, format: ArtifactFormat) -> Outcome {
        let upload_name = format!("test_table.{}", format.extension());
        let response = match self.send_fixture(format, &upload_name, Some(&self.credential)).await {
            Ok(response) => response,
            Err(e) => return fixture_failure(scenario.name(), e),
        };

        let (check, data) = self.validator.validate_extraction(&response);
        if let Some(data) = data {
            self.last_extraction = Some(data);
        }
        check.into_outcome(scenario.name())
    }

    async fn export_last_extraction(&mut self) -> Outcome {
        let name = Scenario::Export.name();

        // No prior extraction means no request at all
        let Some(extracted_data) = self.last_extraction.clone() else {
            return Outcome::skipped(name, "no extracted data available");
        };

        let payload = ExportPayload::Request(ExportRequest {
            extracted_data,
            filename: EXPORT_FILENAME.to_string(),
        });
        let response = self.client.export_to_spreadsheet(&payload).await;
        self.judge(Scenario::Export, &response)
    }

    /// Render a fixture, upload it, and delete it again before returning
    async fn send_fixture(
        &self,
        format: ArtifactFormat,
        upload_name: &str,
        credential: Option<&str>,
    ) -> Result<CallResult, FixtureError> {
        let artifact = self.render(format)?.renamed(upload_name);
        if let Ok(digest) = artifact.sha256() {
            debug!("{} fixture sha256={}", format, digest);
        }

        let response = self.client.extract_table(&artifact, credential).await;
        drop(artifact);
        Ok(response)
    }

    fn render(&self, format: ArtifactFormat) -> Result<RenderedArtifact, FixtureError> {
        match format {
            ArtifactFormat::Image => self.fixtures.make_image_fixture(),
            ArtifactFormat::Pdf => self.fixtures.make_pdf_fixture(),
            ArtifactFormat::Text => self.fixtures.make_text_fixture(),
        }
    }
}

fn fixture_failure(scenario_name: &str, error: FixtureError) -> Outcome {
    Outcome::fail(
        scenario_name,
        OutcomeKind::FixtureError,
        format!("fixture generation failed: {}", error),
    )
}
