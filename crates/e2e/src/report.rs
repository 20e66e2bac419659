//! Scenario outcomes and the run report

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::HarnessResult;

/// File name used by [`Report::write_json`]
pub const RESULTS_FILE: &str = "tablecheck-results.json";

/// Why a scenario ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Passed,
    /// The service answered, but not as the contract requires
    ContractViolation,
    /// No HTTP response was received
    TransportFailure,
    /// The input artifact could not be rendered
    FixtureError,
    /// A harness precondition was not met; no request was sent
    Skipped,
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::Passed => "passed",
            OutcomeKind::ContractViolation => "contract violation",
            OutcomeKind::TransportFailure => "transport failure",
            OutcomeKind::FixtureError => "fixture error",
            OutcomeKind::Skipped => "skipped",
        }
    }
}

/// Verdict for one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    scenario_name: String,
    passed: bool,
    kind: OutcomeKind,
    detail: String,
    duration_ms: u64,
}

impl Outcome {
    pub fn pass(scenario_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            passed: true,
            kind: OutcomeKind::Passed,
            detail: detail.into(),
            duration_ms: 0,
        }
    }

    /// A failed outcome; `kind` must not be `Passed`
    pub fn fail(scenario_name: impl Into<String>, kind: OutcomeKind, detail: impl Into<String>) -> Self {
        let mut detail = detail.into();
        if detail.trim().is_empty() {
            detail = format!("{} (no further detail)", kind.label());
        }
        let kind = if kind == OutcomeKind::Passed { OutcomeKind::ContractViolation } else { kind };

        Self {
            scenario_name: scenario_name.into(),
            passed: false,
            kind,
            detail,
            duration_ms: 0,
        }
    }

    /// Precondition not met; recorded as failed but kept apart from defects
    pub fn skipped(scenario_name: impl Into<String>, reason: &str) -> Self {
        Self::fail(
            scenario_name,
            OutcomeKind::Skipped,
            format!("skipped — precondition not met: {}", reason),
        )
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Summary of a run, derived from its outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    outcomes: Vec<Outcome>,
    total: usize,
    passed_count: usize,
    failed_count: usize,
    verdict: bool,
}

impl Report {
    pub fn from_outcomes(outcomes: Vec<Outcome>) -> Self {
        let total = outcomes.len();
        let passed_count = outcomes.iter().filter(|o| o.passed).count();
        Self {
            total,
            passed_count,
            failed_count: total - passed_count,
            verdict: passed_count == total,
            outcomes,
        }
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn passed_count(&self) -> usize {
        self.passed_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// True iff every recorded outcome passed
    pub fn verdict(&self) -> bool {
        self.verdict
    }

    pub fn outcome(&self, scenario_name: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.scenario_name == scenario_name)
    }

    /// Write the report as pretty JSON into `dir`
    pub fn write_json(&self, dir: &Path) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(RESULTS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Collects outcomes in the order they are recorded
#[derive(Debug, Default)]
pub struct ResultAggregator {
    outcomes: Vec<Outcome>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn summarize(&self) -> Report {
        Report::from_outcomes(self.outcomes.clone())
    }

    pub(crate) fn clear(&mut self) {
        self.outcomes.clear();
    }
}
