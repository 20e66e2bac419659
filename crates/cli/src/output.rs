//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use tablecheck_e2e::{Outcome, OutcomeKind, Report};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Plain text format
    Plain,
}

fn marker(outcome: &Outcome) -> &'static str {
    if outcome.passed() {
        "✓"
    } else {
        "✗"
    }
}

fn kind_color(kind: OutcomeKind) -> Color {
    match kind {
        OutcomeKind::Passed => Color::Green,
        OutcomeKind::Skipped => Color::Yellow,
        _ => Color::Red,
    }
}

/// Render a report as a table
pub fn report_table(report: &Report) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["Scenario", "Passed", "Kind", "Duration", "Detail"]);
    for outcome in report.outcomes() {
        table.add_row(vec![
            Cell::new(outcome.scenario_name()),
            Cell::new(marker(outcome)).fg(kind_color(outcome.kind())),
            Cell::new(outcome.kind().label()),
            Cell::new(format!("{}ms", outcome.duration_ms())),
            Cell::new(outcome.detail()),
        ]);
    }
    table
}

/// Render a report as plain `marker name - detail` lines
pub fn report_plain(report: &Report) -> String {
    report
        .outcomes()
        .iter()
        .map(|outcome| format!("{} {} - {}", marker(outcome), outcome.scenario_name(), outcome.detail()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print a report followed by its verdict line
pub fn print_report(report: &Report, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{}", report_table(report));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
            return;
        }
        OutputFormat::Plain => {
            println!("{}", report_plain(report));
        }
    }

    let summary = format!(
        "{} of {} scenario(s) passed",
        report.passed_count(),
        report.total()
    );
    if report.verdict() {
        print_success(&summary);
    } else {
        print_error(&summary);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message.green());
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
