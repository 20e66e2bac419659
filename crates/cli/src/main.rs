//! tablecheck CLI - Main Entry Point
//!
//! Runs the contract scenarios against a table-extraction service and
//! writes the fixtures it uploads.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use tablecheck_e2e::{FixtureGenerator, HarnessConfig, Report, Scenario, ScenarioRunner};

mod output;

use output::OutputFormat;

/// tablecheck - contract harness for table-extraction services
#[derive(Parser)]
#[command(name = "tablecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments for the default `run` command
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenarios against a service
    Run(RunArgs),

    /// Write the image and PDF fixtures to a directory
    Fixtures(FixturesArgs),
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Harness config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Root URL of the service under test
    #[arg(long, env = "TABLECHECK_BASE_URL")]
    base_url: Option<String>,

    /// Credential forwarded as api_key
    #[arg(long, env = "TABLECHECK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Accept any populated table instead of requiring the fixture's headers and row count
    #[arg(long)]
    lenient: bool,

    /// Run only these scenarios, in the order given
    #[arg(long, value_name = "SCENARIO")]
    only: Vec<Scenario>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Directory to write the JSON results file into
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FixturesArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Directory the fixtures are written to
    #[arg(long, default_value = "fixtures")]
    out_dir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let result = match cli.command {
        Some(Commands::Run(args)) => run(args),
        Some(Commands::Fixtures(args)) => fixtures(args),
        None => run(cli.run),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Defaults, then the config file, then environment and flags
fn load_config(config: &ConfigArgs) -> Result<HarnessConfig> {
    match &config.config {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(HarnessConfig::default()),
    }
}

fn resolve_config(args: &RunArgs) -> Result<HarnessConfig> {
    let mut config = load_config(&args.config)?;

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(api_key) = &args.api_key {
        config.credential = Some(api_key.clone());
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    if args.lenient {
        config.check_fidelity = false;
    }

    config.validate().context("invalid harness configuration")?;
    Ok(config)
}

fn run(args: RunArgs) -> Result<ExitCode> {
    let config = resolve_config(&args)?;
    debug!("Resolved config: {:?}", config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let mut runner = ScenarioRunner::new(config).context("failed to build scenario runner")?;

    let report = runtime.block_on(async {
        if args.only.is_empty() {
            runner.run_all_scenarios().await
        } else {
            for scenario in &args.only {
                runner.run_scenario(*scenario).await;
            }
            runner.report()
        }
    });

    output::print_report(&report, args.format);

    if let Some(dir) = &args.output {
        write_results(&report, dir)?;
    }

    Ok(if report.verdict() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn write_results(report: &Report, dir: &Path) -> Result<()> {
    let path = report
        .write_json(dir)
        .with_context(|| format!("failed to write results to {}", dir.display()))?;
    output::print_info(&format!("Results written to {}", path.display()));
    Ok(())
}

fn fixtures(args: FixturesArgs) -> Result<ExitCode> {
    let config = load_config(&args.config)?;
    let generator = FixtureGenerator::from_config(&config);

    let artifacts = [
        generator.make_image_fixture()?.renamed("test_table.jpg"),
        generator.make_pdf_fixture()?.renamed("test_table.pdf"),
    ];

    for artifact in &artifacts {
        let path = artifact
            .persist(&args.out_dir)
            .with_context(|| format!("failed to write {}", artifact.upload_name()))?;
        let digest = artifact.sha256()?;
        info!("{} fixture sha256={}", artifact.format(), digest);
        output::print_success(&format!("{} ({})", path.display(), &digest[..12]));
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "tablecheck",
            "run",
            "--base-url",
            "http://extractor.local:9000",
            "--api-key",
            "secret",
            "--timeout-secs",
            "5",
            "--lenient",
        ])
        .unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.base_url, "http://extractor.local:9000");
        assert_eq!(config.credential.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.check_fidelity);
    }

    #[test]
    fn test_bare_invocation_runs_with_top_level_flags() {
        let cli = Cli::try_parse_from(["tablecheck", "--only", "health", "--only", "export"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.only, [Scenario::Health, Scenario::Export]);
        assert_eq!(cli.run.format, OutputFormat::Table);
    }

    #[test]
    fn test_unknown_scenario_is_rejected() {
        assert!(Cli::try_parse_from(["tablecheck", "run", "--only", "nope"]).is_err());
    }

    #[test]
    fn test_invalid_base_url_is_a_config_error() {
        let args = RunArgs {
            base_url: Some("ftp://example.com".to_string()),
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(resolve_config(&args).is_err());
    }
}
