//! survey-stats CLI
//!
//! Loads a survey export, runs the configured analyses and writes the
//! report files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use survey_stats::cleaning::clean_survey;
use survey_stats::config::validation::validate_config;
use survey_stats::io::load_survey;
use survey_stats::{AnalysisConfig, ReportRunner, Result};

/// Customer-satisfaction survey analysis
#[derive(Parser)]
#[command(name = "survey-stats")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Survey file (.csv or .xlsx)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Configuration file (.toml, .yaml or .yml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory, overrides the configuration
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Significance level, overrides the configuration
    #[arg(short, long)]
    alpha: Option<f64>,
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::load_with_precedence(cli.config.as_ref())?;
    if let Some(output) = &cli.output {
        config.output.dir = output.clone();
    }
    if let Some(alpha) = cli.alpha {
        config.analysis.alpha = alpha;
    }
    validate_config(&config)?;
    Ok(config)
}

fn run(cli: &Cli, config: AnalysisConfig) -> Result<()> {
    let raw = load_survey(&cli.input, &config.input)?;
    log::info!(
        "Loaded {} rows and {} columns from {}",
        raw.row_count(),
        raw.column_count(),
        cli.input.display()
    );
    let survey = clean_survey(raw, &config.input)?;

    let mut runner = ReportRunner::new(config);
    let plan = runner.default_plan();
    let summary = runner.run(&survey, &plan);

    print!("{}", summary);
    println!("Results written to {}", runner.config().output.dir.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
