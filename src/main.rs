use analyze_survey_stats::common::Report;
use analyze_survey_stats::config::AnalysisConfig;
use analyze_survey_stats::{run, AnalysisError};
use argh::FromArgs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Statistical analysis of paired-condition survey responses
#[derive(FromArgs, Debug)]
pub struct Args {
    /// survey spreadsheet to analyze (default: data/sumdata.xlsx)
    #[argh(option, short = 'i', default = "PathBuf::from(\"data/sumdata.xlsx\")")]
    input: PathBuf,

    /// directory receiving the figures and report.txt (default: plot)
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// JSON configuration file overriding the built-in survey settings
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// longest accepted response time in minutes (default: 15)
    #[argh(option, short = 'm')]
    max_minutes: Option<u32>,

    /// log debug diagnostics
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Analysis failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: &Args) -> Result<(), AnalysisError> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    if let Some(max_minutes) = args.max_minutes {
        config.max_response_minutes = max_minutes;
    }

    info!(
        input = %args.input.display(),
        output = %config.output_dir.display(),
        max_minutes = config.max_response_minutes,
        "Starting survey analysis"
    );

    let mut report = Report::new(io::stdout().lock());
    run(&config, &args.input, &mut report)?;
    Ok(())
}
