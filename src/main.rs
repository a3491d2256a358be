use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use docs_check::cli::{Cli, VerbosityLevel};
use docs_check::config::{Config, ConfigManager};
use docs_check::error::CheckError;
use docs_check::error_reporter::ErrorReporter;
use docs_check::links::link_issue_from_code;
use docs_check::output::{Output, ReportOptions, format_duration};
use docs_check::runner::CheckRunner;

const EXIT_FATAL: u8 = 2;

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("docs_check={}", verbosity.log_filter())));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn verbosity_of(config: &Config) -> VerbosityLevel {
    if config.output.quiet {
        VerbosityLevel::Quiet
    } else if config.output.verbose {
        VerbosityLevel::Verbose
    } else {
        VerbosityLevel::Normal
    }
}

async fn run(cli: &Cli, config: Config) -> anyhow::Result<u8> {
    let verbosity = verbosity_of(&config);
    let options = ReportOptions {
        max_link_issues: config.output.max_link_issues,
        max_image_issues: config.output.max_image_issues,
        issue_filter: config
            .output
            .issue_filter
            .as_deref()
            .and_then(link_issue_from_code),
    };
    let output = Output::new(verbosity, config.corpus.hub_prefix.clone());

    let runner = CheckRunner::new(cli.path.clone(), config);
    let outcome = runner
        .run()
        .await
        .with_context(|| format!("checking {}", cli.path.display()))?;

    print!("{}", output.format_report(&outcome.summary, &options));
    if verbosity >= VerbosityLevel::Verbose {
        println!(
            "Checked {} hubs in {}",
            outcome.hubs.len(),
            format_duration(outcome.duration)
        );
    }

    Ok(outcome.summary.exit_code() as u8)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbosity());
    let reporter = ErrorReporter::new(cli.verbosity());

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        return ExitCode::from(EXIT_FATAL);
    }

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(error) => {
            reporter.report_config_error(&error);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match run(&cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            match error.downcast_ref::<CheckError>() {
                Some(check_error) => reporter.report_check_error(check_error),
                None => eprintln!("Error: {:#}", error),
            }
            ExitCode::from(EXIT_FATAL)
        }
    }
}
