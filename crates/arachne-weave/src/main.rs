//! Command-line entry point for the weaver.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use arachne_weave::{WeaveConfig, WeaveResult, Weaver, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(
    name = "arachne-weave",
    version,
    about = "Rewrites intercepted methods into dispatch stubs"
)]
struct Cli {
    /// Configuration file with a `[weave]` table.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Source root to scan, overriding the configuration.
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Output root for generated files, overriding the configuration.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print the full report as JSON instead of a summary line.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "arachne_weave=debug,info",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> WeaveResult<WeaveConfig> {
    let mut config = match &cli.config {
        Some(path) => WeaveConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            WeaveConfig::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => WeaveConfig::default(),
    };
    if let Some(source) = &cli.source {
        config = config.with_source_root(source);
    }
    if let Some(output) = &cli.output {
        config = config.with_output_root(output);
    }
    Ok(config)
}

fn run(cli: &Cli) -> WeaveResult<bool> {
    let config = load_config(cli)?;
    let report = Weaver::new(config)?.run()?;

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                tracing::error!(error = %error, "failed to serialize report");
                println!("{}", report.summary());
            }
        }
    } else {
        println!("{}", report.summary());
    }
    Ok(report.has_failures())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
