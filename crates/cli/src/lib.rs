pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use solquote_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "solquote",
    about = "Solar offer generation CLI",
    long_about = "Generate solar PV offers for several installer companies, package them, and manage the product catalog.",
    after_help = "Examples:\n  solquote seed\n  solquote generate --job job.json --charts-dir charts/\n  solquote config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo product catalog and installer companies")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "List products by category, companies and company documents")]
    Catalog,
    #[command(about = "Generate one offer PDF per company and package them into a ZIP archive")]
    Generate {
        #[arg(long, help = "Job file (JSON) with customer, project and offer settings")]
        job: PathBuf,
        #[arg(long, help = "Archive path; defaults to <output_dir>/Angebote_<run>.zip")]
        output: Option<PathBuf>,
        #[arg(long, help = "Directory of chart images keyed by file name")]
        charts_dir: Option<PathBuf>,
    },
}

/// Logs go to stderr so that stdout only carries the command payload.
/// `RUST_LOG` wins over the configured level.
fn init_logging() {
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Catalog => commands::catalog::run(),
        Command::Generate { job, output, charts_dir } => {
            commands::generate::run(commands::generate::GenerateArgs { job, output, charts_dir })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
