//! CLI entry point for the FIPE mean-price report tool.
//!
//! Provides subcommands for running the aggregation on a local CSV file and
//! for processing an S3 object-created notification end to end.

use anyhow::Result;
use clap::{Parser, Subcommand};
use fipe_price_report::{
    aggregate::aggregate_file,
    event::{handle_notification, output_prefix_from_env},
    output::write_report,
};
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fipe_price_report")]
#[command(about = "Computes mean FIPE vehicle prices by model year and brand", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a local CSV file and write the JSON report
    Run {
        /// Path to the input CSV file
        #[arg(short, long, default_value = "tabela-fipe-historico-precos.csv")]
        input: String,

        /// Path to write the JSON report to
        #[arg(short, long, default_value = "preco_medio_por_ano_marca.json")]
        output: String,
    },
    /// Process an S3 object-created notification: download, aggregate, upload
    ProcessEvent {
        /// Path to a file containing the notification JSON (stdin if omitted)
        #[arg(short, long)]
        event_file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/fipe_price_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fipe_price_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input, output } => {
            info!(input = %input, "Aggregating local CSV");

            let report = aggregate_file(&input)?;
            write_report(&output, &report)?;

            info!(output = %output, "Report written");
            println!("{}", output);
        }
        Commands::ProcessEvent { event_file } => {
            let raw_event = read_event(event_file.as_deref())?;

            let config = aws_config::load_from_env().await;
            let client = aws_sdk_s3::Client::new(&config);
            let output_prefix = output_prefix_from_env();

            let response = handle_notification(&client, &raw_event, &output_prefix).await?;

            if response.status_code >= 400 {
                error!(
                    status = response.status_code,
                    body = %response.body,
                    "Notification rejected"
                );
            } else {
                info!(
                    status = response.status_code,
                    body = %response.body,
                    "Notification processed"
                );
            }
        }
    }

    Ok(())
}

/// Reads the notification payload from a file, or from stdin when no path
/// was given.
fn read_event(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}
