use clap::{Parser, Subcommand};
use guarded_fetch_domain::{
    is_private_or_reserved, CliOverrides, FetchError,
};
use guarded_fetch_jobs::{CacheSweepJob, JobRunner};
use mimalloc::MiMalloc;
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "guarded-fetch")]
#[command(version)]
#[command(about = "Guarded Fetch - SSRF-safe fetching and validation of untrusted URLs")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", env = "GUARDED_FETCH_CONFIG")]
    config: Option<String>,

    /// Only allow https URLs, including redirect targets
    #[arg(long, env = "GUARDED_FETCH_HTTPS_ONLY")]
    https_only: Option<bool>,

    /// Maximum redirect hops to follow
    #[arg(long, env = "GUARDED_FETCH_MAX_REDIRECTS")]
    max_redirects: Option<u32>,

    /// Maximum distinct fetches in flight
    #[arg(long, env = "GUARDED_FETCH_INFLIGHT_MAX_ENTRIES")]
    inflight_max_entries: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GUARDED_FETCH_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and validate an image
    Image {
        url: String,

        /// Accept sanitized SVG images
        #[arg(long)]
        allow_svg: bool,
    },
    /// Fetch a document and report what came back
    Fetch { url: String },
    /// Classify an IP literal
    CheckIp { address: String },
}

#[derive(Serialize)]
struct ImageReport<'a> {
    url: &'a str,
    format: &'static str,
    mime_type: &'static str,
    width: Option<u32>,
    height: Option<u32>,
    bytes: usize,
    warnings: &'a [String],
}

#[derive(Serialize)]
struct DocumentReport<'a> {
    url: &'a str,
    final_url: &'a str,
    content_type: Option<&'a str>,
    bytes: usize,
}

#[derive(Serialize)]
struct IpReport<'a> {
    address: &'a str,
    private_or_reserved: bool,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    url: &'a str,
    error: String,
    security_violation: bool,
    retryable: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Command::CheckIp { address } = &cli.command {
        let report = IpReport {
            address,
            private_or_reserved: is_private_or_reserved(address),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    let allow_svg = matches!(cli.command, Command::Image { allow_svg: true, .. });
    let cli_overrides = CliOverrides {
        https_only: cli.https_only,
        allow_markup_format: allow_svg.then_some(true),
        max_redirects: cli.max_redirects,
        inflight_max_entries: cli.inflight_max_entries,
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting Guarded Fetch v{}", env!("CARGO_PKG_VERSION"));
    bootstrap::log_config_summary(&config, cli.config.as_deref());

    let services = di::FetchServices::new(&config)?;
    let use_cases = di::UseCases::new(&config, &services);

    let shutdown = CancellationToken::new();
    JobRunner::new()
        .with_cache_sweep(
            CacheSweepJob::new(use_cases.sweepable_caches())
                .with_interval(Duration::from_secs(config.cache.sweep_interval_secs)),
        )
        .with_shutdown_token(shutdown.clone())
        .start()
        .await;

    let outcome = match &cli.command {
        Command::Image { url, .. } => run_image(&use_cases, url).await,
        Command::Fetch { url } => run_fetch(&use_cases, url).await,
        Command::CheckIp { .. } => Ok(()),
    };

    shutdown.cancel();

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err((url, e)) => {
            error!(url = %url, error = %e, "Fetch failed");
            let report = ErrorReport {
                url: &url,
                error: e.to_string(),
                security_violation: e.is_security_violation(),
                retryable: e.is_retryable(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_image(use_cases: &di::UseCases, url: &str) -> Result<(), (String, FetchError)> {
    let image = use_cases
        .fetch_image
        .execute(url)
        .await
        .map_err(|e| (url.to_string(), e))?;

    let report = ImageReport {
        url,
        format: image.format.as_str(),
        mime_type: image.format.mime_type(),
        width: image.width,
        height: image.height,
        bytes: image.bytes.len(),
        warnings: &image.warnings,
    };
    print_json(&report, url)
}

async fn run_fetch(use_cases: &di::UseCases, url: &str) -> Result<(), (String, FetchError)> {
    let resource = use_cases
        .fetch_document
        .execute(url)
        .await
        .map_err(|e| (url.to_string(), e))?;

    let report = DocumentReport {
        url,
        final_url: &resource.final_url,
        content_type: resource.content_type.as_deref(),
        bytes: resource.body.len(),
    };
    print_json(&report, url)
}

fn print_json<T: Serialize>(report: &T, url: &str) -> Result<(), (String, FetchError)> {
    let rendered = serde_json::to_string_pretty(report)
        .map_err(|e| (url.to_string(), FetchError::Internal(e.to_string())))?;
    println!("{}", rendered);
    Ok(())
}
