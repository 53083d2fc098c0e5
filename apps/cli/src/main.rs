//! ig-tx-check entry point

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use txcheck_cli::{logging, resolve_packages, Config, Pipeline};
use txcheck_package::PackageCache;
use txcheck_report::ReportWriter;
use txcheck_terminology::TerminologyClient;

#[derive(Parser, Debug)]
#[command(name = "ig-tx-check", version)]
#[command(about = "Check FHIR IG terminology bindings and example codings against a terminology server")]
struct Args {
    /// Root data folder; reports are written to <rootdir>/reports
    #[arg(short, long)]
    rootdir: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, default_value = "config/config.json")]
    config: PathBuf,

    /// Skip the terminology server capability check
    #[arg(long)]
    skip_capability_check: bool,

    /// Log level when RUST_LOG is not set (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let config = Config::load_with_log_level(&args.config, args.log_level.as_deref())
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _log_guard = logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    let started = chrono::Local::now();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        started = %started.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
        "Run started"
    );

    let rootdir = match args.rootdir {
        Some(dir) => dir,
        None => dirs::home_dir()
            .context("Cannot determine home directory; pass --rootdir")?
            .join("data")
            .join("ig-tx-check"),
    };
    let writer = ReportWriter::new(rootdir.join("reports")).context("Failed to create report folder")?;

    let client = TerminologyClient::new(config.terminology_settings())
        .context("Failed to create terminology client")?;

    if args.skip_capability_check {
        tracing::warn!(endpoint = %config.endpoint, "Capability check skipped");
    } else {
        let status = client.capability_check().await;
        if !status.is_ok() {
            tracing::error!(
                endpoint = %config.endpoint,
                status = status.code(),
                "Capability test failed"
            );
            return Ok(ExitCode::FAILURE);
        }
        tracing::info!("Passed capability test, continuing with checks");
    }

    let cache = config
        .package_cache_dir()
        .filter(|dir| dir.is_dir())
        .map(PackageCache::new);
    let packages = resolve_packages(&config, cache.as_ref());
    if packages.is_empty() {
        tracing::warn!("No packages to check");
    }

    let pipeline = Pipeline::new(&config, &client, writer);
    let summary = pipeline.run(&packages).await?;

    let finished = chrono::Local::now();
    tracing::info!(
        finished = %finished.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
        elapsed_seconds = (finished - started).num_seconds(),
        reports = summary.reports.len(),
        membership_rows = summary.membership_rows,
        code_system_failures = summary.code_system_failures,
        "Run finished"
    );
    Ok(ExitCode::SUCCESS)
}
