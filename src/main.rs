mod cli;
mod config;
mod k8s;
mod model;
mod output;
mod scan;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, ScanArgs};
use config::{FileConfig, ScanSettings};
use k8s::KubeGateway;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scan(args) => run_scan(args).await,
    }
}

async fn run_scan(args: ScanArgs) -> Result<()> {
    let (config_path, file_config) = FileConfig::discover()?;
    let settings = ScanSettings::resolve(&args, file_config);
    init_tracing(&args.log_filter, settings.log_file.as_deref())?;

    if let Some(path) = config_path {
        info!(path = %path.display(), "loaded config file");
    }

    let gateway = KubeGateway::connect(settings.kubeconfig.as_deref(), settings.context.clone())
        .await
        .context("failed to connect to the cluster")?;
    info!(
        context = gateway.context(),
        cluster = gateway.cluster(),
        "scanning cluster"
    );

    let report = scan::aggregate(&settings.namespaces, &gateway, &settings.options)
        .await
        .context("failed to get the status for your cluster")?;

    info!(scanned_at = %report.scanned_at, pods = report.rows.len(), "rendering report");
    let rendered = output::render_rows(&report.rows, settings.output)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").context("failed to write scan output")?;

    if report.is_partial() {
        eprintln!(
            "{} namespace(s) could not be scanned:\n{}",
            report.failures.len(),
            output::render_failures(&report.failures)
        );
        anyhow::bail!("scan finished with {} failed namespace(s)", report.failures.len());
    }

    Ok(())
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let (file, file_error) = match log_file.map(File::create) {
        Some(Ok(file)) => (Some(Arc::new(file)), None),
        Some(Err(error)) => (None, Some(error)),
        None => (None, None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    let _ = match file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(io::stderr.and(file))
            .try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };

    if let Some(error) = file_error {
        warn!(%error, "cannot create log file, logging to stderr only");
    }

    Ok(())
}
