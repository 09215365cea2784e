use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::{AgeFormat, FailurePolicy};
use crate::output::OutputFormat;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "clusterlens",
    version,
    about = "Kubernetes cluster scanner: a quick summary of pod health."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scan your Kubernetes cluster to see its current status
    Scan(ScanArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Kubeconfig file location
    #[arg(short, long)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long)]
    pub context: Option<String>,

    /// Namespaces to scan (all namespaces when omitted)
    #[arg(short, long, value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// Duplicate log output to a file
    #[arg(short, long)]
    pub logger: bool,

    /// Log file used with --logger
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// How pod ages are rendered
    #[arg(long, value_enum)]
    pub age_format: Option<AgeFormat>,

    /// What to do when a namespace's pods cannot be listed
    #[arg(long, value_enum, conflicts_with = "continue_on_error")]
    pub failure_policy: Option<FailurePolicy>,

    /// Shorthand for --failure-policy continue
    #[arg(long)]
    pub continue_on_error: bool,

    /// Number of namespaces scanned at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Text placed between reasons of several not-ready containers
    #[arg(long)]
    pub reason_separator: Option<String>,
}
