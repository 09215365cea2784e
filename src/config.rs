use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::cli::ScanArgs;
use crate::model::{AgeFormat, FailurePolicy};
use crate::output::OutputFormat;
use crate::scan::ScanOptions;

const DEFAULT_LOG_FILE: &str = "clusterlens.log";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileConfig {
    namespaces: Vec<String>,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    output: Option<OutputFormat>,
    age_format: Option<AgeFormat>,
    failure_policy: Option<FailurePolicy>,
    concurrency: Option<usize>,
    reason_separator: Option<String>,
    log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn discover() -> Result<(Option<PathBuf>, Self)> {
        let Some(path) = discover_config_path() else {
            return Ok((None, Self::default()));
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let parsed = Self::parse(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok((Some(path), parsed))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub namespaces: Vec<String>,
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub output: OutputFormat,
    pub log_file: Option<PathBuf>,
    pub options: ScanOptions,
}

impl ScanSettings {
    pub fn resolve(args: &ScanArgs, file: FileConfig) -> Self {
        let namespaces = args
            .namespaces
            .iter()
            .map(|namespace| namespace.trim())
            .filter(|namespace| !namespace.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        let namespaces = if namespaces.is_empty() {
            file.namespaces
        } else {
            namespaces
        };

        let failure_policy = if args.continue_on_error {
            FailurePolicy::Continue
        } else {
            args.failure_policy
                .or(file.failure_policy)
                .unwrap_or_default()
        };

        let log_file = args.logger.then(|| {
            args.log_file
                .clone()
                .or(file.log_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
        });

        Self {
            namespaces,
            kubeconfig: args.kubeconfig.clone().or(file.kubeconfig),
            context: args.context.clone().or(file.context),
            output: args.output.or(file.output).unwrap_or_default(),
            log_file,
            options: ScanOptions {
                failure_policy,
                concurrency: args.concurrency.or(file.concurrency).unwrap_or(1).max(1),
                reason_separator: args
                    .reason_separator
                    .clone()
                    .or(file.reason_separator)
                    .unwrap_or_default(),
                age_format: args.age_format.or(file.age_format).unwrap_or_default(),
            },
        }
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLUSTERLENS_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("clusterlens.yaml"),
        PathBuf::from("clusterlens.yml"),
        PathBuf::from(".clusterlens.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/clusterlens/config.yaml"),
            PathBuf::from(&home).join(".clusterlens.yaml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}
