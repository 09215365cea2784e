use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{AgeFormat, AggregatedRow, FailurePolicy, NamespaceScan, PodRecord, ScanReport};

pub trait NamespaceSource {
    async fn list_namespaces(&self) -> Result<Vec<String>>;
}

pub trait PodSource {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>>;
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unable to list namespaces")]
    Resolution(#[source] anyhow::Error),
    #[error("unable to list pods in namespace {namespace}")]
    Listing {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ScanError {
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::Resolution(_) => None,
            Self::Listing { namespace, .. } => Some(namespace),
        }
    }

    pub fn chain(&self) -> String {
        anyhow::Chain::new(self)
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>()
            .join(": ")
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub failure_policy: FailurePolicy,
    pub concurrency: usize,
    pub reason_separator: String,
    pub age_format: AgeFormat,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            concurrency: 1,
            reason_separator: String::new(),
            age_format: AgeFormat::Precise,
        }
    }
}

pub async fn aggregate<S>(
    requested: &[String],
    source: &S,
    options: &ScanOptions,
) -> Result<ScanReport, ScanError>
where
    S: NamespaceSource + PodSource,
{
    let namespaces = resolve_namespaces(requested, source).await?;
    let scanned_at = Utc::now();
    let mut report = ScanReport::new(scanned_at);

    let mut outcomes = stream::iter(namespaces.iter())
        .map(|namespace| aggregate_namespace(source, namespace, scanned_at, options))
        .buffered(options.concurrency.max(1));

    while let Some(outcome) = outcomes.next().await {
        match outcome {
            Ok(scan) => {
                debug!(
                    namespace = %scan.namespace,
                    pods = scan.rows.len(),
                    "namespace scanned"
                );
                report.absorb(scan);
            }
            Err(error) => match options.failure_policy {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::Continue => {
                    warn!(
                        namespace = error.namespace().unwrap_or("-"),
                        error = %error.chain(),
                        "skipping namespace"
                    );
                    report.failures.push(error);
                }
            },
        }
    }

    if report.missing_statuses > 0 {
        warn!(
            containers = report.missing_statuses,
            "containers without a reported status were counted as not ready"
        );
    }
    info!(
        namespaces = namespaces.len(),
        pods = report.rows.len(),
        failed = report.failures.len(),
        "scan finished"
    );

    Ok(report)
}

pub async fn resolve_namespaces<S>(
    requested: &[String],
    source: &S,
) -> Result<Vec<String>, ScanError>
where
    S: NamespaceSource,
{
    if !requested.is_empty() {
        return Ok(requested.to_vec());
    }

    let namespaces = source
        .list_namespaces()
        .await
        .map_err(ScanError::Resolution)?;
    debug!(count = namespaces.len(), "resolved namespaces from cluster");
    Ok(namespaces)
}

pub async fn aggregate_namespace<S>(
    source: &S,
    namespace: &str,
    scanned_at: DateTime<Utc>,
    options: &ScanOptions,
) -> Result<NamespaceScan, ScanError>
where
    S: PodSource,
{
    let pods = source
        .list_pods(namespace)
        .await
        .map_err(|error| ScanError::Listing {
            namespace: namespace.to_string(),
            source: error,
        })?;

    let mut scan = NamespaceScan {
        namespace: namespace.to_string(),
        ..NamespaceScan::default()
    };
    for pod in &pods {
        let summary = summarize_pod(pod, scanned_at, options);
        scan.missing_statuses += summary.missing_statuses;
        scan.rows.push(summary.row);
    }

    Ok(scan)
}

#[derive(Debug, Clone)]
pub struct PodSummary {
    pub row: AggregatedRow,
    pub missing_statuses: usize,
}

// Reason text of not-ready containers, in declared order, wins over the phase.
pub fn summarize_pod(
    pod: &PodRecord,
    scanned_at: DateTime<Utc>,
    options: &ScanOptions,
) -> PodSummary {
    let mut restarts = 0u32;
    let mut ready = 0usize;
    let mut total = 0usize;
    let mut missing_statuses = 0usize;
    let mut reasons = Vec::<&str>::new();

    for container in &pod.containers {
        total += 1;
        let Some(status) = pod.status_for(container) else {
            missing_statuses += 1;
            warn!(
                namespace = %pod.namespace,
                pod = %pod.name,
                container = %container,
                "no status reported for container"
            );
            continue;
        };

        restarts = restarts.saturating_add(status.restart_count);
        if status.ready {
            ready += 1;
            continue;
        }

        reasons.extend(status.waiting_reason.as_deref());
        reasons.extend(status.terminated_reason.as_deref());
    }

    let reason_text = reasons
        .into_iter()
        .filter(|reason| !reason.is_empty())
        .collect::<Vec<_>>()
        .join(options.reason_separator.as_str());
    let status = if reason_text.is_empty() {
        pod.phase.to_string()
    } else {
        reason_text
    };

    let age_seconds = pod
        .creation_timestamp
        .map(|created| elapsed_seconds(created, scanned_at));
    let age = age_seconds
        .map(|seconds| options.age_format.render(seconds))
        .unwrap_or_else(|| "-".to_string());

    PodSummary {
        row: AggregatedRow {
            namespace: pod.namespace.clone(),
            name: pod.name.clone(),
            ready: format!("{ready}/{total}"),
            status,
            restarts,
            age,
            age_seconds,
        },
        missing_statuses,
    }
}

fn elapsed_seconds(created: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (now - created).num_milliseconds().max(0);
    ((millis + 500) / 1_000) as u64
}
