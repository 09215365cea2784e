use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ContainerStatus as KubeContainerStatus, Namespace, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::path::Path;
use tracing::{debug, info};

use crate::model::{ContainerStatus, PodPhase, PodRecord};
use crate::scan::{NamespaceSource, PodSource};

pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
}

impl KubeGateway {
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<String>) -> Result<Self> {
        let kubeconfig_value = match kubeconfig {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("kubeconfig file {} not found", path.display());
                }
                info!(path = %path.display(), "using kubeconfig file from the path provided");
                Some(
                    Kubeconfig::read_from(path)
                        .with_context(|| format!("failed to read kubeconfig {}", path.display()))?,
                )
            }
            None => {
                let found = Kubeconfig::read().ok();
                if found.is_some() {
                    info!("using kubeconfig from the default location");
                }
                found
            }
        };

        let config = if let Some(kubeconfig_value) = kubeconfig_value.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if context.is_some() {
                anyhow::bail!("kubeconfig not found; --context is unavailable in this environment");
            }
            info!("no kubeconfig found, falling back to in-cluster configuration");
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        let context = context
            .or_else(|| {
                kubeconfig_value
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());
        debug!(%context, %cluster, "kubernetes client ready");

        Ok(Self {
            client,
            context,
            cluster,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }
}

impl NamespaceSource for KubeGateway {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .context("failed to list namespaces")?;

        Ok(list
            .into_iter()
            .map(|namespace| namespace.name_any())
            .collect())
    }
}

impl PodSource for KubeGateway {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list pods in {namespace}"))?;

        Ok(list
            .into_iter()
            .map(|pod| pod_record(&pod, namespace))
            .collect())
    }
}

fn pod_record(pod: &Pod, fallback_namespace: &str) -> PodRecord {
    let containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| container.name.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let status = pod.status.as_ref();
    let phase = status
        .and_then(|status| status.phase.as_deref())
        .map(PodPhase::from_token)
        .unwrap_or_default();
    let container_statuses = status
        .and_then(|status| status.container_statuses.as_ref())
        .into_iter()
        .flatten()
        .map(container_status)
        .collect();

    PodRecord {
        name: pod.name_any(),
        namespace: pod
            .namespace()
            .unwrap_or_else(|| fallback_namespace.to_string()),
        creation_timestamp: pod.metadata.creation_timestamp.as_ref().and_then(to_utc),
        phase,
        containers,
        container_statuses,
    }
}

fn container_status(status: &KubeContainerStatus) -> ContainerStatus {
    let state = status.state.as_ref();
    let waiting_reason = state
        .and_then(|state| state.waiting.as_ref())
        .and_then(|waiting| waiting.reason.clone());
    let terminated_reason = state
        .and_then(|state| state.terminated.as_ref())
        .and_then(|terminated| terminated.reason.clone());

    ContainerStatus {
        name: status.name.clone(),
        ready: status.ready,
        restart_count: status.restart_count.max(0) as u32,
        waiting_reason,
        terminated_reason,
    }
}

fn to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(time.0.subsec_nanosecond()).unwrap_or(0);
    DateTime::<Utc>::from_timestamp(time.0.as_second(), nanos)
}

#[cfg(test)]
mod tests {
    use super::pod_record;
    use crate::model::PodPhase;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::api::core::v1::Pod;
    use serde_json::json;

    fn crashing_pod() -> Pod {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "web-1",
                "namespace": "shop",
                "creationTimestamp": "2024-05-01T12:00:00Z"
            },
            "spec": {
                "containers": [
                    { "name": "app", "image": "shop/web:1.2" },
                    { "name": "proxy", "image": "envoy:1.30" }
                ]
            },
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    {
                        "name": "proxy",
                        "ready": false,
                        "restartCount": 2,
                        "image": "envoy:1.30",
                        "imageID": "",
                        "state": { "waiting": { "reason": "CrashLoopBackOff" } }
                    },
                    {
                        "name": "app",
                        "ready": true,
                        "restartCount": 1,
                        "image": "shop/web:1.2",
                        "imageID": "",
                        "state": { "running": { "startedAt": "2024-05-01T12:00:05Z" } }
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn pod_converts_into_record() {
        let record = pod_record(&crashing_pod(), "ignored");

        assert_eq!(record.name, "web-1");
        assert_eq!(record.namespace, "shop");
        assert_eq!(record.phase, PodPhase::Running);
        assert_eq!(record.containers, vec!["app".to_string(), "proxy".to_string()]);
        assert_eq!(
            record.creation_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
        );

        let proxy = record.status_for("proxy").unwrap();
        assert!(!proxy.ready);
        assert_eq!(proxy.restart_count, 2);
        assert_eq!(proxy.waiting_reason.as_deref(), Some("CrashLoopBackOff"));
        assert_eq!(proxy.terminated_reason, None);

        let app = record.status_for("app").unwrap();
        assert!(app.ready);
        assert_eq!(app.waiting_reason, None);
    }

    #[test]
    fn terminated_reason_is_extracted() {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": { "name": "batch" },
            "spec": { "containers": [{ "name": "main" }] },
            "status": {
                "phase": "Failed",
                "containerStatuses": [{
                    "name": "main",
                    "ready": false,
                    "restartCount": 0,
                    "image": "batch:1",
                    "imageID": "",
                    "state": { "terminated": { "exitCode": 137, "reason": "OOMKilled" } }
                }]
            }
        }))
        .unwrap();

        let record = pod_record(&pod, "jobs");
        assert_eq!(record.namespace, "jobs");
        assert_eq!(record.phase, PodPhase::Failed);
        assert_eq!(record.creation_timestamp, None);
        assert_eq!(
            record.status_for("main").unwrap().terminated_reason.as_deref(),
            Some("OOMKilled")
        );
    }

    #[test]
    fn pod_without_status_has_unknown_phase_and_no_statuses() {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": { "name": "scheduling", "namespace": "default" },
            "spec": { "containers": [{ "name": "app" }] }
        }))
        .unwrap();

        let record = pod_record(&pod, "default");
        assert_eq!(record.phase, PodPhase::Unknown);
        assert_eq!(record.containers.len(), 1);
        assert!(record.container_statuses.is_empty());
    }
}
