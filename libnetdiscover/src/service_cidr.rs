// service_cidr.rs: plugin-independent detection of the service (ClusterIP) range
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use tracing::debug;

use crate::reader::{ClusterObjectReader, Fetched};
use crate::NAMESPACE_SYSTEM;

pub const APISERVER_LABEL_SELECTOR: &str = "component=kube-apiserver";
pub const SERVICE_CIDR_PARAMETER: &str = "--service-cluster-ip-range";

#[async_trait]
pub trait ServiceCidrResolver: Send + Sync {
    /// Returns the service CIDR, or an empty string when it cannot be told.
    async fn find_cluster_ip_range(&self, reader: &dyn ClusterObjectReader)
        -> anyhow::Result<String>;
}

/// Reads `--service-cluster-ip-range` from the kube-apiserver static pods.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiserverServiceCidr;

#[async_trait]
impl ServiceCidrResolver for ApiserverServiceCidr {
    async fn find_cluster_ip_range(
        &self,
        reader: &dyn ClusterObjectReader,
    ) -> anyhow::Result<String> {
        find_pod_command_parameter(
            reader,
            APISERVER_LABEL_SELECTOR,
            SERVICE_CIDR_PARAMETER,
        )
        .await
    }
}

/// Looks up `parameter=value` in the command line of the system pods
/// selected by `label_selector` and returns the value, or "" if absent.
pub async fn find_pod_command_parameter(
    reader: &dyn ClusterObjectReader,
    label_selector: &str,
    parameter: &str,
) -> anyhow::Result<String> {
    let pods = match reader.list_pods(NAMESPACE_SYSTEM, label_selector).await {
        Fetched::Found(pods) => pods,
        Fetched::NotFound => return Ok("".to_string()),
        Fetched::Fault(err) => {
            return Err(err.context(format!("error listing the pods with {}", label_selector)))
        }
    };

    let found = pods.iter().find_map(|pod| find_in_pod(pod, parameter));
    if found.is_none() {
        debug!(
            "{} not set on any of the {} pods matching {}",
            parameter,
            pods.len(),
            label_selector
        );
    }
    Ok(found.unwrap_or_default())
}

fn find_in_pod(pod: &Pod, parameter: &str) -> Option<String> {
    let prefix = format!("{}=", parameter);
    let containers = pod.spec.as_ref().map(|s| s.containers.as_slice())?;

    containers.iter().find_map(|container| {
        let command = container.command.iter().flatten().find_map(|arg| {
            // "/bin/sh -c 'exec kube-apiserver --a=b ...'" carries all flags in one entry
            arg.split(' ').find_map(|word| word.strip_prefix(prefix.as_str()))
        });
        command
            .or_else(|| {
                container
                    .args
                    .iter()
                    .flatten()
                    .find_map(|arg| arg.strip_prefix(prefix.as_str()))
            })
            .map(|v| v.to_string())
    })
}
