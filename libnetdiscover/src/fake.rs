// fake.rs: in-memory cluster used by the unit tests
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, Pod, PodSpec, PodTemplateSpec, Volume,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::reader::{ClusterObjectReader, Fetched};
use crate::service_cidr::ServiceCidrResolver;
use crate::NAMESPACE_SYSTEM;

pub const FLANNEL_NET_CONF: &str = r#"{
    "Network": "10.0.0.0/8",
    "SubnetLen": 20,
    "SubnetMin": "10.10.0.0",
    "SubnetMax": "10.99.0.0",
    "Backend": {
        "Type": "udp",
        "Port": 7890
    }
}"#;

/// Failure injected in place of a real answer.
#[derive(Clone, Debug)]
pub enum Failure {
    NotFound,
    Fault(&'static str),
}

impl Failure {
    fn into_fetched<T>(self) -> Fetched<T> {
        match self {
            Failure::NotFound => Fetched::NotFound,
            Failure::Fault(msg) => Fetched::Fault(anyhow::anyhow!(msg)),
        }
    }
}

#[derive(Default)]
pub struct FakeReader {
    pub daemon_sets: Vec<DaemonSet>,
    pub config_maps: Vec<ConfigMap>,
    pub pods: Vec<Pod>,
    pub daemon_sets_failure: Option<Failure>,
    pub config_maps_failure: Option<Failure>,
    pub pods_failure: Option<Failure>,
}

fn in_namespace(metadata: &ObjectMeta, namespace: &str) -> bool {
    metadata.namespace.as_deref() == Some(namespace)
}

fn has_labels(metadata: &ObjectMeta, label_selector: &str) -> bool {
    label_selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| {
            let (key, value) = term.split_once('=').unwrap_or((term, ""));
            metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(key))
                .map_or(false, |v| v == value)
        })
}

#[async_trait]
impl ClusterObjectReader for FakeReader {
    async fn list_daemon_sets(&self, namespace: &str) -> Fetched<Vec<DaemonSet>> {
        if let Some(failure) = &self.daemon_sets_failure {
            return failure.clone().into_fetched();
        }
        Fetched::Found(
            self.daemon_sets
                .iter()
                .filter(|ds| in_namespace(&ds.metadata, namespace))
                .cloned()
                .collect(),
        )
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Fetched<ConfigMap> {
        if let Some(failure) = &self.config_maps_failure {
            return failure.clone().into_fetched();
        }
        match self.config_maps.iter().find(|cm| {
            in_namespace(&cm.metadata, namespace) && cm.metadata.name.as_deref() == Some(name)
        }) {
            Some(cm) => Fetched::Found(cm.clone()),
            None => Fetched::NotFound,
        }
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Fetched<Vec<Pod>> {
        if let Some(failure) = &self.pods_failure {
            return failure.clone().into_fetched();
        }
        Fetched::Found(
            self.pods
                .iter()
                .filter(|pod| {
                    in_namespace(&pod.metadata, namespace)
                        && has_labels(&pod.metadata, label_selector)
                })
                .cloned()
                .collect(),
        )
    }
}

/// Resolver returning a canned answer and counting how often it was asked.
pub struct StaticServiceCidr {
    pub cidr: Result<&'static str, &'static str>,
    pub calls: AtomicUsize,
}

impl StaticServiceCidr {
    pub fn new(cidr: &'static str) -> StaticServiceCidr {
        StaticServiceCidr {
            cidr: Ok(cidr),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(msg: &'static str) -> StaticServiceCidr {
        StaticServiceCidr {
            cidr: Err(msg),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceCidrResolver for StaticServiceCidr {
    async fn find_cluster_ip_range(
        &self,
        _reader: &dyn ClusterObjectReader,
    ) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.cidr {
            Ok(cidr) => Ok(cidr.to_string()),
            Err(msg) => Err(anyhow::anyhow!(msg)),
        }
    }
}

pub fn system_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE_SYSTEM.to_string()),
        ..ObjectMeta::default()
    }
}

pub fn config_map_volume(name: &str, config_map: &str) -> Volume {
    Volume {
        name: name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: Some(config_map.to_string()),
            ..ConfigMapVolumeSource::default()
        }),
        ..Volume::default()
    }
}

pub fn daemon_set(name: &str, volumes: Vec<Volume>) -> DaemonSet {
    DaemonSet {
        metadata: system_meta(name),
        spec: Some(DaemonSetSpec {
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    volumes: Some(volumes),
                    ..PodSpec::default()
                }),
            },
            ..DaemonSetSpec::default()
        }),
        ..DaemonSet::default()
    }
}

pub fn config_map(name: &str, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: system_meta(name),
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<String, String>>(),
        ),
        ..ConfigMap::default()
    }
}

pub fn apiserver_pod(name: &str, command: &[&str], args: &[&str]) -> Pod {
    let mut metadata = system_meta(name);
    metadata.labels = Some(BTreeMap::from([(
        "component".to_string(),
        "kube-apiserver".to_string(),
    )]));
    Pod {
        metadata,
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "kube-apiserver".to_string(),
                command: Some(command.iter().map(|s| s.to_string()).collect()),
                args: Some(args.iter().map(|s| s.to_string()).collect()),
                ..Container::default()
            }],
            ..PodSpec::default()
        }),
        ..Pod::default()
    }
}

/// kube-flannel-ds + kube-flannel-cfg as shipped by the upstream manifest
pub fn flannel_cluster() -> FakeReader {
    FakeReader {
        daemon_sets: vec![daemon_set(
            "kube-flannel-ds",
            vec![config_map_volume("flannel-cfg", "kube-flannel-cfg")],
        )],
        config_maps: vec![config_map(
            "kube-flannel-cfg",
            &[("net-conf.json", FLANNEL_NET_CONF)],
        )],
        ..FakeReader::default()
    }
}
