// flannel.rs: pod/service CIDR discovery for clusters running flannel
//
// flannel has no API of its own, so the network is read back from the
// objects its manifest creates: the DaemonSet, the ConfigMap it mounts and
// the net-conf.json entry inside that ConfigMap.
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{ConfigMap, Volume};
use tracing::debug;

use crate::discover::{DiscoveryContext, PluginDiscoverer};
use crate::error::DiscoveryError;
use crate::matcher::{Contains, NameMatcher, TieBreak};
use crate::reader::{ClusterObjectReader, Fetched};
use crate::service_cidr::ServiceCidrResolver;
use crate::types::ClusterNetwork;
use crate::NAMESPACE_SYSTEM;

pub const NETWORK_PLUGIN_FLANNEL: &str = "flannel";
pub const FLANNEL_NET_CONF_KEY: &str = "net-conf.json";

pub const FLANNEL_NETWORK_CONF_PROPERTY: &str = "Network";

/// Subset of flannel's net-conf.json; SubnetLen, Backend, ... are ignored.
#[derive(Debug)]
pub struct FlannelNetConfig {
    pub network: String,
}

impl FlannelNetConfig {
    /// net-conf.json must be a JSON object, anything else is rejected
    pub fn parse(net_conf: &str) -> Option<FlannelNetConfig> {
        let value = match serde_json::from_str::<serde_json::Value>(net_conf) {
            Ok(v) => v,
            Err(err) => {
                debug!("{} is not valid JSON: {}", FLANNEL_NET_CONF_KEY, err);
                return None;
            }
        };
        let conf = match value.as_object() {
            Some(conf) => conf,
            None => {
                debug!("{} is not a JSON object", FLANNEL_NET_CONF_KEY);
                return None;
            }
        };
        Some(FlannelNetConfig {
            network: conf
                .get(FLANNEL_NETWORK_CONF_PROPERTY)
                .and_then(|network| network.as_str())
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// pod CIDR of a net-conf.json blob, None if it is not usable
    pub fn pod_cidr(net_conf: &str) -> Option<String> {
        let conf = FlannelNetConfig::parse(net_conf)?;
        if conf.network.is_empty() {
            debug!(
                "{} has no string \"{}\" entry",
                FLANNEL_NET_CONF_KEY, FLANNEL_NETWORK_CONF_PROPERTY
            );
            return None;
        }
        Some(conf.network)
    }
}

pub struct FlannelDiscoverer {
    pub daemon_set_matcher: Box<dyn NameMatcher>,
    pub volume_matcher: Box<dyn NameMatcher>,
    pub tie_break: TieBreak,
}

impl Default for FlannelDiscoverer {
    fn default() -> FlannelDiscoverer {
        FlannelDiscoverer {
            daemon_set_matcher: Box::new(Contains(NETWORK_PLUGIN_FLANNEL)),
            volume_matcher: Box::new(Contains(NETWORK_PLUGIN_FLANNEL)),
            tie_break: TieBreak::Last,
        }
    }
}

fn pod_volumes(daemon_set: &DaemonSet) -> &[Volume] {
    daemon_set
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod_spec| pod_spec.volumes.as_deref())
        .unwrap_or_default()
}

impl FlannelDiscoverer {
    /// Finds the flannel DaemonSet and returns the name of the ConfigMap it mounts.
    pub async fn locate_config_map(
        &self,
        reader: &dyn ClusterObjectReader,
    ) -> Result<Option<String>, DiscoveryError> {
        let daemon_sets = match reader.list_daemon_sets(NAMESPACE_SYSTEM).await {
            Fetched::Found(v) => v,
            Fetched::NotFound => {
                debug!("no DaemonSets available in {}", NAMESPACE_SYSTEM);
                return Ok(None);
            }
            Fetched::Fault(err) => return Err(DiscoveryError::FlannelDaemonSet(err)),
        };

        let daemon_set = match self.tie_break.select(daemon_sets.iter().filter(|ds| {
            ds.metadata
                .name
                .as_deref()
                .map_or(false, |name| self.daemon_set_matcher.matches(name))
        })) {
            Some(ds) => ds,
            None => {
                debug!("no flannel DaemonSet in {}", NAMESPACE_SYSTEM);
                return Ok(None);
            }
        };
        let ds_name = daemon_set.metadata.name.as_deref().unwrap_or_default();

        let volumes = pod_volumes(daemon_set);
        if volumes.is_empty() {
            debug!("DaemonSet {} has no volumes", ds_name);
            return Ok(None);
        }

        // only ConfigMap backed volumes can carry net-conf.json
        let config_map = self.tie_break.select(volumes.iter().filter_map(|volume| {
            if !self.volume_matcher.matches(&volume.name) {
                return None;
            }
            volume
                .config_map
                .as_ref()
                .and_then(|source| source.name.as_deref())
                .filter(|name| !name.is_empty())
        }));
        if config_map.is_none() {
            debug!("DaemonSet {} mounts no flannel ConfigMap", ds_name);
        }
        Ok(config_map.map(|name| name.to_string()))
    }

    /// Fetches the flannel ConfigMap and extracts the pod CIDR from it.
    pub async fn pod_cidr(
        &self,
        reader: &dyn ClusterObjectReader,
        config_map_name: &str,
    ) -> Result<Option<String>, DiscoveryError> {
        let config_map: ConfigMap =
            match reader.get_config_map(NAMESPACE_SYSTEM, config_map_name).await {
                Fetched::Found(cm) => cm,
                Fetched::NotFound => {
                    debug!(
                        "ConfigMap {}/{} referenced by flannel does not exist",
                        NAMESPACE_SYSTEM, config_map_name
                    );
                    return Ok(None);
                }
                Fetched::Fault(err) => return Err(DiscoveryError::FlannelConfigMap(err)),
            };

        let net_conf = match config_map
            .data
            .as_ref()
            .and_then(|data| data.get(FLANNEL_NET_CONF_KEY))
        {
            Some(v) => v,
            None => {
                debug!(
                    "ConfigMap {} has no {} entry",
                    config_map_name, FLANNEL_NET_CONF_KEY
                );
                return Ok(None);
            }
        };
        Ok(FlannelNetConfig::pod_cidr(net_conf))
    }

    pub async fn discover_network(
        &self,
        reader: &dyn ClusterObjectReader,
        resolver: &dyn ServiceCidrResolver,
    ) -> Result<Option<ClusterNetwork>, DiscoveryError> {
        let config_map_name = match self.locate_config_map(reader).await? {
            Some(name) => name,
            None => return Ok(None),
        };
        let pod_cidr = match self.pod_cidr(reader, &config_map_name).await? {
            Some(cidr) => cidr,
            None => return Ok(None),
        };

        let mut network = ClusterNetwork::new(NETWORK_PLUGIN_FLANNEL, pod_cidr);

        // pod CIDR found, so a failing lookup here is a fault, not absence
        let cluster_ip_range = resolver
            .find_cluster_ip_range(reader)
            .await
            .map_err(DiscoveryError::ServiceCidr)?;
        if !cluster_ip_range.is_empty() {
            network.service_cidrs.push(cluster_ip_range);
        }

        debug!(
            "flannel network: pods {:?}, services {:?}",
            network.pod_cidrs, network.service_cidrs
        );
        Ok(Some(network))
    }
}

#[async_trait]
impl PluginDiscoverer for FlannelDiscoverer {
    fn name(&self) -> &str {
        NETWORK_PLUGIN_FLANNEL
    }

    // flannel always lives in kube-system, the namespace override is not used
    async fn discover(
        &self,
        ctx: &DiscoveryContext<'_>,
    ) -> Result<Option<ClusterNetwork>, DiscoveryError> {
        self.discover_network(ctx.reader, ctx.service_cidr).await
    }
}

/// Discovers a flannel network with the default name heuristics.
pub async fn discover_flannel_network(
    reader: &dyn ClusterObjectReader,
    resolver: &dyn ServiceCidrResolver,
) -> Result<Option<ClusterNetwork>, DiscoveryError> {
    FlannelDiscoverer::default()
        .discover_network(reader, resolver)
        .await
}
