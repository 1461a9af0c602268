// discover.rs: tries each plugin discoverer until one recognises the cluster
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::DiscoveryError;
use crate::reader::ClusterObjectReader;
use crate::service_cidr::ServiceCidrResolver;
use crate::types::ClusterNetwork;

/// Everything a plugin discoverer may look at.
pub struct DiscoveryContext<'a> {
    pub reader: &'a dyn ClusterObjectReader,
    pub service_cidr: &'a dyn ServiceCidrResolver,
    /// namespace the caller runs in, for plugins that are not in kube-system
    pub namespace_override: Option<String>,
}

#[async_trait]
pub trait PluginDiscoverer: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` means the plugin is not installed on this cluster.
    async fn discover(
        &self,
        ctx: &DiscoveryContext<'_>,
    ) -> Result<Option<ClusterNetwork>, DiscoveryError>;
}

pub async fn discover(
    discoverers: &[&dyn PluginDiscoverer],
    ctx: &DiscoveryContext<'_>,
) -> Result<Option<ClusterNetwork>, DiscoveryError> {
    for discoverer in discoverers {
        debug!("trying {} network discovery", discoverer.name());
        match discoverer.discover(ctx).await {
            Ok(Some(network)) => {
                info!("detected {} network", network.network_plugin);
                return Ok(Some(network));
            }
            Ok(None) => continue,
            Err(e) => {
                return Err(DiscoveryError::Plugin {
                    plugin: discoverer.name().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
    Ok(None)
}
