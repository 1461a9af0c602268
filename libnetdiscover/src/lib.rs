// libnetdiscover: infers the pod/service network layout of a cluster from
// the objects its CNI plugin leaves behind.
pub mod discover;
pub mod error;
pub mod flannel;
pub mod matcher;
pub mod reader;
pub mod service_cidr;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use discover::{discover, DiscoveryContext, PluginDiscoverer};
pub use error::DiscoveryError;
pub use flannel::{discover_flannel_network, FlannelDiscoverer};
pub use reader::{ClusterObjectReader, Fetched};
pub use service_cidr::{ApiserverServiceCidr, ServiceCidrResolver};
pub use types::ClusterNetwork;

/// namespace holding the cluster infrastructure components
pub const NAMESPACE_SYSTEM: &str = "kube-system";
