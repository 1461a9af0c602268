// types.rs: ClusterNetwork, the plugin-agnostic discovery result
use serde::Serialize;
use std::fmt;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ClusterNetwork {
    #[serde(rename = "networkPlugin")]
    pub network_plugin: String,
    #[serde(rename = "podCIDRs")]
    pub pod_cidrs: Vec<String>,
    #[serde(rename = "serviceCIDRs", skip_serializing_if = "Vec::is_empty")]
    pub service_cidrs: Vec<String>,
}

impl ClusterNetwork {
    pub fn new(network_plugin: &str, pod_cidr: String) -> ClusterNetwork {
        ClusterNetwork {
            network_plugin: network_plugin.to_string(),
            pod_cidrs: vec![pod_cidr],
            service_cidrs: vec![],
        }
    }

    /// both ranges are known, nothing has to be asked from the user
    pub fn is_complete(&self) -> bool {
        !self.pod_cidrs.is_empty() && !self.service_cidrs.is_empty()
    }
}

fn join_or_unknown(cidrs: &[String]) -> String {
    match cidrs.len() {
        0 => "<unknown>".to_string(),
        _ => cidrs.join(", "),
    }
}

impl fmt::Display for ClusterNetwork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_fmt(format_args!(
            "Network plugin: {0}\nPod CIDRs: {1}\nService CIDRs: {2}",
            self.network_plugin,
            join_or_unknown(&self.pod_cidrs),
            join_or_unknown(&self.service_cidrs)
        ))
    }
}

#[test]
fn test_cluster_network_serialize() {
    let mut network = ClusterNetwork::new("flannel", "10.0.0.0/8".to_string());
    assert_eq!(
        serde_json::to_string(&network).unwrap(),
        r#"{"networkPlugin":"flannel","podCIDRs":["10.0.0.0/8"]}"#
    );

    network.service_cidrs.push("10.96.0.0/12".to_string());
    assert_eq!(
        serde_json::to_string(&network).unwrap(),
        r#"{"networkPlugin":"flannel","podCIDRs":["10.0.0.0/8"],"serviceCIDRs":["10.96.0.0/12"]}"#
    );
}

#[test]
fn test_cluster_network_is_complete() {
    let mut network = ClusterNetwork::new("flannel", "10.0.0.0/8".to_string());
    assert!(!network.is_complete());

    network.service_cidrs.push("10.96.0.0/12".to_string());
    assert!(network.is_complete());
}

#[test]
fn test_cluster_network_display() {
    let network = ClusterNetwork::new("flannel", "10.244.0.0/16".to_string());
    assert_eq!(
        &format!("{}", network),
        "Network plugin: flannel\nPod CIDRs: 10.244.0.0/16\nService CIDRs: <unknown>"
    );
}
