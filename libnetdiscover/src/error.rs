use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("error obtaining the \"flannel\" Daemonset: {0}")]
    FlannelDaemonSet(#[source] anyhow::Error),
    #[error("error obtaining the \"flannel\" ConfigMap: {0}")]
    FlannelConfigMap(#[source] anyhow::Error),
    #[error("error determining the service CIDR range: {0}")]
    ServiceCidr(#[source] anyhow::Error),
    #[error("error discovering the {plugin} network: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: Box<DiscoveryError>,
    },
}

#[test]
fn test_discovery_error_message() {
    let err = DiscoveryError::FlannelDaemonSet(anyhow::anyhow!("daemonsets.apps is forbidden"));
    assert_eq!(
        err.to_string(),
        "error obtaining the \"flannel\" Daemonset: daemonsets.apps is forbidden"
    );

    let wrapped = DiscoveryError::Plugin {
        plugin: "flannel".to_string(),
        source: Box::new(err),
    };
    assert!(wrapped
        .to_string()
        .starts_with("error discovering the flannel network: error obtaining"));
    assert!(std::error::Error::source(&wrapped).is_some());
}
