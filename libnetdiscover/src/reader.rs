// reader.rs: read-only access to the cluster objects discovery looks at
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};

/// Outcome of a single cluster read.
///
/// `NotFound` is kept apart from `Fault`: a missing resource means the
/// plugin is not installed, anything else is a real failure of the query.
#[derive(Debug)]
pub enum Fetched<T> {
    Found(T),
    NotFound,
    Fault(anyhow::Error),
}

impl<T> Fetched<T> {
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Fetched<U> {
        match self {
            Fetched::Found(v) => Fetched::Found(f(v)),
            Fetched::NotFound => Fetched::NotFound,
            Fetched::Fault(e) => Fetched::Fault(e),
        }
    }
}

#[async_trait]
pub trait ClusterObjectReader: Send + Sync {
    async fn list_daemon_sets(&self, namespace: &str) -> Fetched<Vec<DaemonSet>>;

    async fn get_config_map(&self, namespace: &str, name: &str) -> Fetched<ConfigMap>;

    /// `label_selector` uses the usual `key=value[,key=value]` syntax
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Fetched<Vec<Pod>>;
}

#[test]
fn test_fetched_map() {
    let found: Fetched<Vec<u8>> = Fetched::Found(vec![1, 2, 3]);
    assert!(matches!(found.map(|v| v.len()), Fetched::Found(3)));

    let missing: Fetched<Vec<u8>> = Fetched::NotFound;
    assert!(matches!(missing.map(|v| v.len()), Fetched::NotFound));

    let fault: Fetched<Vec<u8>> = Fetched::Fault(anyhow::anyhow!("forbidden"));
    match fault.map(|v| v.len()) {
        Fetched::Fault(e) => assert_eq!(e.to_string(), "forbidden"),
        _ => panic!("fault must be kept"),
    }
}
