use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::{
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use libnetdiscover::{ClusterObjectReader, Fetched};
use tracing::debug;

/// ClusterObjectReader backed by the Kubernetes API server.
pub struct KubeReader {
    client: Client,
}

impl KubeReader {
    pub fn new(client: Client) -> KubeReader {
        KubeReader { client }
    }
}

// create a client from the given kubeconfig, or from the environment
pub async fn create_client(kubeconfig: Option<&str>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            debug!("reading kubeconfig {}", path);
            Config::from_custom_kubeconfig(
                Kubeconfig::read_from(path)?,
                &KubeConfigOptions::default(),
            )
            .await?
        }
        None => Config::infer().await?,
    };
    Ok(Client::try_from(config)?)
}

fn into_fetched<T>(result: Result<T, kube::Error>) -> Fetched<T> {
    match result {
        Ok(v) => Fetched::Found(v),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Fetched::NotFound,
        Err(e) => Fetched::Fault(e.into()),
    }
}

#[async_trait]
impl ClusterObjectReader for KubeReader {
    async fn list_daemon_sets(&self, namespace: &str) -> Fetched<Vec<DaemonSet>> {
        let daemon_sets: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
        into_fetched(daemon_sets.list(&ListParams::default()).await).map(|list| list.items)
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Fetched<ConfigMap> {
        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        into_fetched(config_maps.get(name).await)
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Fetched<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(label_selector);
        into_fetched(pods.list(&lp).await).map(|list| list.items)
    }
}

#[test]
fn test_into_fetched() {
    use kube::error::ErrorResponse;

    let not_found: Result<(), kube::Error> = Err(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: "configmaps \"kube-flannel-cfg\" not found".to_string(),
        reason: "NotFound".to_string(),
        code: 404,
    }));
    assert!(matches!(into_fetched(not_found), Fetched::NotFound));

    let forbidden: Result<(), kube::Error> = Err(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: "daemonsets.apps is forbidden".to_string(),
        reason: "Forbidden".to_string(),
        code: 403,
    }));
    match into_fetched(forbidden) {
        Fetched::Fault(e) => assert!(e.to_string().contains("forbidden")),
        _ => panic!("403 must be a fault"),
    }

    assert!(matches!(into_fetched(Ok(1)), Fetched::Found(1)));
}
