use anyhow::Result;
use clap::{App, Arg, ArgAction};
use libnetdiscover::{discover, ApiserverServiceCidr, DiscoveryContext, FlannelDiscoverer};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod kube_reader;
use kube_reader::{create_client, KubeReader};

fn build_app() -> App<'static> {
    let kubeconfig_arg: Arg = Arg::new("kubeconfig")
        .help("kubeconfig path (in-cluster or $KUBECONFIG when omitted)")
        .long("kubeconfig")
        .takes_value(true)
        .required(false);
    let output_arg: Arg = Arg::new("output")
        .help("output format of the discovered network")
        .long("output")
        .short('o')
        .takes_value(true)
        .possible_values(["json", "yaml"])
        .default_value("json");
    let debug_arg: Arg = Arg::new("debug")
        .help("enable debug logging")
        .long("debug")
        .takes_value(false)
        .required(false)
        .action(ArgAction::SetTrue);

    App::new("netdiscover")
        .version("0.1.0")
        .about("discover pod/service CIDRs of a flannel cluster")
        .arg(kubeconfig_arg)
        .arg(output_arg)
        .arg(debug_arg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_app().try_get_matches()?;

    // logs go to stderr, stdout only carries the discovered network
    let log_level = if matches.get_one::<bool>("debug").copied().unwrap_or(false) {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let kubeconfig = matches.get_one::<String>("kubeconfig").map(|s| s.as_str());
    let client = create_client(kubeconfig).await?;
    let reader = KubeReader::new(client);

    let ctx = DiscoveryContext {
        reader: &reader,
        service_cidr: &ApiserverServiceCidr,
        namespace_override: None,
    };
    let flannel = FlannelDiscoverer::default();

    match discover(&[&flannel], &ctx).await? {
        Some(network) => {
            debug!("discovered network:\n{}", network);
            if !network.is_complete() {
                info!("service CIDR could not be determined");
            }
            let output = match matches.get_one::<String>("output").map(|s| s.as_str()) {
                Some("yaml") => serde_yaml::to_string(&network)?,
                _ => serde_json::to_string_pretty(&network)?,
            };
            println!("{}", output);
        }
        None => {
            info!("flannel not detected");
        }
    };
    Ok(())
}

#[test]
fn test_build_app_defaults() {
    let matches = build_app().try_get_matches_from(["netdiscover"]).unwrap();
    assert_eq!(
        matches.get_one::<String>("output").map(|s| s.as_str()),
        Some("json")
    );
    assert_eq!(matches.get_one::<bool>("debug"), Some(&false));
    assert!(matches.get_one::<String>("kubeconfig").is_none());
}

#[test]
fn test_build_app_args() {
    let matches = build_app()
        .try_get_matches_from([
            "netdiscover",
            "--kubeconfig",
            "/etc/kubernetes/admin.conf",
            "-o",
            "yaml",
            "--debug",
        ])
        .unwrap();
    assert_eq!(
        matches.get_one::<String>("kubeconfig").map(|s| s.as_str()),
        Some("/etc/kubernetes/admin.conf")
    );
    assert_eq!(
        matches.get_one::<String>("output").map(|s| s.as_str()),
        Some("yaml")
    );
    assert_eq!(matches.get_one::<bool>("debug"), Some(&true));

    assert!(build_app()
        .try_get_matches_from(["netdiscover", "-o", "toml"])
        .is_err());
}
