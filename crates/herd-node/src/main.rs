//! Herd Node binary
//!
//! Runs one named node of the herd described by `HERD_TOPOLOGY` (or the
//! built-in five-node herd).

use herd_node::{HerdConfig, HerdNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herd_node=info,herd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [name] = args.as_slice() else {
        usage(None);
        std::process::exit(2);
    };

    let config = match HerdConfig::from_env(name) {
        Ok(config) => config,
        Err(herd_node::Error::UnknownNode(_)) => {
            usage(Some(name.as_str()));
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let node = HerdNode::bind(config).await?;
    node.run_until(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    Ok(())
}

fn usage(name: Option<&str>) {
    let names: Vec<String> = match std::env::var("HERD_TOPOLOGY") {
        Ok(path) => herd_topology::Topology::from_file(path)
            .map(|t| t.node_names().map(str::to_string).collect())
            .unwrap_or_default(),
        Err(_) => herd_topology::DEFAULT_HERD.iter().map(|n| n.to_string()).collect(),
    };
    if let Some(name) = name {
        eprintln!("Unknown node name: {name}");
    }
    eprintln!("Usage: herd-node <NodeName>");
    eprintln!("Valid node names: {}", names.join(", "));
}
