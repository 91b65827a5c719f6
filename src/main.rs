use axum::extract::Extension;
use axum::routing::{get, post, put};
use axum::Router;
use causalkv::node::config::{NodeConfig, PeerConfig};
use causalkv::node::handlers::{
    handle_forward_get, handle_forward_put, handle_get, handle_get_replica, handle_put,
    handle_put_replica,
};
use causalkv::node::node::Node;
use causalkv::node::protocol::{
    ENDPOINT_FORWARD_GET, ENDPOINT_FORWARD_PUT, ENDPOINT_KV, ENDPOINT_REPLICA_GET,
    ENDPOINT_REPLICA_PUT,
};
use causalkv::node::remote::{HttpRemoteNodeClient, RemoteNodeClient};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--name <name>] [--config <file.json>] \
             [--peer <name>=<addr:port>]... [--partitions <P>] [--replication <N>]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:6000 --name a", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:6001 --name b --peer a=127.0.0.1:6000",
            args[0]
        );

        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut config = NodeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--config" => {
                config = NodeConfig::from_file(&args[i + 1])?;
                i += 2;
            }
            "--name" => {
                config.name = args[i + 1].clone();
                i += 2;
            }
            "--peer" => {
                let (name, addr) = args[i + 1]
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("--peer expects <name>=<addr:port>"))?;
                config.peers.push(PeerConfig {
                    name: name.to_string(),
                    addr: addr.parse()?,
                });
                i += 2;
            }
            "--partitions" => {
                config.partitions = args[i + 1].parse()?;
                i += 2;
            }
            "--replication" => {
                config.replication = args[i + 1].parse()?;
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.expect("--bind is required");

    let remote: Arc<dyn RemoteNodeClient> = Arc::new(HttpRemoteNodeClient::new(&config.peers));
    let node = Arc::new(Node::new(&config, remote)?);

    tracing::info!(
        "node {} joining ring of {} member(s), {} partitions, n={}",
        node.name(),
        config.peers.len() + 1,
        config.partitions,
        config.replication
    );

    let app = Router::new()
        .route(
            &format!("{}/:key", ENDPOINT_KV),
            put(handle_put).get(handle_get),
        )
        .route(ENDPOINT_FORWARD_PUT, post(handle_forward_put))
        .route(
            &format!("{}/:key", ENDPOINT_FORWARD_GET),
            get(handle_forward_get),
        )
        .route(
            &format!("{}/:key", ENDPOINT_REPLICA_GET),
            get(handle_get_replica),
        )
        .route(ENDPOINT_REPLICA_PUT, post(handle_put_replica))
        .layer(Extension(node));

    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
