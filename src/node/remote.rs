use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::causal::siblings::Siblings;
use crate::causal::version_vector::VersionVector;

use super::config::PeerConfig;
use super::protocol::{
    siblings_from_wire, siblings_to_wire, PutRequest, ReplicateRequest, SiblingsWire,
    ENDPOINT_FORWARD_GET, ENDPOINT_FORWARD_PUT, ENDPOINT_REPLICA_GET, ENDPOINT_REPLICA_PUT,
};

const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);
const REQUEST_ATTEMPTS: usize = 3;

/// The capability a node uses to reach its peers.
///
/// Injected at construction so tests can substitute an in-process fake. Every
/// call may fail with a transport error; callers treat that as "peer
/// unreachable" and continue.
#[async_trait]
pub trait RemoteNodeClient: Send + Sync {
    /// Forward a coordinator-bound write.
    async fn put(&self, node: &str, key: &str, value: Value, context: &VersionVector)
        -> Result<()>;

    /// Forward a coordinator-bound read. `None` means the key was not found.
    async fn get(&self, node: &str, key: &str) -> Result<Option<Siblings>>;

    /// Push replicated state to a peer.
    async fn put_replica(&self, node: &str, key: &str, siblings: &Siblings) -> Result<()>;

    /// Pull replicated state from a peer. `None` means the peer holds no
    /// entry for the key, which is not an error.
    async fn get_replica(&self, node: &str, key: &str) -> Result<Option<Siblings>>;
}

/// HTTP implementation of the peer capability. Peer addresses are resolved
/// from configuration by node name.
pub struct HttpRemoteNodeClient {
    addresses: HashMap<String, SocketAddr>,
    http_client: reqwest::Client,
}

impl HttpRemoteNodeClient {
    pub fn new(peers: &[PeerConfig]) -> Self {
        let addresses = peers
            .iter()
            .map(|peer| (peer.name.clone(), peer.addr))
            .collect();

        Self {
            addresses,
            http_client: reqwest::Client::new(),
        }
    }

    fn addr_of(&self, node: &str) -> Result<SocketAddr> {
        self.addresses
            .get(node)
            .copied()
            .ok_or_else(|| anyhow!("no address configured for node {}", node))
    }

    /// Builds `http://<peer>{endpoint}/<key>` with the key percent-encoded as
    /// a single path segment, so keys containing `/`, `?` or spaces reach the
    /// peer intact.
    pub(crate) fn endpoint_url(&self, node: &str, endpoint: &str, key: &str) -> Result<String> {
        let addr = self.addr_of(node)?;
        let mut url = reqwest::Url::parse(&format!("http://{}{}", addr, endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("cannot extend url for endpoint {}", endpoint))?
            .push(key);
        Ok(url.to_string())
    }

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: String,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..REQUEST_ATTEMPTS {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == REQUEST_ATTEMPTS {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("retry attempts exhausted"))
    }

    async fn get_with_retry(&self, url: String) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..REQUEST_ATTEMPTS {
            let response = self
                .http_client
                .get(url.clone())
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == REQUEST_ATTEMPTS {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("retry attempts exhausted"))
    }

    async fn fetch_siblings(&self, url: String) -> Result<Option<Siblings>> {
        let response = self.get_with_retry(url).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            bail!("remote get failed: {}", response.status());
        }

        let wire: SiblingsWire = response.json().await?;
        let siblings = siblings_from_wire(wire.siblings)?;
        Ok(Some(siblings))
    }
}

#[async_trait]
impl RemoteNodeClient for HttpRemoteNodeClient {
    async fn put(
        &self,
        node: &str,
        key: &str,
        value: Value,
        context: &VersionVector,
    ) -> Result<()> {
        let addr = self.addr_of(node)?;
        let payload = PutRequest {
            op_id: Uuid::new_v4().simple().to_string(),
            key: key.to_string(),
            value,
            context: context.to_string(),
        };

        let response = self
            .post_with_retry(format!("http://{}{}", addr, ENDPOINT_FORWARD_PUT), &payload)
            .await?;

        if !response.status().is_success() {
            bail!("forwarded put failed: {}", response.status());
        }
        Ok(())
    }

    async fn get(&self, node: &str, key: &str) -> Result<Option<Siblings>> {
        let url = self.endpoint_url(node, ENDPOINT_FORWARD_GET, key)?;
        self.fetch_siblings(url).await
    }

    async fn put_replica(&self, node: &str, key: &str, siblings: &Siblings) -> Result<()> {
        let addr = self.addr_of(node)?;
        let payload = ReplicateRequest {
            key: key.to_string(),
            siblings: siblings_to_wire(siblings),
        };

        let response = self
            .post_with_retry(format!("http://{}{}", addr, ENDPOINT_REPLICA_PUT), &payload)
            .await?;

        if !response.status().is_success() {
            bail!("replica put failed: {}", response.status());
        }
        Ok(())
    }

    async fn get_replica(&self, node: &str, key: &str) -> Result<Option<Siblings>> {
        let url = self.endpoint_url(node, ENDPOINT_REPLICA_GET, key)?;
        self.fetch_siblings(url).await
    }
}
