use std::sync::Arc;

use anyhow::{ensure, Result};
use dashmap::{DashMap, DashSet};
use futures::future::join_all;
use num_bigint::BigUint;
use serde_json::Value;
use uuid::Uuid;

use crate::causal::kernel::DvvKernel;
use crate::causal::siblings::{Siblings, VersionedObject};
use crate::causal::version_vector::VersionVector;
use crate::ring::ring::PartitionedConsistentHash;

use super::config::NodeConfig;
use super::remote::RemoteNodeClient;

/// One replica node: the local sibling store, the partition ring and the
/// causal kernel, plus the injected capability for reaching peers.
///
/// The store maps `hash(key)` to the sibling set held for that key. Per-key
/// read-modify-write sections run under the map's entry lock, which is never
/// held across a suspension point.
pub struct Node {
    name: String,
    ring: PartitionedConsistentHash,
    data: DashMap<BigUint, Siblings>,
    processed_ops: DashSet<String>,
    kernel: DvvKernel,
    replication: usize,
    remote: Arc<dyn RemoteNodeClient>,
}

impl Node {
    pub fn new(config: &NodeConfig, remote: Arc<dyn RemoteNodeClient>) -> Result<Self> {
        ensure!(
            config.replication >= 1,
            "replication factor must be at least 1, got {}",
            config.replication
        );

        let name = if config.name.trim().is_empty() {
            Self::generate_name()
        } else {
            config.name.clone()
        };
        // the name doubles as the replica id in minted clocks, so it must
        // stay inside the canonical alphabetic grammar
        ensure!(
            name.chars().all(|c| c.is_ascii_alphabetic()),
            "node name must be alphabetic, got {:?}",
            name
        );

        let mut members: Vec<String> = config.peers.iter().map(|p| p.name.clone()).collect();
        members.push(name.clone());
        let ring = PartitionedConsistentHash::new(members, config.partitions)?;

        Ok(Self {
            name,
            ring,
            data: DashMap::new(),
            processed_ops: DashSet::new(),
            kernel: DvvKernel::new(),
            replication: config.replication,
            remote,
        })
    }

    fn generate_name() -> String {
        let suffix: String = Uuid::new_v4()
            .as_bytes()
            .iter()
            .take(8)
            .map(|b| char::from(b'a' + b % 26))
            .collect();
        format!("node{}", suffix)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kernel(&self) -> &DvvKernel {
        &self.kernel
    }

    pub fn ring(&self) -> &PartitionedConsistentHash {
        &self.ring
    }

    /// Serves a read. When this node is one of the key's replicas it merges
    /// the local sibling set with whatever the other replicas hold (read
    /// repair); otherwise the request is forwarded to the coordinating node.
    ///
    /// `None` means the key was absent everywhere consulted.
    pub async fn get(&self, key: &str) -> Result<Option<Siblings>> {
        ensure!(!key.trim().is_empty(), "key must not be empty");

        let replicas = self.ring.preference_list(key, self.replication)?;
        if replicas.iter().any(|r| r == &self.name) {
            tracing::debug!("get k={}", key);

            let mut replica_values = self.replicate_get(key, &replicas).await;
            let hash = self.ring.hash(key);
            if let Some(local) = self.data.get(&hash) {
                replica_values.push(local.value().clone());
            }

            if replica_values.is_empty() {
                return Ok(None);
            }
            Ok(Some(self.kernel.merge(replica_values)))
        } else {
            let coordinator = self.ring.node(key)?;
            tracing::debug!("forward get k={} to coordinating node {}", key, coordinator);
            self.remote.get(&coordinator, key).await
        }
    }

    /// Serves a write. When this node is one of the key's replicas it
    /// discards versions the context subsumes, mints a new clock, stores the
    /// updated sibling set and pushes it to every other replica; otherwise
    /// the write is forwarded to the coordinating node.
    ///
    /// The local write has succeeded once this returns, independent of
    /// replica outcomes.
    pub async fn put(&self, key: &str, value: Value, context: VersionVector) -> Result<()> {
        ensure!(!key.trim().is_empty(), "key must not be empty");

        let replicas = self.ring.preference_list(key, self.replication)?;
        if replicas.iter().any(|r| r == &self.name) {
            tracing::debug!("put k={}", key);

            let hash = self.ring.hash(key);
            let updated = {
                let mut entry = self.data.entry(hash).or_default();
                let kept = self.kernel.discard(entry.value(), &context);
                let clock = self.kernel.event(&context, &kept, &self.name)?;

                let mut next = kept;
                next.insert(VersionedObject::new(value, clock));
                *entry.value_mut() = next.clone();
                next
            };

            self.replicate_put(key, &replicas, &updated).await;
            Ok(())
        } else {
            let coordinator = self.ring.node(key)?;
            tracing::debug!("forward put k={} to coordinating node {}", key, coordinator);
            self.remote.put(&coordinator, key, value, &context).await
        }
    }

    /// Applies a forwarded write at most once per operation id. The
    /// forwarding node retries on transport errors, and a retransmission of a
    /// write this node already applied must be acknowledged without minting a
    /// second clock; an empty id disables the check.
    pub async fn put_forwarded(
        &self,
        op_id: &str,
        key: &str,
        value: Value,
        context: VersionVector,
    ) -> Result<()> {
        if !op_id.is_empty() && !self.processed_ops.insert(op_id.to_string()) {
            tracing::debug!("put k={} op={} already applied", key, op_id);
            return Ok(());
        }

        let result = self.put(key, value, context).await;
        if result.is_err() && !op_id.is_empty() {
            // a failed write may be retried under the same id
            self.processed_ops.remove(op_id);
        }
        result
    }

    /// Peer-to-peer read primitive. `None` is the distinguished "no local
    /// entry" result, not an error.
    pub fn get_replica(&self, key: &str) -> Result<Option<Siblings>> {
        ensure!(!key.trim().is_empty(), "key must not be empty");

        tracing::debug!("get-replica k={}", key);

        let hash = self.ring.hash(key);
        Ok(self.data.get(&hash).map(|entry| entry.value().clone()))
    }

    /// Peer-to-peer write primitive. The incoming set is folded into the
    /// local one with `sync`, never overwritten, so duplicate and
    /// out-of-order pushes are harmless.
    pub fn put_replica(&self, key: &str, incoming: Siblings) -> Result<()> {
        ensure!(!key.trim().is_empty(), "key must not be empty");

        tracing::debug!("put-replica k={}", key);

        let hash = self.ring.hash(key);
        let mut entry = self.data.entry(hash).or_default();
        let merged = self.kernel.sync(entry.value(), &incoming);
        *entry.value_mut() = merged;
        Ok(())
    }

    /// Concurrently pulls the sibling sets the other replicas hold. A failing
    /// peer contributes nothing to the merge and never aborts the read.
    async fn replicate_get(&self, key: &str, replicas: &[String]) -> Vec<Siblings> {
        let peers: Vec<&str> = replicas
            .iter()
            .map(|r| r.as_str())
            .filter(|r| *r != self.name)
            .collect();
        let pending = peers.iter().map(|peer| self.remote.get_replica(peer, key));
        let results = join_all(pending).await;

        let mut replica_values = Vec::new();
        for (peer, result) in peers.iter().zip(results) {
            match result {
                Ok(Some(siblings)) => replica_values.push(siblings),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("replica get from {} failed -- ignored: {}", peer, e);
                }
            }
        }
        replica_values
    }

    /// Concurrently pushes the updated sibling set to the other replicas. The
    /// coordinator's own write has already landed, so failures are logged and
    /// ignored.
    async fn replicate_put(&self, key: &str, replicas: &[String], siblings: &Siblings) {
        let peers: Vec<&str> = replicas
            .iter()
            .map(|r| r.as_str())
            .filter(|r| *r != self.name)
            .collect();
        let pending = peers
            .iter()
            .map(|peer| self.remote.put_replica(peer, key, siblings));
        let results = join_all(pending).await;

        for (peer, result) in peers.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!("replica put to {} failed -- ignored: {}", peer, e);
            }
        }
    }
}
