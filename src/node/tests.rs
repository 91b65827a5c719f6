//! Node Orchestration Tests
//!
//! Validates routing (coordinate vs forward), replica fan-out, causal context
//! flow and partial-failure tolerance using an in-process fake of the
//! `RemoteNodeClient` capability wired to a cluster of real nodes.

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, RwLock};

    use anyhow::{anyhow, bail, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::causal::dvv::DottedVersionVector;
    use crate::causal::siblings::{Siblings, VersionedObject};
    use crate::causal::version_vector::VersionVector;
    use crate::node::config::{NodeConfig, PeerConfig};
    use crate::node::node::Node;
    use crate::node::protocol::ENDPOINT_REPLICA_GET;
    use crate::node::remote::{HttpRemoteNodeClient, RemoteNodeClient};

    /// Routes every remote call straight to the target node in-process.
    /// Nodes listed in `unreachable` simulate a transport failure.
    #[derive(Default)]
    struct ClusterClient {
        nodes: RwLock<HashMap<String, Arc<Node>>>,
        unreachable: RwLock<HashSet<String>>,
    }

    impl ClusterClient {
        fn register(&self, node: Arc<Node>) {
            self.nodes
                .write()
                .unwrap()
                .insert(node.name().to_string(), node);
        }

        fn disconnect(&self, name: &str) {
            self.unreachable.write().unwrap().insert(name.to_string());
        }

        fn target(&self, name: &str) -> Result<Arc<Node>> {
            if self.unreachable.read().unwrap().contains(name) {
                bail!("node {name} unreachable");
            }
            self.nodes
                .read()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("unknown node {name}"))
        }
    }

    #[async_trait]
    impl RemoteNodeClient for ClusterClient {
        async fn put(
            &self,
            node: &str,
            key: &str,
            value: Value,
            context: &VersionVector,
        ) -> Result<()> {
            let target = self.target(node)?;
            target.put(key, value, context.clone()).await
        }

        async fn get(&self, node: &str, key: &str) -> Result<Option<Siblings>> {
            let target = self.target(node)?;
            target.get(key).await
        }

        async fn put_replica(&self, node: &str, key: &str, siblings: &Siblings) -> Result<()> {
            let target = self.target(node)?;
            target.put_replica(key, siblings.clone())
        }

        async fn get_replica(&self, node: &str, key: &str) -> Result<Option<Siblings>> {
            let target = self.target(node)?;
            target.get_replica(key)
        }
    }

    fn build_cluster(
        names: &[&str],
        partitions: usize,
        replication: usize,
    ) -> (HashMap<String, Arc<Node>>, Arc<ClusterClient>) {
        let client = Arc::new(ClusterClient::default());
        let mut nodes = HashMap::new();

        for name in names {
            let peers = names
                .iter()
                .filter(|peer| *peer != name)
                .map(|peer| PeerConfig {
                    name: peer.to_string(),
                    addr: "127.0.0.1:0".parse().unwrap(),
                })
                .collect();
            let config = NodeConfig {
                name: name.to_string(),
                peers,
                partitions,
                replication,
                read_quorum: 0,
                write_quorum: 0,
            };

            let remote: Arc<dyn RemoteNodeClient> = client.clone();
            let node = Arc::new(Node::new(&config, remote).unwrap());
            client.register(node.clone());
            nodes.insert(name.to_string(), node);
        }

        (nodes, client)
    }

    fn ten_names() -> Vec<&'static str> {
        vec!["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]
    }

    fn single_version(value: Value, clock: &str) -> Siblings {
        let mut siblings = Siblings::new();
        siblings.insert(VersionedObject::new(
            value,
            DottedVersionVector::parse(clock).unwrap(),
        ));
        siblings
    }

    // ============================================================
    // ROUTING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_put_then_get_on_a_replica() {
        let (nodes, _) = build_cluster(&["A", "B", "C"], 32, 3);
        let a = &nodes["A"];

        a.put("foo", json!("bar"), VersionVector::new()).await.unwrap();

        let siblings = a.get("foo").await.unwrap().unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings.iter().next().unwrap().value(), &json!("bar"));
    }

    #[tokio::test]
    async fn test_get_of_unknown_key_is_not_found() {
        let (nodes, _) = build_cluster(&["A", "B", "C"], 32, 3);

        let result = nodes["A"].get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_forwards_to_the_coordinator() {
        // "foo" lands in partition 6 of 32; with nodes A..J the coordinator
        // is G and the preference list is G, H, I.
        let (nodes, _) = build_cluster(&ten_names(), 32, 3);

        nodes["A"]
            .put("foo", json!("bar"), VersionVector::new())
            .await
            .unwrap();

        assert!(nodes["A"].get_replica("foo").unwrap().is_none());
        assert!(nodes["G"].get_replica("foo").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_forwards_to_the_coordinator() {
        let (nodes, _) = build_cluster(&ten_names(), 32, 3);

        nodes["G"]
            .put("foo", json!({ "v": 1 }), VersionVector::new())
            .await
            .unwrap();

        let siblings = nodes["A"].get("foo").await.unwrap().unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings.iter().next().unwrap().value(), &json!({ "v": 1 }));
    }

    #[tokio::test]
    async fn test_key_is_coordinated_by_exactly_one_node() {
        let (nodes, _) = build_cluster(&ten_names(), 32, 1);

        for node in nodes.values() {
            node.put("foo", json!("bar"), VersionVector::new())
                .await
                .unwrap();
        }

        let storing = nodes
            .values()
            .filter(|node| node.get_replica("foo").unwrap().is_some())
            .count();
        assert_eq!(storing, 1);
    }

    // ============================================================
    // REPLICATION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_put_fans_out_to_every_other_replica() {
        let (nodes, _) = build_cluster(&ten_names(), 32, 3);

        nodes["G"]
            .put("foo", json!("bar"), VersionVector::new())
            .await
            .unwrap();

        for replica in ["G", "H", "I"] {
            assert!(
                nodes[replica].get_replica("foo").unwrap().is_some(),
                "replica {replica} should hold the key"
            );
        }
        assert!(nodes["J"].get_replica("foo").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replica_is_idempotent() {
        let (nodes, _) = build_cluster(&["A", "B", "C"], 32, 3);
        let incoming = single_version(json!("bar"), "((r,1),{})");

        nodes["A"].put_replica("foo", incoming.clone()).unwrap();
        nodes["A"].put_replica("foo", incoming.clone()).unwrap();

        let stored = nodes["A"].get_replica("foo").unwrap().unwrap();
        assert_eq!(stored, incoming);
    }

    #[tokio::test]
    async fn test_put_replica_merges_instead_of_overwriting() {
        let (nodes, _) = build_cluster(&["A", "B", "C"], 32, 3);

        nodes["A"]
            .put_replica("foo", single_version(json!("x"), "((x,1),{})"))
            .unwrap();
        nodes["A"]
            .put_replica("foo", single_version(json!("y"), "((y,1),{})"))
            .unwrap();

        let stored = nodes["A"].get_replica("foo").unwrap().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_get_merges_divergent_replica_state() {
        let (nodes, _) = build_cluster(&["A", "B", "C"], 32, 3);

        nodes["A"]
            .put_replica("foo", single_version(json!("x"), "((x,1),{})"))
            .unwrap();
        nodes["C"]
            .put_replica("foo", single_version(json!("y"), "((y,1),{})"))
            .unwrap();

        let merged = nodes["A"].get("foo").await.unwrap().unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_peer_does_not_abort_put_or_get() {
        let (nodes, client) = build_cluster(&["A", "B", "C"], 32, 3);
        client.disconnect("B");

        nodes["A"]
            .put("foo", json!("bar"), VersionVector::new())
            .await
            .unwrap();

        assert!(nodes["C"].get_replica("foo").unwrap().is_some());

        let siblings = nodes["A"].get("foo").await.unwrap().unwrap();
        assert_eq!(siblings.len(), 1);
    }

    // ============================================================
    // CAUSAL CONTEXT FLOW TESTS
    // ============================================================

    #[tokio::test]
    async fn test_echoed_context_retires_superseded_versions() {
        let (nodes, _) = build_cluster(&["a"], 32, 3);
        let node = &nodes["a"];

        node.put("k", json!("v1"), VersionVector::new()).await.unwrap();

        let read = node.get("k").await.unwrap().unwrap();
        let context = node.kernel().join(&read);

        node.put("k", json!("v2"), context).await.unwrap();

        let siblings = node.get("k").await.unwrap().unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings.iter().next().unwrap().value(), &json!("v2"));
    }

    #[tokio::test]
    async fn test_blind_concurrent_writes_become_siblings() {
        let (nodes, _) = build_cluster(&["a"], 32, 3);
        let node = &nodes["a"];

        node.put("k", json!("v1"), VersionVector::new()).await.unwrap();
        node.put("k", json!("v2"), VersionVector::new()).await.unwrap();

        let siblings = node.get("k").await.unwrap().unwrap();
        assert_eq!(siblings.len(), 2);
    }

    #[tokio::test]
    async fn test_retransmitted_forwarded_write_mints_no_duplicate_sibling() {
        let (nodes, _) = build_cluster(&["a"], 32, 3);
        let node = &nodes["a"];

        // a retried forwarded request resends the same operation id; only the
        // first application may mint a clock
        node.put_forwarded("op", "k", json!("v"), VersionVector::new())
            .await
            .unwrap();
        node.put_forwarded("op", "k", json!("v"), VersionVector::new())
            .await
            .unwrap();

        let siblings = node.get("k").await.unwrap().unwrap();
        assert_eq!(siblings.len(), 1);
    }

    #[tokio::test]
    async fn test_forwarded_writes_with_distinct_op_ids_apply_separately() {
        let (nodes, _) = build_cluster(&["a"], 32, 3);
        let node = &nodes["a"];

        node.put_forwarded("opx", "k", json!("v1"), VersionVector::new())
            .await
            .unwrap();
        node.put_forwarded("opy", "k", json!("v2"), VersionVector::new())
            .await
            .unwrap();

        let siblings = node.get("k").await.unwrap().unwrap();
        assert_eq!(siblings.len(), 2);
    }

    // ============================================================
    // CONTRACT TESTS
    // ============================================================

    #[tokio::test]
    async fn test_empty_key_is_a_contract_violation() {
        let (nodes, _) = build_cluster(&["A", "B", "C"], 32, 3);
        let a = &nodes["A"];

        assert!(a.get("").await.is_err());
        assert!(a.put("", json!(1), VersionVector::new()).await.is_err());
        assert!(a.get_replica("  ").is_err());
        assert!(a.put_replica("", Siblings::new()).is_err());
    }

    #[tokio::test]
    async fn test_name_is_generated_when_config_leaves_it_empty() {
        let client = Arc::new(ClusterClient::default());
        let remote: Arc<dyn RemoteNodeClient> = client.clone();

        let node = Node::new(&NodeConfig::default(), remote).unwrap();
        assert!(node.name().starts_with("node"));
        assert!(node.name().chars().all(|c| c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn test_generated_name_mints_a_reparseable_context() {
        let client = Arc::new(ClusterClient::default());
        let remote: Arc<dyn RemoteNodeClient> = client.clone();
        let node = Arc::new(Node::new(&NodeConfig::default(), remote).unwrap());
        client.register(node.clone());

        node.put("k", json!("v"), VersionVector::new()).await.unwrap();

        // the context handed to clients must survive the wire round trip
        let read = node.get("k").await.unwrap().unwrap();
        let context = node.kernel().join(&read);
        assert_eq!(
            VersionVector::parse(&context.to_string()).unwrap(),
            context
        );
        for version in read.iter() {
            assert_eq!(
                &DottedVersionVector::parse(&version.clock().to_string()).unwrap(),
                version.clock()
            );
        }
    }

    #[tokio::test]
    async fn test_non_alphabetic_node_name_is_rejected() {
        let client = Arc::new(ClusterClient::default());
        let remote: Arc<dyn RemoteNodeClient> = client.clone();

        let config = NodeConfig {
            name: "node-1".to_string(),
            ..NodeConfig::default()
        };
        assert!(Node::new(&config, remote).is_err());
    }

    #[tokio::test]
    async fn test_replication_factor_of_zero_is_rejected() {
        let client = Arc::new(ClusterClient::default());
        let remote: Arc<dyn RemoteNodeClient> = client.clone();

        let config = NodeConfig {
            replication: 0,
            ..NodeConfig::default()
        };
        assert!(Node::new(&config, remote).is_err());
    }

    #[test]
    fn test_remote_urls_encode_key_path_segments() {
        let http = HttpRemoteNodeClient::new(&[PeerConfig {
            name: "a".to_string(),
            addr: "127.0.0.1:6000".parse().unwrap(),
        }]);

        let url = http
            .endpoint_url("a", ENDPOINT_REPLICA_GET, "a key/with?chars")
            .unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:6000/internal/replica/get/a%20key%2Fwith%3Fchars"
        );
    }
}
