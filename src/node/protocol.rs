//! Node Network Protocol
//!
//! Defines the HTTP endpoints and Data Transfer Objects (DTOs) used between
//! clients and nodes and for internode replication.
//!
//! Values travel as raw JSON; clocks and contexts travel in their canonical
//! text form so that any peer can reparse them exactly.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::causal::dvv::DottedVersionVector;
use crate::causal::siblings::{Siblings, VersionedObject};

// --- API Endpoints ---

/// Public endpoint for client reads and writes (`/kv/:key`).
pub const ENDPOINT_KV: &str = "/kv";
/// Internal endpoint for forwarding a write to the coordinating node.
pub const ENDPOINT_FORWARD_PUT: &str = "/internal/put";
/// Internal endpoint for forwarding a read to the coordinating node.
pub const ENDPOINT_FORWARD_GET: &str = "/internal/get";
/// Internal endpoint replicas use to pull a peer's sibling set.
pub const ENDPOINT_REPLICA_GET: &str = "/internal/replica/get";
/// Internal endpoint a coordinator uses to push its sibling set to a replica.
pub const ENDPOINT_REPLICA_PUT: &str = "/internal/replica/put";

// --- Data Transfer Objects ---

/// Query parameters accepted by the public PUT endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PutParams {
    /// Canonical version-vector text echoed from a previous read; empty for
    /// a blind write.
    #[serde(default)]
    pub context: String,
}

/// Payload for forwarding a write to the coordinating node.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutRequest {
    /// Operation id minted once per logical write. The coordinator applies
    /// each id at most once, so transport-level retries of the same request
    /// cannot mint duplicate clocks.
    #[serde(default)]
    pub op_id: String,
    /// The data key.
    pub key: String,
    /// The client's JSON value.
    pub value: serde_json::Value,
    /// Canonical version-vector text of the writer's causal context.
    #[serde(default)]
    pub context: String,
}

/// Standard acknowledgment for write operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    pub success: bool,
}

/// One version on the wire: the JSON value plus its clock in canonical text.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionedObjectWire {
    pub value: serde_json::Value,
    pub clock: String,
}

/// A full sibling set on the wire, as returned by the internal read
/// endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct SiblingsWire {
    pub siblings: Vec<VersionedObjectWire>,
}

/// Payload a coordinator pushes to a replica after a successful local write.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicateRequest {
    /// The data key.
    pub key: String,
    /// The coordinator's full updated sibling set for the key.
    pub siblings: Vec<VersionedObjectWire>,
}

/// Client-facing read result: the concurrent values plus the joined causal
/// context the client echoes back on its next write.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub values: Vec<serde_json::Value>,
    pub context: String,
}

// --- Wire Conversions ---

pub fn siblings_to_wire(siblings: &Siblings) -> Vec<VersionedObjectWire> {
    siblings
        .iter()
        .map(|version| VersionedObjectWire {
            value: version.value().clone(),
            clock: version.clock().to_string(),
        })
        .collect()
}

pub fn siblings_from_wire(wire: Vec<VersionedObjectWire>) -> Result<Siblings> {
    let mut siblings = Siblings::new();
    for entry in wire {
        let clock = DottedVersionVector::parse(&entry.clock)?;
        siblings.insert(VersionedObject::new(entry.value, clock));
    }
    Ok(siblings)
}
