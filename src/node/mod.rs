//! Node Orchestration Module
//!
//! Ties the causal kernel and the partition ring together to serve client
//! reads and writes and to replicate sibling sets between peers.
//!
//! ## Core Mechanisms
//! - **Routing**: the preference list decides whether this node coordinates a
//!   key or forwards the request to the coordinating node.
//! - **Replication**: a coordinator fans out to every other replica
//!   concurrently; an unreachable peer is logged and ignored, never fatal.
//! - **Reconciliation**: replica state is always folded in with `sync`, so
//!   out-of-order and duplicate pushes are harmless.
//!
//! ## Submodules
//! - **`node`**: the orchestrator owning the local store, ring and kernel.
//! - **`remote`**: the peer capability trait plus its HTTP implementation.
//! - **`protocol`**: HTTP endpoint constants and wire DTOs.
//! - **`handlers`**: axum handlers exposing the node over HTTP.
//! - **`config`**: the explicit configuration value injected at construction.

pub mod config;
pub mod handlers;
pub mod node;
pub mod protocol;
pub mod remote;

#[cfg(test)]
mod tests;
