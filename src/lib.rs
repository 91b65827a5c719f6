//! Causal Key-Value Store Node Library
//!
//! This library crate defines the core modules of a Dynamo-style replicated
//! key-value store node. It serves as the foundation for the binary
//! executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of three loosely coupled subsystems:
//!
//! - **`causal`**: The consistency kernel. Dotted version vectors, sibling
//!   sets and the pure algebra (`sync`, `join`, `discard`, `event`) that
//!   decides which versions survive under concurrent writes.
//! - **`ring`**: The placement layer. A consistent-hash ring over the SHA-1
//!   space that maps keys to partitions, owners and replica preference lists.
//! - **`node`**: The orchestration layer. Routes reads and writes to the
//!   coordinator, mutates the local in-memory store through the kernel and
//!   replicates sibling sets to peers over HTTP.

pub mod causal;
pub mod node;
pub mod ring;
