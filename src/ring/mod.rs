//! Consistent-Hash Partition Ring
//!
//! Divides the 160-bit SHA-1 output space into a fixed power-of-two number of
//! partitions and assigns each partition to one node.
//!
//! ## Core Concepts
//! - **Placement**: `hash(key)` lands in exactly one partition; its owner is
//!   the coordinating node for the key.
//! - **Preference list**: the coordinator followed by the next distinct
//!   owners clockwise on the ring, i.e. the replica set for the key.

pub mod range;
pub mod ring;
