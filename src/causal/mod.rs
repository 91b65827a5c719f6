//! Causal Consistency Kernel
//!
//! Implements dotted version vectors (DVVs) and the pure algebra that decides
//! which versions of a key survive under concurrent, partially ordered writes.
//!
//! ## Core Concepts
//! - **Dot**: a `(replica-id, counter)` pair uniquely identifying one write (`CausalEvent`).
//! - **Context**: a `VersionVector` summarizing the causal history known at the time of an operation.
//! - **Clock**: a `DottedVersionVector` tying one dot to the context it was minted against.
//! - **Siblings**: the causally concurrent versions currently stored for a key, unique by dot.
//! - **Kernel**: `DvvKernel` provides `sync`, `join`, `discard` and `event`; it is stateless and
//!   pure, so replica reconciliation is safe under arbitrary interleaving.

pub mod dvv;
pub mod event;
pub mod kernel;
pub mod siblings;
pub mod version_vector;
