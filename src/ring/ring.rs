use anyhow::{anyhow, ensure, Result};
use num_bigint::BigUint;
use sha1::{Digest, Sha1};

use super::range::HashRange;

const SHA1_BITS: u32 = 160;

/// A consistent-hash ring divided into a fixed power-of-two number of
/// partitions, each owned by exactly one node.
///
/// Partitions are assigned round-robin over the sorted distinct node names at
/// construction time, so every configured node owns at least one partition
/// whenever the node count does not exceed the partition count.
#[derive(Debug, Clone)]
pub struct PartitionedConsistentHash {
    nodes: Vec<String>,
    ring: Vec<(HashRange, String)>,
}

impl PartitionedConsistentHash {
    pub fn new<I>(nodes: I, partitions: usize) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        ensure!(
            partitions > 0 && partitions.is_power_of_two(),
            "partitions must be a power of 2, got {}",
            partitions
        );

        let mut names: Vec<String> = nodes.into_iter().collect();
        names.sort();
        names.dedup();
        ensure!(!names.is_empty(), "at least one node is required");

        let shift = SHA1_BITS - partitions.ilog2();
        let span = BigUint::from(1u8) << shift;

        let mut ring = Vec::with_capacity(partitions);
        for partition in 0..partitions {
            let start = BigUint::from(partition) * &span;
            let end = &start + &span - 1u8;
            let owner = names[partition % names.len()].clone();
            ring.push((HashRange::new(start, end), owner));
        }

        Ok(Self { nodes: names, ring })
    }

    /// The SHA-1 digest of the UTF-8 key bytes as an unsigned 160-bit
    /// integer.
    ///
    /// The digest bytes are read little-endian; key placement and the pinned
    /// hash test vectors depend on this byte order.
    pub fn hash(&self, key: &str) -> BigUint {
        let digest = Sha1::digest(key.as_bytes());
        BigUint::from_bytes_le(&digest)
    }

    pub fn partitions(&self) -> usize {
        self.ring.len()
    }

    /// The distinct node names on the ring, sorted.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// The coordinating node for the key: the owner of the partition covering
    /// `hash(key)`.
    pub fn node(&self, key: &str) -> Result<String> {
        ensure!(!key.trim().is_empty(), "key must not be empty");

        let hash = self.hash(key);
        let index = self.partition_index(&hash)?;
        Ok(self.ring[index].1.clone())
    }

    /// The replica set for the key: starting at the partition covering
    /// `hash(key)`, walks the ring clockwise (wrapping) collecting distinct
    /// owner names until `n` are collected or the ring is exhausted.
    ///
    /// The first entry always equals `node(key)` and the result holds
    /// `min(n, distinct node count)` names.
    pub fn preference_list(&self, key: &str, n: usize) -> Result<Vec<String>> {
        ensure!(!key.trim().is_empty(), "key must not be empty");

        let hash = self.hash(key);
        let start = self.partition_index(&hash)?;

        let mut list = Vec::new();
        for offset in 0..self.ring.len() {
            if list.len() >= n {
                break;
            }
            let owner = &self.ring[(start + offset) % self.ring.len()].1;
            if !list.contains(owner) {
                list.push(owner.clone());
            }
        }
        Ok(list)
    }

    fn partition_index(&self, hash: &BigUint) -> Result<usize> {
        self.ring
            .iter()
            .position(|(range, _)| range.covers(hash))
            .ok_or_else(|| anyhow!("no partition covers hash {}", hash))
    }
}
