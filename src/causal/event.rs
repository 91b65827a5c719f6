use std::fmt;
use std::sync::LazyLock;

use anyhow::{anyhow, ensure, Result};
use regex::Regex;

static EVENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([a-z]+),(\d+)\)$").expect("event grammar"));

/// A single write event at a replica: the "dot".
///
/// Replica identifiers are compared without regard to case, so the id is
/// normalized to lowercase at construction and must be alphabetic, matching
/// the canonical grammar so every minted dot can travel the wire and be
/// reparsed. The counter is always >= 1; a dot only exists because an actual
/// write happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CausalEvent {
    id: String,
    counter: i64,
}

impl CausalEvent {
    pub fn new(id: &str, counter: i64) -> Result<Self> {
        ensure!(!id.trim().is_empty(), "replica id must not be empty");
        ensure!(counter > 0, "counter must be positive, got {}", counter);

        let id = id.to_lowercase();
        ensure!(
            id.chars().all(|c| c.is_ascii_lowercase()),
            "replica id must be alphabetic, got {:?}",
            id
        );

        Ok(Self { id, counter })
    }

    /// The replica (server) identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The counter representing a unique write at this replica.
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Parses the canonical `(id,n)` form. Only lowercase alphabetic ids are
    /// accepted; a malformed string is an error, never defaulted.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = EVENT_RE
            .captures(text.trim())
            .ok_or_else(|| anyhow!("malformed causal event: {text:?}"))?;
        let counter: i64 = caps[2].parse()?;
        Self::new(&caps[1], counter)
    }
}

impl fmt::Display for CausalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.id, self.counter)
    }
}
