use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use anyhow::{ensure, Result};
use regex::Regex;

use super::event::CausalEvent;

static VECTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{(?:\([a-z]+,\d+\)(?:,\([a-z]+,\d+\))*)?\}$").expect("vector grammar")
});
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([a-z]+),(\d+)\)").expect("vector entry grammar"));

/// A version vector: an efficient summary of a causal history.
///
/// Maps each replica id to the highest counter observed for it. Built fresh
/// each time it is derived and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionVector {
    events: BTreeMap<String, i64>,
}

impl VersionVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vector from an iterable of causal events. A later duplicate
    /// id silently overwrites an earlier one; callers pre-reduce when max
    /// semantics are needed.
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = CausalEvent>,
    {
        let mut map = BTreeMap::new();
        for event in events {
            map.insert(event.id().to_string(), event.counter());
        }
        Self { events: map }
    }

    /// The counter recorded for a replica id, or 0 when the id is unknown.
    /// Never fails.
    pub fn lookup(&self, id: &str) -> i64 {
        self.events.get(&id.to_lowercase()).copied().unwrap_or(0)
    }

    /// All ids with a nonzero counter.
    pub fn ids(&self) -> BTreeSet<String> {
        self.events
            .iter()
            .filter(|(_, counter)| **counter != 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Parses the canonical `{(id1,n1),(id2,n2)}` form. Whitespace-only input
    /// is the empty vector; anything else that does not match the grammar is
    /// an error, never silently defaulted.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        ensure!(
            VECTOR_RE.is_match(trimmed),
            "malformed version vector: {text:?}"
        );

        let mut events = Vec::new();
        for caps in ENTRY_RE.captures_iter(trimmed) {
            let counter: i64 = caps[2].parse()?;
            events.push(CausalEvent::new(&caps[1], counter)?);
        }
        Ok(Self::from_events(events))
    }
}

impl fmt::Display for VersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // BTreeMap iteration gives the ascending id order the canonical form
        // requires.
        write!(f, "{{")?;
        for (i, (id, counter)) in self.events.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "({},{})", id, counter)?;
        }
        write!(f, "}}")
    }
}
