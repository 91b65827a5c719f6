use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::Regex;

use super::event::CausalEvent;
use super::version_vector::VersionVector;

static DVV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\([a-z]+,\d+\)),(\{.*\})\)$").expect("dvv grammar"));

/// A dotted version vector: one dot plus the causal context the write was
/// performed against. Encapsulates tracking and reasoning about a single
/// value's causality.
///
/// Equality and hashing consider only the dot. Two clocks carrying the same
/// dot denote the same write regardless of how their contexts were built;
/// contexts are provenance, not identity.
#[derive(Debug, Clone)]
pub struct DottedVersionVector {
    dot: CausalEvent,
    context: VersionVector,
}

impl DottedVersionVector {
    pub fn new(dot: CausalEvent, context: VersionVector) -> Self {
        Self { dot, context }
    }

    pub fn dot(&self) -> &CausalEvent {
        &self.dot
    }

    pub fn context(&self) -> &VersionVector {
        &self.context
    }

    /// Dominance test: this write happens before `other` when `other`'s
    /// context already accounts for this dot.
    ///
    /// `((i,n),u) < ((j,m),v) <=> n <= v[i]`
    pub fn happens_before(&self, other: &DottedVersionVector) -> bool {
        self.happens_before_context(&other.context)
    }

    /// The same dominance test against a raw context vector.
    pub fn happens_before_context(&self, context: &VersionVector) -> bool {
        self.dot.counter() <= context.lookup(self.dot.id())
    }

    /// The union of the dot's id and every id in the context.
    pub fn ids(&self) -> BTreeSet<String> {
        let mut ids = self.context.ids();
        ids.insert(self.dot.id().to_string());
        ids
    }

    /// The highest counter known for `id` across the dot and the context.
    pub fn max_counter(&self, id: &str) -> i64 {
        let mut max = self.context.lookup(id);
        if self.dot.id() == id.to_lowercase() && self.dot.counter() > max {
            max = self.dot.counter();
        }
        max
    }

    /// Parses the canonical `((id,n),{...context...})` form.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = DVV_RE
            .captures(text.trim())
            .ok_or_else(|| anyhow!("malformed dotted version vector: {text:?}"))?;
        let dot = CausalEvent::parse(&caps[1])?;
        let context = VersionVector::parse(&caps[2])?;
        Ok(Self::new(dot, context))
    }
}

impl fmt::Display for DottedVersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.dot, self.context)
    }
}

impl PartialEq for DottedVersionVector {
    fn eq(&self, other: &Self) -> bool {
        self.dot == other.dot
    }
}

impl Eq for DottedVersionVector {}

impl Hash for DottedVersionVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dot.hash(state);
    }
}
