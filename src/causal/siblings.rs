use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::dvv::DottedVersionVector;
use super::event::CausalEvent;

/// One concrete version of a key's content: an opaque JSON value tagged with
/// the clock of the write that produced it.
///
/// Equality follows the clock (and thus the dot); the payload does not
/// participate in identity.
#[derive(Debug, Clone)]
pub struct VersionedObject {
    value: Value,
    clock: DottedVersionVector,
}

impl VersionedObject {
    pub fn new(value: Value, clock: DottedVersionVector) -> Self {
        Self { value, clock }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn clock(&self) -> &DottedVersionVector {
        &self.clock
    }

    pub fn happens_before(&self, other: &VersionedObject) -> bool {
        self.clock.happens_before(&other.clock)
    }
}

impl PartialEq for VersionedObject {
    fn eq(&self, other: &Self) -> bool {
        self.clock == other.clock
    }
}

impl Eq for VersionedObject {}

/// The causally concurrent versions currently stored for one key.
///
/// Structurally a map keyed by each version's dot, which makes the
/// unique-by-dot invariant a property of the representation rather than of an
/// equality override. Inserting a version with a dot already present replaces
/// the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Siblings {
    versions: BTreeMap<CausalEvent, VersionedObject>,
}

impl Siblings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, version: VersionedObject) {
        self.versions
            .insert(version.clock().dot().clone(), version);
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionedObject> {
        self.versions.values()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains_dot(&self, dot: &CausalEvent) -> bool {
        self.versions.contains_key(dot)
    }

    /// The union of every id appearing in any sibling's clock.
    pub fn ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for version in self.versions.values() {
            ids.extend(version.clock().ids());
        }
        ids
    }

    /// The highest counter known for `id` across all siblings, 0 when the
    /// set is empty or the id is unknown.
    pub fn max_counter(&self, id: &str) -> i64 {
        self.versions
            .values()
            .map(|version| version.clock().max_counter(id))
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<VersionedObject> for Siblings {
    fn from_iter<I: IntoIterator<Item = VersionedObject>>(iter: I) -> Self {
        let mut siblings = Self::new();
        for version in iter {
            siblings.insert(version);
        }
        siblings
    }
}

impl IntoIterator for Siblings {
    type Item = VersionedObject;
    type IntoIter = std::collections::btree_map::IntoValues<CausalEvent, VersionedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.into_values()
    }
}
