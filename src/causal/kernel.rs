use anyhow::Result;

use super::dvv::DottedVersionVector;
use super::event::CausalEvent;
use super::siblings::Siblings;
use super::version_vector::VersionVector;

/// The pure algebra over sibling sets: `sync`, `join`, `discard` and `event`.
///
/// The kernel is stateless; all state lives in the `Siblings` values threaded
/// through the calls. None of the operations performs I/O or suspends.
#[derive(Debug, Clone, Copy, Default)]
pub struct DvvKernel;

impl DvvKernel {
    pub fn new() -> Self {
        Self
    }

    /// Merges two sibling sets, dropping every version dominated by a version
    /// in the *other* set and keeping everything mutually concurrent.
    ///
    /// Sync is commutative, associative and idempotent, so it can be folded
    /// over replica replies in any arrival order.
    pub fn sync(&self, s1: &Siblings, s2: &Siblings) -> Siblings {
        let r1 = s1
            .iter()
            .filter(|sibling| !s2.iter().any(|other| sibling.happens_before(other)));
        let r2 = s2
            .iter()
            .filter(|sibling| !s1.iter().any(|other| sibling.happens_before(other)));

        r1.chain(r2).cloned().collect()
    }

    /// Left fold of `sync` over any number of sibling sets. The empty set is
    /// the fold identity, so an empty input yields an empty result.
    pub fn merge<I>(&self, sets: I) -> Siblings
    where
        I: IntoIterator<Item = Siblings>,
    {
        sets.into_iter()
            .fold(Siblings::new(), |merged, set| self.sync(&merged, &set))
    }

    /// Collapses a sibling set into a single context vector summarizing
    /// everything causally known: for every id in any sibling's clock, the
    /// max counter across all siblings.
    pub fn join(&self, siblings: &Siblings) -> VersionVector {
        let events = siblings.ids().into_iter().filter_map(|id| {
            // ids() only yields ids backed by a counter >= 1
            CausalEvent::new(&id, siblings.max_counter(&id)).ok()
        });
        VersionVector::from_events(events)
    }

    /// Removes obsolete versions: every sibling whose clock the incoming
    /// write's context already subsumes is dropped.
    pub fn discard(&self, siblings: &Siblings, context: &VersionVector) -> Siblings {
        siblings
            .iter()
            .filter(|sibling| !sibling.clock().happens_before_context(context))
            .cloned()
            .collect()
    }

    /// Mints the clock for a new write at replica `id`. The counter is
    /// strictly greater than both what the replica has already stored and
    /// what the writing client claims to have observed.
    pub fn event(
        &self,
        context: &VersionVector,
        siblings: &Siblings,
        id: &str,
    ) -> Result<DottedVersionVector> {
        let max_dot = siblings.max_counter(id);
        let max_causal_history = context.lookup(id);

        let dot = CausalEvent::new(id, max_dot.max(max_causal_history) + 1)?;
        Ok(DottedVersionVector::new(dot, context.clone()))
    }
}
