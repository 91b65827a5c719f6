use std::fmt;

use num_bigint::BigUint;

/// An inclusive range of hash values covered by one partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashRange {
    start: BigUint,
    end: BigUint,
}

impl HashRange {
    pub fn new(start: BigUint, end: BigUint) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn covers(&self, value: &BigUint) -> bool {
        *value >= self.start && *value <= self.end
    }

    pub fn start(&self) -> &BigUint {
        &self.start
    }

    pub fn end(&self) -> &BigUint {
        &self.end
    }
}

impl fmt::Display for HashRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
