// Arc: a labelled, weighted transition between two states.

use crate::semiring::Semiring;

/// Symbol identifier. `0` is reserved for epsilon.
pub type Label = u32;

/// Dense, 0-based state identifier.
pub type StateId = u32;

/// The empty label.
pub const EPSILON: Label = 0;

/// Sentinel used where a state id is absent in fixed-width encodings.
pub const NO_STATE: StateId = u32::MAX;

/// Outgoing transition owned by its source state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc<S: Semiring> {
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: S::Weight,
    pub nextstate: StateId,
}

impl<S: Semiring> Arc<S> {
    pub fn new(ilabel: Label, olabel: Label, weight: S::Weight, nextstate: StateId) -> Self {
        Self {
            ilabel,
            olabel,
            weight,
            nextstate,
        }
    }

    /// True when both labels are epsilon.
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.ilabel == EPSILON && self.olabel == EPSILON
    }

    /// Key used to compare arcs as multiset elements.
    #[inline]
    pub(crate) fn sort_key(&self) -> (Label, Label, StateId, u32) {
        use crate::semiring::Weight;
        (self.ilabel, self.olabel, self.nextstate, self.weight.key_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semiring::TropicalSemiring;

    #[test]
    fn epsilon_detection() {
        let eps = Arc::<TropicalSemiring>::new(EPSILON, EPSILON, 0.0, 1);
        let half = Arc::<TropicalSemiring>::new(EPSILON, 3, 0.0, 1);
        assert!(eps.is_epsilon());
        assert!(!half.is_epsilon());
    }
}
