// State: final weight plus the ordered list of outgoing arcs.

use crate::arc::Arc;
use crate::semiring::Semiring;

/// Automaton state. A final weight of `S::zero()` means "not final".
#[derive(Debug, Clone, PartialEq)]
pub struct State<S: Semiring> {
    pub final_weight: S::Weight,
    pub arcs: Vec<Arc<S>>,
}

impl<S: Semiring> State<S> {
    pub fn new() -> Self {
        Self {
            final_weight: S::zero(),
            arcs: Vec::new(),
        }
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.final_weight != S::zero()
    }

    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Number of arcs with epsilon on both tapes.
    pub fn num_epsilons(&self) -> usize {
        self.arcs.iter().filter(|a| a.is_epsilon()).count()
    }
}

impl<S: Semiring> Default for State<S> {
    fn default() -> Self {
        Self::new()
    }
}
