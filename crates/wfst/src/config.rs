// Traversal limits shared by the algorithms.

use crate::semiring::Semiring;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Bounds applied by the potentially non-terminating algorithms.
///
/// Determinize, NShortestPaths and the epsilon closure of RmEpsilon would loop
/// forever on inputs that violate their preconditions; these caps turn that
/// into an error. Limits can be deserialized from any serde format, with
/// missing fields taking their defaults:
///
/// ```
/// let limits: wfst::Limits = serde_json::from_str(r#"{ "max_states": 500 }"#).unwrap();
/// assert_eq!(limits.max_states, 500);
/// assert_eq!(limits.max_queue_pops, wfst::Limits::default().max_queue_pops);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of states an expanding algorithm may create, and the
    /// bound on state ids accepted by the text reader.
    pub max_states: usize,
    /// Maximum number of priority-queue pops in NShortestPaths.
    pub max_queue_pops: usize,
    /// Two weights closer than this are treated as converged.
    pub closure_delta: f32,
    /// Relaxations a single state may undergo during epsilon closure and
    /// shortest distance, on top of the number of states in the graph, before
    /// the computation is declared divergent.
    pub max_closure_passes_per_state: usize,
}

/// Default convergence tolerance.
pub const DEFAULT_DELTA: f32 = 1.0 / 1024.0;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_states: 1_000_000,
            max_queue_pops: 10_000_000,
            closure_delta: DEFAULT_DELTA,
            max_closure_passes_per_state: 64,
        }
    }
}

impl Limits {
    /// How often one state may be re-queued in a graph of `num_states`
    /// states. Without a negative (or otherwise non-converging) cycle a state
    /// is relaxed at most `num_states` times.
    pub(crate) fn relaxation_limit(&self, num_states: usize) -> usize {
        num_states.saturating_add(self.max_closure_passes_per_state).max(1)
    }

    /// Whether relaxing `old` to `new` is progress worth propagating.
    ///
    /// For semirings whose `plus` selects an operand any strict improvement
    /// counts, so distances stay exact. Otherwise changes within
    /// `closure_delta` are treated as converged.
    pub(crate) fn relaxes<S: Semiring>(&self, old: S::Weight, new: S::Weight) -> bool {
        if S::IDEMPOTENT_PATH {
            S::compare(new, old) == Ordering::Less
        } else {
            !S::approx_eq(old, new, self.closure_delta)
        }
    }
}
