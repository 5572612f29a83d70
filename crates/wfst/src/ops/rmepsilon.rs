// RmEpsilon: remove epsilon:epsilon arcs preserving the weighted language.

use crate::WfstError;
use crate::arc::{Arc, Label, StateId};
use crate::config::Limits;
use crate::fst::Fst;
use crate::semiring::Semiring;
use crate::state::State;
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Epsilon closure of one state: every state reachable through
/// epsilon:epsilon arcs, with the `plus` of all path weights leading there.
///
/// Members are listed in discovery order and always start with the source
/// itself. Computed by queue-based relaxation; a member re-entering the queue
/// more often than [`Limits::relaxation_limit`] allows means the closure does
/// not converge (e.g. a negative-cost epsilon cycle in the tropical semiring),
/// and [`WfstError::ClosureDiverged`] is returned.
pub(crate) struct EpsilonClosure<S: Semiring> {
    pub members: Vec<(StateId, S::Weight)>,
    residual: Vec<S::Weight>,
    index: HashMap<StateId, usize>,
    passes: Vec<usize>,
    queued: Vec<bool>,
}

impl<S: Semiring> EpsilonClosure<S> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            residual: Vec::new(),
            index: HashMap::new(),
            passes: Vec::new(),
            queued: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.members.clear();
        self.residual.clear();
        self.index.clear();
        self.passes.clear();
        self.queued.clear();
    }

    fn slot(&mut self, state: StateId) -> usize {
        if let Some(&i) = self.index.get(&state) {
            return i;
        }
        let i = self.members.len();
        self.members.push((state, S::zero()));
        self.residual.push(S::zero());
        self.passes.push(0);
        self.queued.push(false);
        self.index.insert(state, i);
        i
    }

    pub fn compute(
        &mut self,
        fst: &Fst<S>,
        source: StateId,
        limits: &Limits,
    ) -> Result<(), WfstError> {
        self.clear();
        let limit = limits.relaxation_limit(fst.num_states());
        let root = self.slot(source);
        self.members[root].1 = S::one();
        self.residual[root] = S::one();
        self.queued[root] = true;

        let mut queue = VecDeque::from([root]);
        while let Some(i) = queue.pop_front() {
            self.queued[i] = false;
            self.passes[i] += 1;
            if self.passes[i] > limit {
                tracing::warn!(state = source, "epsilon closure diverged");
                return Err(WfstError::ClosureDiverged { state: source });
            }
            let (q, _) = self.members[i];
            let r = std::mem::replace(&mut self.residual[i], S::zero());
            for arc in fst.arcs(q).iter().filter(|a| a.is_epsilon()) {
                let w = S::times(r, arc.weight);
                if w == S::zero() {
                    continue;
                }
                let j = self.slot(arc.nextstate);
                let old = self.members[j].1;
                let new = S::plus(old, w);
                if limits.relaxes::<S>(old, new) {
                    self.members[j].1 = new;
                    self.residual[j] = S::plus(self.residual[j], w);
                    if !self.queued[j] {
                        self.queued[j] = true;
                        queue.push_back(j);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Remove epsilon:epsilon arcs using [`Limits::default`].
pub fn rm_epsilon<S: Semiring>(fst: &Fst<S>) -> Result<Fst<S>, WfstError> {
    rm_epsilon_with(fst, &Limits::default())
}

/// Remove epsilon:epsilon arcs.
///
/// State ids are preserved. For each state `s`, every non-epsilon arc and the
/// final weight of each member `q` of the epsilon closure of `s` is copied to
/// `s`, extended (`times`) by the closure weight of `q`. Synthesized arcs with
/// the same labels and destination are merged with `plus`; the state's own
/// arcs are kept as they are, so an epsilon-free input comes back unchanged.
///
/// States that only served as epsilon intermediates may become unreachable;
/// run [`connect`](crate::ops::connect) to drop them.
///
/// Precondition: closures must converge. For idempotent semirings (tropical)
/// this excludes negative-weight epsilon cycles; for the log and probability
/// semirings the cycle weights must make the geometric sum converge. Otherwise
/// the relaxation bound trips and [`WfstError::ClosureDiverged`] is returned.
pub fn rm_epsilon_with<S: Semiring>(fst: &Fst<S>, limits: &Limits) -> Result<Fst<S>, WfstError> {
    let n = fst.num_states();
    let mut closure = EpsilonClosure::<S>::new();
    let mut states: Vec<State<S>> = Vec::with_capacity(n);
    let mut merged: HashMap<(Label, Label, StateId), usize> = HashMap::new();

    for s in 0..n as StateId {
        closure.compute(fst, s, limits)?;
        merged.clear();
        let mut out = State::<S>::new();

        for &(q, wq) in &closure.members {
            let member = &fst.states()[q as usize];
            if member.is_final() {
                out.final_weight = S::plus(out.final_weight, S::times(wq, member.final_weight));
            }
            for arc in member.arcs.iter().filter(|a| !a.is_epsilon()) {
                let weight = S::times(wq, arc.weight);
                let key = (arc.ilabel, arc.olabel, arc.nextstate);
                if q == s {
                    merged.entry(key).or_insert(out.arcs.len());
                    out.arcs.push(Arc::new(arc.ilabel, arc.olabel, weight, arc.nextstate));
                    continue;
                }
                match merged.get(&key) {
                    Some(&i) => out.arcs[i].weight = S::plus(out.arcs[i].weight, weight),
                    None => {
                        merged.insert(key, out.arcs.len());
                        out.arcs.push(Arc::new(arc.ilabel, arc.olabel, weight, arc.nextstate));
                    }
                }
            }
        }
        tracing::trace!(state = s, closure = closure.members.len(), "rmepsilon");
        states.push(out);
    }

    let mut res = Fst::new();
    res.replace_states(states, fst.start());
    res.set_input_symbols(fst.input_symbols().cloned());
    res.set_output_symbols(fst.output_symbols().cloned());
    tracing::debug!(states = res.num_states(), arcs = res.num_arcs(), "rmepsilon done");
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arc::EPSILON;
    use crate::semiring::{LogSemiring, TropicalSemiring};

    type StdFst = Fst<TropicalSemiring>;
    type StdArc = Arc<TropicalSemiring>;

    /// 0 -eps/1-> 1 -a/2-> 2(final 0.5), 0 -eps/3-> 2
    fn eps_chain() -> StdFst {
        let mut fst = StdFst::new();
        for _ in 0..3 {
            fst.new_state();
        }
        fst.set_start(0).unwrap();
        fst.set_final(2, 0.5).unwrap();
        fst.add_arc(0, StdArc::new(EPSILON, EPSILON, 1.0, 1)).unwrap();
        fst.add_arc(1, StdArc::new(1, 1, 2.0, 2)).unwrap();
        fst.add_arc(0, StdArc::new(EPSILON, EPSILON, 3.0, 2)).unwrap();
        fst
    }

    #[test]
    fn removes_epsilons() {
        let res = rm_epsilon(&eps_chain()).unwrap();
        assert!(!res.has_epsilons());
        assert_eq!(res.arcs(0), &[StdArc::new(1, 1, 3.0, 2)]);
        // empty string reaches state 2 with 3.0, plus final 0.5
        assert_eq!(res.final_weight(0), 3.5);
        assert_eq!(res.final_weight(2), 0.5);
    }

    #[test]
    fn epsilon_free_input_is_unchanged() {
        let mut fst = StdFst::new();
        let s0 = fst.new_state();
        let s1 = fst.new_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s1, 1.0).unwrap();
        fst.add_arc(s0, StdArc::new(1, 2, 0.25, s1)).unwrap();
        fst.add_arc(s0, StdArc::new(1, 2, 0.75, s1)).unwrap();
        fst.add_arc(s1, StdArc::new(3, 3, 0.0, s0)).unwrap();
        assert_eq!(rm_epsilon(&fst).unwrap(), fst);
    }

    #[test]
    fn merges_parallel_paths_with_plus() {
        // two epsilon routes into state 2, which has an 'a' arc
        let mut fst = StdFst::new();
        for _ in 0..4 {
            fst.new_state();
        }
        fst.set_start(0).unwrap();
        fst.set_final(3, 0.0).unwrap();
        fst.add_arc(0, StdArc::new(EPSILON, EPSILON, 4.0, 1)).unwrap();
        fst.add_arc(0, StdArc::new(EPSILON, EPSILON, 2.0, 2)).unwrap();
        fst.add_arc(1, StdArc::new(1, 1, 0.0, 3)).unwrap();
        fst.add_arc(2, StdArc::new(1, 1, 1.0, 3)).unwrap();
        let res = rm_epsilon(&fst).unwrap();
        assert_eq!(res.arcs(0), &[StdArc::new(1, 1, 3.0, 3)]);
    }

    #[test]
    fn positive_epsilon_cycle_terminates() {
        let mut fst = StdFst::new();
        let s0 = fst.new_state();
        let s1 = fst.new_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s1, 0.0).unwrap();
        fst.add_arc(s0, StdArc::new(EPSILON, EPSILON, 1.0, s1)).unwrap();
        fst.add_arc(s1, StdArc::new(EPSILON, EPSILON, 1.0, s0)).unwrap();
        fst.add_arc(s1, StdArc::new(2, 2, 0.0, s1)).unwrap();
        let res = rm_epsilon(&fst).unwrap();
        assert!(!res.has_epsilons());
        assert_eq!(res.final_weight(s0), 1.0);
        assert_eq!(res.arcs(s0), &[StdArc::new(2, 2, 1.0, s1)]);
    }

    #[test]
    fn negative_epsilon_cycle_is_reported() {
        let mut fst = StdFst::new();
        let s0 = fst.new_state();
        let s1 = fst.new_state();
        fst.set_start(s0).unwrap();
        fst.add_arc(s0, StdArc::new(EPSILON, EPSILON, -1.0, s1)).unwrap();
        fst.add_arc(s1, StdArc::new(EPSILON, EPSILON, -1.0, s0)).unwrap();
        let err = rm_epsilon(&fst).unwrap_err();
        assert!(matches!(err, WfstError::ClosureDiverged { state: 0 }));
    }

    #[test]
    fn zero_weight_epsilon_contributes_nothing() {
        let mut fst = StdFst::new();
        let s0 = fst.new_state();
        let s1 = fst.new_state();
        let s2 = fst.new_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s1, 0.0).unwrap();
        fst.set_final(s2, 0.0).unwrap();
        fst.add_arc(s0, StdArc::new(EPSILON, EPSILON, f32::INFINITY, s1)).unwrap();
        fst.add_arc(s1, StdArc::new(1, 1, 0.0, s2)).unwrap();
        let res = rm_epsilon(&fst).unwrap();
        assert!(res.arcs(s0).is_empty());
        assert!(!res.is_final(s0));
        assert_eq!(res.arcs(s1), &[StdArc::new(1, 1, 0.0, s2)]);
    }

    #[test]
    fn log_cycle_converges_within_delta() {
        // self-loop with probability e^-1: closure weight -log(1/(1-e^-1))
        let mut fst = Fst::<LogSemiring>::new();
        let s0 = fst.new_state();
        fst.set_start(s0).unwrap();
        fst.set_final(s0, 0.0).unwrap();
        fst.add_arc(s0, Arc::new(EPSILON, EPSILON, 1.0, s0)).unwrap();
        let res = rm_epsilon(&fst).unwrap();
        let expected = (1.0f32 - (-1.0f32).exp()).ln();
        assert!((res.final_weight(s0) - expected).abs() < 0.01);
    }
}
