// Reverse: automaton accepting the reversed string pairs.

use crate::arc::{Arc, EPSILON, StateId};
use crate::fst::Fst;
use crate::semiring::Semiring;
use crate::state::State;

/// Reverse `fst`.
///
/// Original states keep their ids; a new super-start state is appended with
/// id `fst.num_states()`. Every arc `s -> d` becomes `d -> s` with weight
/// `S::reverse(w)`, the super-start gets an epsilon arc to each original final
/// state carrying that state's (reversed) final weight, and the original start
/// state becomes the only final state, with weight `one()`.
pub fn reverse<S: Semiring>(fst: &Fst<S>) -> Fst<S> {
    let n = fst.num_states();
    let mut states: Vec<State<S>> = (0..=n).map(|_| State::new()).collect();
    let super_start = n as StateId;

    for (s, state) in fst.states_iter() {
        for arc in &state.arcs {
            states[arc.nextstate as usize].arcs.push(Arc::new(
                arc.ilabel,
                arc.olabel,
                S::reverse(arc.weight),
                s,
            ));
        }
        if state.is_final() {
            states[n]
                .arcs
                .push(Arc::new(EPSILON, EPSILON, S::reverse(state.final_weight), s));
        }
    }
    if let Some(start) = fst.start() {
        states[start as usize].final_weight = S::one();
    }

    let mut res = Fst::new();
    res.replace_states(states, Some(super_start));
    res.set_input_symbols(fst.input_symbols().cloned());
    res.set_output_symbols(fst.output_symbols().cloned());
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semiring::TropicalSemiring;

    type StdArc = Arc<TropicalSemiring>;

    /// Accepts "ab" with weight 1+2+0.5.
    fn ab() -> Fst<TropicalSemiring> {
        let mut fst = Fst::new();
        for _ in 0..3 {
            fst.new_state();
        }
        fst.set_start(0).unwrap();
        fst.set_final(2, 0.5).unwrap();
        fst.add_arc(0, StdArc::new(1, 1, 1.0, 1)).unwrap();
        fst.add_arc(1, StdArc::new(2, 2, 2.0, 2)).unwrap();
        fst
    }

    #[test]
    fn reversed_structure() {
        let res = reverse(&ab());
        assert_eq!(res.num_states(), 4);
        assert_eq!(res.start(), Some(3));
        assert_eq!(res.arcs(3), &[StdArc::new(EPSILON, EPSILON, 0.5, 2)]);
        assert_eq!(res.arcs(2), &[StdArc::new(2, 2, 2.0, 1)]);
        assert_eq!(res.arcs(1), &[StdArc::new(1, 1, 1.0, 0)]);
        assert_eq!(res.final_weight(0), 0.0);
        assert!(!res.is_final(2));
    }

    #[test]
    fn empty_input_gives_lone_super_start() {
        let res = reverse(&Fst::<TropicalSemiring>::new());
        assert_eq!(res.num_states(), 1);
        assert_eq!(res.start(), Some(0));
        assert!(!res.is_final(0));
    }
}
