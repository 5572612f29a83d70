// Compose: on-demand product construction with an epsilon-matching filter.

use crate::WfstError;
use crate::arc::{Arc, EPSILON, Label, StateId};
use crate::fst::Fst;
use crate::semiring::Semiring;
use crate::symbols::same_table;
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Epsilon filter state attached to every composed state.
///
/// When the left automaton has an epsilon output and the right one an epsilon
/// input at the same time, the two moves can be interleaved in several ways
/// that all denote the same path. The filter admits exactly one of them:
/// consecutive single-sided epsilon moves must all be on the same side, and a
/// simultaneous epsilon move is only allowed when no single-sided move is in
/// progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterState {
    /// Last step matched a real symbol, or was a simultaneous epsilon move.
    NoEps,
    /// Last step advanced only the left automaton on an epsilon output.
    MatchEpsA,
    /// Last step advanced only the right automaton on an epsilon input.
    MatchEpsB,
}

type Triple = (StateId, StateId, FilterState);

/// Arcs of `arcs` whose input label is `label`.
///
/// On input-label-sorted arcs the candidates are narrowed by binary search;
/// the filter keeps the yield identical to a full scan in either case.
fn matching<S: Semiring>(
    arcs: &[Arc<S>],
    label: Label,
    sorted: bool,
) -> impl Iterator<Item = &Arc<S>> {
    let candidates = if sorted {
        let lo = arcs.partition_point(|a| a.ilabel < label);
        let hi = lo + arcs[lo..].partition_point(|a| a.ilabel == label);
        &arcs[lo..hi]
    } else {
        arcs
    };
    candidates.iter().filter(move |a| a.ilabel == label)
}

struct Composer<'a, S: Semiring> {
    a: &'a Fst<S>,
    b: &'a Fst<S>,
    b_sorted: bool,
    res: Fst<S>,
    states: HashMap<Triple, StateId>,
    queue: VecDeque<Triple>,
}

impl<'a, S: Semiring> Composer<'a, S> {
    /// Result state for `triple`, created and queued on first sight.
    fn state(&mut self, triple: Triple) -> Result<StateId, WfstError> {
        if let Some(&s) = self.states.get(&triple) {
            return Ok(s);
        }
        let (qa, qb, _) = triple;
        let s = self.res.new_state();
        let fw = S::times(self.a.final_weight(qa), self.b.final_weight(qb));
        self.res.set_final(s, fw)?;
        self.states.insert(triple, s);
        self.queue.push_back(triple);
        Ok(s)
    }

    fn emit(
        &mut self,
        from: StateId,
        ilabel: Label,
        olabel: Label,
        weight: S::Weight,
        to: Triple,
    ) -> Result<(), WfstError> {
        let dest = self.state(to)?;
        self.res.add_arc(from, Arc::new(ilabel, olabel, weight, dest))
    }

    fn expand(&mut self, triple: Triple) -> Result<(), WfstError> {
        let (qa, qb, filter) = triple;
        let from = self.states[&triple];
        let (a, b) = (self.a, self.b);

        for a1 in a.arcs(qa) {
            if a1.olabel == EPSILON {
                if filter != FilterState::MatchEpsB {
                    self.emit(
                        from,
                        a1.ilabel,
                        EPSILON,
                        a1.weight,
                        (a1.nextstate, qb, FilterState::MatchEpsA),
                    )?;
                }
                if filter == FilterState::NoEps {
                    for a2 in matching(b.arcs(qb), EPSILON, self.b_sorted) {
                        self.emit(
                            from,
                            a1.ilabel,
                            a2.olabel,
                            S::times(a1.weight, a2.weight),
                            (a1.nextstate, a2.nextstate, FilterState::NoEps),
                        )?;
                    }
                }
            } else {
                for a2 in matching(b.arcs(qb), a1.olabel, self.b_sorted) {
                    self.emit(
                        from,
                        a1.ilabel,
                        a2.olabel,
                        S::times(a1.weight, a2.weight),
                        (a1.nextstate, a2.nextstate, FilterState::NoEps),
                    )?;
                }
            }
        }

        if filter != FilterState::MatchEpsA {
            for a2 in matching(b.arcs(qb), EPSILON, self.b_sorted) {
                self.emit(
                    from,
                    EPSILON,
                    a2.olabel,
                    a2.weight,
                    (qa, a2.nextstate, FilterState::MatchEpsB),
                )?;
            }
        }
        Ok(())
    }
}

/// Compose `a` with `b`.
///
/// A path `i:o` exists in the result exactly when some `i:m` path of `a` and
/// `m:o` path of `b` exist; its weight is the `times` of both, and alternative
/// intermediate strings are kept as parallel paths (summed by `plus` when the
/// language is evaluated). Result states are created lazily from the start
/// pair and memoized on `(state of a, state of b, filter state)`; states are
/// numbered in breadth-first discovery order.
///
/// When both symbol tables are present, the output table of `a` must equal
/// the input table of `b`, or [`WfstError::SymbolTableMismatch`] is returned.
/// Sorting `b` by input label ([`arc_sort`](crate::ops::arc_sort)) enables
/// binary-search matching; the result is the same either way. The result is
/// not trimmed.
pub fn compose<S: Semiring>(a: &Fst<S>, b: &Fst<S>) -> Result<Fst<S>, WfstError> {
    if a.output_symbols().is_some()
        && b.input_symbols().is_some()
        && !same_table(a.output_symbols(), b.input_symbols())
    {
        return Err(WfstError::SymbolTableMismatch);
    }

    let mut res = Fst::<S>::new();
    res.set_input_symbols(a.input_symbols().cloned());
    res.set_output_symbols(b.output_symbols().cloned());

    let (Some(sa), Some(sb)) = (a.start(), b.start()) else {
        return Ok(res);
    };

    let mut composer = Composer {
        a,
        b,
        b_sorted: b.is_ilabel_sorted(),
        res,
        states: HashMap::new(),
        queue: VecDeque::new(),
    };
    let start = composer.state((sa, sb, FilterState::NoEps))?;
    composer.res.set_start(start)?;

    while let Some(triple) = composer.queue.pop_front() {
        composer.expand(triple)?;
    }

    tracing::debug!(
        states = composer.res.num_states(),
        arcs = composer.res.num_arcs(),
        sorted_matching = composer.b_sorted,
        "compose"
    );
    Ok(composer.res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::connect::connect;
    use crate::semiring::TropicalSemiring;
    use crate::symbols::SymbolTable;

    type StdFst = Fst<TropicalSemiring>;
    type StdArc = Arc<TropicalSemiring>;

    fn linear(arcs: &[(Label, Label, f32)]) -> StdFst {
        let mut fst = StdFst::new();
        let mut s = fst.new_state();
        fst.set_start(s).unwrap();
        for &(i, o, w) in arcs {
            let d = fst.new_state();
            fst.add_arc(s, StdArc::new(i, o, w, d)).unwrap();
            s = d;
        }
        fst.set_final(s, 0.0).unwrap();
        fst
    }

    /// Number of successful paths in an acyclic fst.
    fn count_paths(fst: &StdFst) -> usize {
        fn walk(fst: &StdFst, s: StateId) -> usize {
            let here = usize::from(fst.is_final(s));
            here + fst.arcs(s).iter().map(|a| walk(fst, a.nextstate)).sum::<usize>()
        }
        fst.start().map(|s| walk(fst, s)).unwrap_or(0)
    }

    #[test]
    fn simple_label_match() {
        let a = linear(&[(1, 2, 1.0)]);
        let b = linear(&[(2, 3, 2.0)]);
        let c = compose(&a, &b).unwrap();
        assert_eq!(c.num_states(), 2);
        assert_eq!(c.arcs(0), &[StdArc::new(1, 3, 3.0, 1)]);
        assert_eq!(c.final_weight(1), 0.0);
    }

    #[test]
    fn no_shared_label_gives_no_path() {
        let a = linear(&[(1, 2, 0.0)]);
        let b = linear(&[(4, 3, 0.0)]);
        let mut c = compose(&a, &b).unwrap();
        connect(&mut c);
        assert_eq!(c.num_states(), 0);
    }

    #[test]
    fn epsilon_output_meets_epsilon_input_once() {
        // a: x:eps then y:m ; b: eps:z then m:w
        let a = linear(&[(1, EPSILON, 1.0), (2, 5, 1.0)]);
        let b = linear(&[(EPSILON, 3, 1.0), (5, 4, 1.0)]);
        let mut c = compose(&a, &b).unwrap();
        connect(&mut c);
        assert_eq!(count_paths(&c), 1);
    }

    #[test]
    fn epsilon_side_transitions_do_not_duplicate() {
        // one state each, a shared label plus epsilon self-loops on the
        // relevant tapes
        let mut a = StdFst::new();
        let a0 = a.new_state();
        let a1 = a.new_state();
        a.set_start(a0).unwrap();
        a.set_final(a1, 0.0).unwrap();
        a.add_arc(a0, StdArc::new(1, EPSILON, 0.0, a1)).unwrap();
        a.add_arc(a1, StdArc::new(2, 7, 0.0, a1)).unwrap();

        let mut b = StdFst::new();
        let b0 = b.new_state();
        let b1 = b.new_state();
        b.set_start(b0).unwrap();
        b.set_final(b1, 0.0).unwrap();
        b.add_arc(b0, StdArc::new(EPSILON, 3, 0.0, b1)).unwrap();
        b.add_arc(b1, StdArc::new(7, 4, 0.0, b1)).unwrap();

        let mut c = compose(&a, &b).unwrap();
        connect(&mut c);
        // for the string pair (1, 3) exactly one path; disallowed interleavings
        // must not appear as extra successful paths
        let start = c.start().unwrap();
        let singles: usize = c
            .arcs(start)
            .iter()
            .filter(|arc| c.is_final(arc.nextstate))
            .count();
        assert_eq!(singles, 1);
    }

    #[test]
    fn sorted_and_unsorted_matching_agree() {
        let a = linear(&[(1, 2, 1.0), (1, 3, 1.0)]);
        let mut b = StdFst::new();
        let s0 = b.new_state();
        b.set_start(s0).unwrap();
        b.set_final(s0, 0.0).unwrap();
        for (l, w) in [(3u32, 0.5f32), (2, 0.25), (2, 0.75), (1, 1.0)] {
            b.add_arc(s0, StdArc::new(l, l, w, s0)).unwrap();
        }
        let unsorted = compose(&a, &b).unwrap();
        let mut sorted_b = b.clone();
        crate::ops::arc_sort(&mut sorted_b, crate::ops::SortKey::Input);
        let sorted = compose(&a, &sorted_b).unwrap();
        assert_eq!(unsorted, sorted);
    }

    #[test]
    fn symbol_table_mismatch() {
        let mut a = linear(&[(1, 1, 0.0)]);
        let mut b = linear(&[(1, 1, 0.0)]);
        let mut left = SymbolTable::with_epsilon("a");
        left.add_symbol("x");
        let mut right = SymbolTable::with_epsilon("b");
        right.add_symbol("y");
        a.set_output_symbols(Some(std::sync::Arc::new(left)));
        b.set_input_symbols(Some(std::sync::Arc::new(right)));
        assert!(matches!(compose(&a, &b), Err(WfstError::SymbolTableMismatch)));
    }

    #[test]
    fn missing_start_gives_empty_result() {
        let a = StdFst::new();
        let b = linear(&[(1, 1, 0.0)]);
        let c = compose(&a, &b).unwrap();
        assert_eq!(c.num_states(), 0);
    }
}
