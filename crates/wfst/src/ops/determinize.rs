// Determinize: weighted subset construction over the input tape.

use crate::WfstError;
use crate::arc::{Arc, Label, StateId};
use crate::config::Limits;
use crate::fst::Fst;
use crate::semiring::{Semiring, Weight};
use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;

/// A determinized state: original states paired with residual weights, in the
/// order they were first reached.
type Subset<W> = Vec<(StateId, W)>;

/// Hashable, order-independent form of a subset.
fn normalize<W: Weight>(subset: &Subset<W>) -> Vec<(StateId, u32)> {
    let mut key: Vec<(StateId, u32)> = subset.iter().map(|&(s, w)| (s, w.key_bits())).collect();
    key.sort_unstable();
    key
}

/// Determinize using [`Limits::default`].
pub fn determinize<S: Semiring>(fst: &Fst<S>) -> Result<Fst<S>, WfstError> {
    determinize_with(fst, &Limits::default())
}

/// Weighted subset construction.
///
/// The automaton is determinized as an acceptor over its input labels: each
/// result arc carries its input label on both tapes. For a subset `P` and a
/// label `x` on some member arc, the leaving weight is
/// `w' = plus(times(u, w))` over all matching arcs `(q, u) in P, q -x/w-> q'`,
/// and each destination `q'` gets residual `plus(divide(times(u, w), w'))`.
/// Subsets are memoized on their normalized content, so a subset reached
/// twice maps to one result state. Labels are expanded in order of first
/// appearance and new subsets numbered breadth-first, which fixes the output
/// numbering.
///
/// Epsilon input labels are treated as ordinary symbols; run
/// [`rm_epsilon`](crate::ops::rm_epsilon) first. Inputs that are not
/// determinizable keep producing new residuals; once more than
/// `limits.max_states` states exist the construction stops with
/// [`WfstError::UndeterminizableInput`].
pub fn determinize_with<S: Semiring>(fst: &Fst<S>, limits: &Limits) -> Result<Fst<S>, WfstError> {
    let mut res = Fst::<S>::new();
    res.set_input_symbols(fst.input_symbols().cloned());
    res.set_output_symbols(fst.output_symbols().cloned());

    let Some(start) = fst.start() else {
        return Ok(res);
    };

    let mut memo: HashMap<Vec<(StateId, u32)>, StateId> = HashMap::new();
    let mut queue: VecDeque<(StateId, Subset<S::Weight>)> = VecDeque::new();

    let initial: Subset<S::Weight> = vec![(start, S::one())];
    let s0 = res.new_state();
    res.set_start(s0)?;
    res.set_final(s0, subset_final(fst, &initial))?;
    memo.insert(normalize(&initial), s0);
    queue.push_back((s0, initial));

    let mut labels: Vec<Label> = Vec::new();
    let mut seen_labels: HashSet<Label> = HashSet::new();

    while let Some((current, subset)) = queue.pop_front() {
        labels.clear();
        seen_labels.clear();
        for &(q, _) in &subset {
            for arc in fst.arcs(q) {
                if seen_labels.insert(arc.ilabel) {
                    labels.push(arc.ilabel);
                }
            }
        }

        for &label in &labels {
            let mut leaving = S::zero();
            for &(q, u) in &subset {
                for arc in fst.arcs(q).iter().filter(|a| a.ilabel == label) {
                    leaving = S::plus(leaving, S::times(u, arc.weight));
                }
            }

            let mut next: Subset<S::Weight> = Vec::new();
            let mut slots: HashMap<StateId, usize> = HashMap::new();
            for &(q, u) in &subset {
                for arc in fst.arcs(q).iter().filter(|a| a.ilabel == label) {
                    let residual = S::divide(S::times(u, arc.weight), leaving);
                    match slots.get(&arc.nextstate) {
                        Some(&i) => next[i].1 = S::plus(next[i].1, residual),
                        None => {
                            slots.insert(arc.nextstate, next.len());
                            next.push((arc.nextstate, residual));
                        }
                    }
                }
            }

            let key = normalize(&next);
            let dest = match memo.get(&key) {
                Some(&d) => d,
                None => {
                    if res.num_states() >= limits.max_states {
                        tracing::warn!(limit = limits.max_states, "determinize state limit reached");
                        return Err(WfstError::UndeterminizableInput {
                            limit: limits.max_states,
                        });
                    }
                    let d = res.new_state();
                    res.set_final(d, subset_final(fst, &next))?;
                    memo.insert(key, d);
                    queue.push_back((d, next));
                    d
                }
            };
            res.add_arc(current, Arc::new(label, label, leaving, dest))?;
        }
    }

    tracing::debug!(
        input_states = fst.num_states(),
        states = res.num_states(),
        arcs = res.num_arcs(),
        "determinize"
    );
    Ok(res)
}

/// `plus` over `times(residual, final)` of the final members.
fn subset_final<S: Semiring>(fst: &Fst<S>, subset: &Subset<S::Weight>) -> S::Weight {
    subset
        .iter()
        .filter(|&&(q, _)| fst.is_final(q))
        .fold(S::zero(), |acc, &(q, u)| {
            S::plus(acc, S::times(u, fst.final_weight(q)))
        })
}
