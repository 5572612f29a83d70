// Shared helpers for integration tests: language enumeration and generators.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use proptest::prelude::*;
use wfst::semiring::Weight;
use wfst::{Arc, EPSILON, Fst, Label, Semiring, StateId, TropicalSemiring};

pub type StdFst = Fst<TropicalSemiring>;
pub type StdArc = Arc<TropicalSemiring>;

/// Input and output strings of a path, epsilons removed.
pub type StringPair = (Vec<Label>, Vec<Label>);

/// Directory holding the fixture files.
pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

/// Weighted language of an acyclic automaton: every successful path's string
/// pair with the `plus` of all path weights for it. Pairs whose total weight
/// is `zero()` are dropped.
pub fn language<S: Semiring>(fst: &Fst<S>) -> BTreeMap<StringPair, S::Weight> {
    fn walk<S: Semiring>(
        fst: &Fst<S>,
        s: StateId,
        path: &mut StringPair,
        w: S::Weight,
        depth: usize,
        out: &mut BTreeMap<StringPair, S::Weight>,
    ) {
        assert!(depth <= 256, "language() given a cyclic automaton");
        if fst.is_final(s) {
            let total = S::times(w, fst.final_weight(s));
            let entry = out.entry(path.clone()).or_insert_with(S::zero);
            *entry = S::plus(*entry, total);
        }
        for arc in fst.arcs(s) {
            if arc.ilabel != EPSILON {
                path.0.push(arc.ilabel);
            }
            if arc.olabel != EPSILON {
                path.1.push(arc.olabel);
            }
            walk(fst, arc.nextstate, path, S::times(w, arc.weight), depth + 1, out);
            if arc.olabel != EPSILON {
                path.1.pop();
            }
            if arc.ilabel != EPSILON {
                path.0.pop();
            }
        }
    }

    let mut out = BTreeMap::new();
    if let Some(start) = fst.start() {
        walk(fst, start, &mut (Vec::new(), Vec::new()), S::one(), 0, &mut out);
    }
    out.retain(|_, w| *w != S::zero());
    out
}

/// Compare two weighted languages entry by entry with an absolute tolerance.
pub fn same_language<S: Semiring>(a: &Fst<S>, b: &Fst<S>) -> Result<(), String> {
    let (la, lb) = (language(a), language(b));
    if la.len() != lb.len() || la.keys().zip(lb.keys()).any(|(x, y)| x != y) {
        return Err(format!(
            "string sets differ: {:?} vs {:?}",
            la.keys().collect::<Vec<_>>(),
            lb.keys().collect::<Vec<_>>()
        ));
    }
    for (pair, wa) in &la {
        let wb = lb[pair];
        if !S::approx_eq(*wa, wb, 1e-3) {
            return Err(format!("weight of {pair:?} differs: {wa} vs {wb}"));
        }
    }
    Ok(())
}

/// Sorted path weights (as floats) of an acyclic automaton.
pub fn path_weights<S: Semiring>(fst: &Fst<S>) -> Vec<f32> {
    let mut weights: Vec<f32> = language(fst).values().map(|w| w.to_f32()).collect();
    weights.sort_by(f32::total_cmp);
    weights
}

/// One arc in a generated automaton before normalization.
type RawArc = (usize, usize, Label, Label, u8);

fn build_acyclic(n: usize, arcs: &[RawArc], finals: &[(usize, u8)], acceptor: bool) -> StdFst {
    let mut fst = StdFst::new();
    for _ in 0..n {
        fst.new_state();
    }
    fst.set_start(0).unwrap();
    for &(a, b, il, ol, w) in arcs {
        let src = a % n;
        if src + 1 >= n {
            continue;
        }
        // strictly forward arcs keep the graph acyclic
        let dst = src + 1 + b % (n - src - 1);
        let ol = if acceptor { il } else { ol };
        fst.add_arc(
            src as StateId,
            StdArc::new(il, ol, f32::from(w), dst as StateId),
        )
        .unwrap();
    }
    for &(s, w) in finals {
        fst.set_final((s % n) as StateId, f32::from(w)).unwrap();
    }
    fst
}

/// Acyclic tropical automata with small integer weights, start state 0 and
/// labels in `0..=max_label` (0 being epsilon).
pub fn arb_acyclic(
    max_states: usize,
    max_label: Label,
    acceptor: bool,
) -> impl Strategy<Value = StdFst> {
    (2..=max_states).prop_flat_map(move |n| {
        let arc = (0..n, 0..n, 0..=max_label, 0..=max_label, 0u8..4);
        (
            Just(n),
            prop::collection::vec(arc, 0..3 * n),
            prop::collection::vec((0..n, 0u8..3), 1..3),
        )
            .prop_map(move |(n, arcs, finals)| build_acyclic(n, &arcs, &finals, acceptor))
    })
}

/// Like [`arb_acyclic`] but without epsilon labels.
pub fn arb_epsilon_free(max_states: usize, max_label: Label) -> impl Strategy<Value = StdFst> {
    (2..=max_states).prop_flat_map(move |n| {
        let arc = (0..n, 0..n, 1..=max_label, 1..=max_label, 0u8..4);
        (
            Just(n),
            prop::collection::vec(arc, 0..3 * n),
            prop::collection::vec((0..n, 0u8..3), 1..3),
        )
            .prop_map(|(n, arcs, finals)| build_acyclic(n, &arcs, &finals, false))
    })
}
