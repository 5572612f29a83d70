// Connect: trim states that are not both accessible and co-accessible.

use crate::arc::StateId;
use crate::fst::Fst;
use crate::semiring::Semiring;
use crate::state::State;
use std::collections::VecDeque;

/// States reachable from the start state.
pub fn accessible<S: Semiring>(fst: &Fst<S>) -> Vec<bool> {
    let n = fst.num_states();
    let mut reached = vec![false; n];
    let mut queue = VecDeque::new();
    if let Some(start) = fst.start() {
        reached[start as usize] = true;
        queue.push_back(start);
    }
    while let Some(s) = queue.pop_front() {
        for arc in fst.arcs(s) {
            let d = arc.nextstate as usize;
            if !reached[d] {
                reached[d] = true;
                queue.push_back(arc.nextstate);
            }
        }
    }
    reached
}

/// States from which some final state is reachable.
pub fn coaccessible<S: Semiring>(fst: &Fst<S>) -> Vec<bool> {
    let n = fst.num_states();
    let mut incoming: Vec<Vec<StateId>> = vec![Vec::new(); n];
    for (s, state) in fst.states_iter() {
        for arc in &state.arcs {
            incoming[arc.nextstate as usize].push(s);
        }
    }

    let mut reached = vec![false; n];
    let mut queue = VecDeque::new();
    for (s, state) in fst.states_iter() {
        if state.is_final() {
            reached[s as usize] = true;
            queue.push_back(s);
        }
    }
    while let Some(s) = queue.pop_front() {
        for &p in &incoming[s as usize] {
            if !reached[p as usize] {
                reached[p as usize] = true;
                queue.push_back(p);
            }
        }
    }
    reached
}

/// Remove every state that is not on some path from the start state to a
/// final state, together with its arcs. Surviving states are renumbered
/// densely in their original order.
///
/// Without a start state, or without any successful path, the result has no
/// states at all.
pub fn connect<S: Semiring>(fst: &mut Fst<S>) -> &mut Fst<S> {
    let access = accessible(fst);
    let coaccess = coaccessible(fst);

    let mut remap: Vec<Option<StateId>> = vec![None; fst.num_states()];
    let mut next_id: StateId = 0;
    for (s, slot) in remap.iter_mut().enumerate() {
        if access[s] && coaccess[s] {
            *slot = Some(next_id);
            next_id += 1;
        }
    }

    let start = fst.start().and_then(|s| remap[s as usize]);
    let mut states: Vec<State<S>> = Vec::with_capacity(next_id as usize);
    if start.is_some() {
        for (s, state) in fst.states_iter() {
            if remap[s as usize].is_none() {
                continue;
            }
            let mut kept = State {
                final_weight: state.final_weight,
                arcs: Vec::with_capacity(state.arcs.len()),
            };
            for arc in &state.arcs {
                if let Some(d) = remap[arc.nextstate as usize] {
                    let mut arc = *arc;
                    arc.nextstate = d;
                    kept.arcs.push(arc);
                }
            }
            states.push(kept);
        }
    }

    tracing::debug!(
        before = fst.num_states(),
        after = states.len(),
        "connect"
    );
    fst.replace_states(states, start);
    fst
}
