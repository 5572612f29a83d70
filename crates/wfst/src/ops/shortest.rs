// Shortest distance and N-best paths.

use crate::WfstError;
use crate::arc::{Arc, Label, StateId};
use crate::config::Limits;
use crate::fst::Fst;
use crate::ops::determinize::determinize_with;
use crate::semiring::Semiring;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Distance from every state to the final states, using [`Limits::default`].
pub fn shortest_distance<S: Semiring>(fst: &Fst<S>) -> Result<Vec<S::Weight>, WfstError> {
    shortest_distance_with(fst, &Limits::default())
}

/// Distance from every state to the final states: for state `q`, the `plus`
/// over all successful paths leaving `q` of the path weight (including the
/// final weight). Unproductive states get `zero()`.
///
/// Computed by queue-based relaxation over the reversed graph, seeded with
/// the final weights. Distances are exact for semirings whose `plus` selects
/// an operand; otherwise relaxation stops once changes fall within
/// `limits.closure_delta`. A state relaxed more often than
/// [`Limits::relaxation_limit`] allows signals a non-converging cycle and
/// yields [`WfstError::ClosureDiverged`].
pub fn shortest_distance_with<S: Semiring>(
    fst: &Fst<S>,
    limits: &Limits,
) -> Result<Vec<S::Weight>, WfstError> {
    let n = fst.num_states();
    let mut incoming: Vec<Vec<(StateId, S::Weight)>> = vec![Vec::new(); n];
    for (s, state) in fst.states_iter() {
        for arc in &state.arcs {
            incoming[arc.nextstate as usize].push((s, arc.weight));
        }
    }

    let limit = limits.relaxation_limit(n);
    let mut dist = vec![S::zero(); n];
    let mut residual = vec![S::zero(); n];
    let mut passes = vec![0usize; n];
    let mut queued = vec![false; n];
    let mut queue = VecDeque::new();
    for (s, state) in fst.states_iter() {
        if state.is_final() {
            dist[s as usize] = state.final_weight;
            residual[s as usize] = state.final_weight;
            queued[s as usize] = true;
            queue.push_back(s);
        }
    }

    while let Some(q) = queue.pop_front() {
        let qi = q as usize;
        queued[qi] = false;
        passes[qi] += 1;
        if passes[qi] > limit {
            tracing::warn!(state = q, "shortest distance diverged");
            return Err(WfstError::ClosureDiverged { state: q });
        }
        let r = std::mem::replace(&mut residual[qi], S::zero());
        for &(p, w) in &incoming[qi] {
            let pi = p as usize;
            let through = S::times(w, r);
            if through == S::zero() {
                continue;
            }
            let updated = S::plus(dist[pi], through);
            if limits.relaxes::<S>(dist[pi], updated) {
                dist[pi] = updated;
                residual[pi] = S::plus(residual[pi], through);
                if !queued[pi] {
                    queued[pi] = true;
                    queue.push_back(p);
                }
            }
        }
    }
    Ok(dist)
}

/// A partial path in the search tree. `state == None` marks a completed path
/// whose last step took the final weight of the parent's state.
struct Item<W> {
    state: Option<StateId>,
    cost: W,
    parent: Option<usize>,
    ilabel: Label,
    olabel: Label,
    weight: W,
}

/// Heap entry ordered by priority, then by creation order.
struct Entry<S: Semiring> {
    priority: S::Weight,
    seq: usize,
}

impl<S: Semiring> PartialEq for Entry<S> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<S: Semiring> Eq for Entry<S> {}

impl<S: Semiring> PartialOrd for Entry<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: Semiring> Ord for Entry<S> {
    // BinaryHeap pops the maximum: better weight and earlier seq rank higher.
    fn cmp(&self, other: &Self) -> Ordering {
        S::compare(other.priority, self.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// N best paths using [`Limits::default`].
pub fn n_shortest_paths<S: Semiring>(
    fst: &Fst<S>,
    n: usize,
    determinize: bool,
) -> Result<Fst<S>, WfstError> {
    n_shortest_paths_with(fst, n, determinize, &Limits::default())
}

/// Keep the `n` successful paths of lowest weight.
///
/// The result is a tree-shaped automaton whose successful paths are exactly
/// the selected ones. Paths are popped best-first from a priority queue keyed
/// on `times(prefix weight, distance to final)`; equal priorities are resolved
/// by creation order, which follows arc insertion order at every state, so
/// ties are reproducible. Each state is expanded at most `n` times.
///
/// With `determinize`, the input is determinized first so that the selected
/// paths carry distinct input strings.
///
/// Requires a semiring whose `plus` selects one operand
/// ([`Semiring::IDEMPOTENT_PATH`]); other semirings are rejected with
/// [`WfstError::UnorderedSemiring`]. An automaton without successful paths
/// yields an empty result. More than `limits.max_queue_pops` pops abort with
/// [`WfstError::UndeterminizableInput`].
pub fn n_shortest_paths_with<S: Semiring>(
    fst: &Fst<S>,
    n: usize,
    determinize: bool,
    limits: &Limits,
) -> Result<Fst<S>, WfstError> {
    if !S::IDEMPOTENT_PATH {
        return Err(WfstError::UnorderedSemiring(S::name()));
    }

    let mut res = Fst::<S>::new();
    res.set_input_symbols(fst.input_symbols().cloned());
    res.set_output_symbols(fst.output_symbols().cloned());

    let source: Cow<'_, Fst<S>> = if determinize {
        Cow::Owned(determinize_with(fst, limits)?)
    } else {
        Cow::Borrowed(fst)
    };
    let Some(start) = source.start() else {
        return Ok(res);
    };
    if n == 0 {
        return Ok(res);
    }
    let dist = shortest_distance_with(&source, limits)?;
    if dist[start as usize] == S::zero() {
        return Ok(res);
    }

    let mut items: Vec<Item<S::Weight>> = vec![Item {
        state: Some(start),
        cost: S::one(),
        parent: None,
        ilabel: 0,
        olabel: 0,
        weight: S::one(),
    }];
    let mut heap: BinaryHeap<Entry<S>> = BinaryHeap::new();
    heap.push(Entry {
        priority: dist[start as usize],
        seq: 0,
    });

    let mut pops_per_state = vec![0usize; source.num_states()];
    let mut accepted: Vec<usize> = Vec::new();
    let mut pops = 0usize;

    while let Some(Entry { seq, .. }) = heap.pop() {
        pops += 1;
        if pops > limits.max_queue_pops {
            tracing::warn!(limit = limits.max_queue_pops, "n-shortest-paths pop limit reached");
            return Err(WfstError::UndeterminizableInput {
                limit: limits.max_queue_pops,
            });
        }
        let Some(q) = items[seq].state else {
            accepted.push(seq);
            if accepted.len() == n {
                break;
            }
            continue;
        };
        pops_per_state[q as usize] += 1;
        if pops_per_state[q as usize] > n {
            continue;
        }

        let cost = items[seq].cost;
        for arc in source.arcs(q) {
            let d = dist[arc.nextstate as usize];
            if d == S::zero() {
                continue;
            }
            let next_cost = S::times(cost, arc.weight);
            heap.push(Entry {
                priority: S::times(next_cost, d),
                seq: items.len(),
            });
            items.push(Item {
                state: Some(arc.nextstate),
                cost: next_cost,
                parent: Some(seq),
                ilabel: arc.ilabel,
                olabel: arc.olabel,
                weight: arc.weight,
            });
        }
        let fw = source.final_weight(q);
        if fw != S::zero() {
            let done = S::times(cost, fw);
            heap.push(Entry {
                priority: done,
                seq: items.len(),
            });
            items.push(Item {
                state: None,
                cost: done,
                parent: Some(seq),
                ilabel: 0,
                olabel: 0,
                weight: fw,
            });
        }
    }

    // Keep only the items on accepted paths, numbered in creation order.
    let mut keep = vec![false; items.len()];
    let mut is_accepted = vec![false; items.len()];
    for &done in &accepted {
        is_accepted[done] = true;
        let mut cursor = items[done].parent;
        while let Some(i) = cursor {
            if keep[i] {
                break;
            }
            keep[i] = true;
            cursor = items[i].parent;
        }
    }
    let mut remap: Vec<Option<StateId>> = vec![None; items.len()];
    for (i, slot) in remap.iter_mut().enumerate() {
        if keep[i] {
            *slot = Some(res.new_state());
        }
    }
    for (i, item) in items.iter().enumerate() {
        let Some(parent) = item.parent else {
            continue;
        };
        let Some(from) = remap[parent] else {
            continue;
        };
        match (item.state, remap[i]) {
            (Some(_), Some(to)) => {
                res.add_arc(from, Arc::new(item.ilabel, item.olabel, item.weight, to))?
            }
            (None, _) if is_accepted[i] => res.set_final(from, item.weight)?,
            _ => {}
        }
    }
    if let Some(root) = remap[0] {
        res.set_start(root)?;
    }

    tracing::debug!(
        requested = n,
        found = accepted.len(),
        states = res.num_states(),
        "n-shortest-paths"
    );
    Ok(res)
}
