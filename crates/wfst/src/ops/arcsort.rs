// ArcSort: in-place ordering of each state's outgoing arcs.

use crate::fst::Fst;
use crate::semiring::Semiring;

/// Sort order for [`arc_sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Input label, then output label.
    Input,
    /// Output label, then input label.
    Output,
}

/// Sort the arcs of every state by `key`.
///
/// The sort is stable: arcs with equal label pairs keep their insertion
/// order, so the result is reproducible.
pub fn arc_sort<S: Semiring>(fst: &mut Fst<S>, key: SortKey) -> &mut Fst<S> {
    for s in 0..fst.num_states() as u32 {
        let arcs = fst.arcs_mut(s);
        match key {
            SortKey::Input => arcs.sort_by_key(|a| (a.ilabel, a.olabel)),
            SortKey::Output => arcs.sort_by_key(|a| (a.olabel, a.ilabel)),
        }
    }
    fst
}
