// Fst container: state arena, start state, symbol tables.

use crate::WfstError;
use crate::arc::{Arc, EPSILON, Label, StateId};
use crate::semiring::{
    LogSemiring, ProbabilitySemiring, Semiring, SemiringKind, TropicalSemiring, Weight,
};
use crate::state::State;
use crate::symbols::SymbolTableRef;
use hashbrown::HashSet;

/// OpenFST property bits recorded in binary headers.
pub mod props {
    pub const EXPANDED: u64 = 0x1;
    pub const MUTABLE: u64 = 0x2;
    pub const ACCEPTOR: u64 = 0x1_0000;
    pub const NOT_ACCEPTOR: u64 = 0x2_0000;
    pub const I_DETERMINISTIC: u64 = 0x4_0000;
    pub const NON_I_DETERMINISTIC: u64 = 0x8_0000;
    pub const EPSILONS: u64 = 0x40_0000;
    pub const NO_EPSILONS: u64 = 0x80_0000;
    pub const I_EPSILONS: u64 = 0x100_0000;
    pub const NO_I_EPSILONS: u64 = 0x200_0000;
    pub const O_EPSILONS: u64 = 0x400_0000;
    pub const NO_O_EPSILONS: u64 = 0x800_0000;
    pub const I_LABEL_SORTED: u64 = 0x1000_0000;
    pub const NOT_I_LABEL_SORTED: u64 = 0x2000_0000;
    pub const O_LABEL_SORTED: u64 = 0x4000_0000;
    pub const NOT_O_LABEL_SORTED: u64 = 0x8000_0000;
    pub const WEIGHTED: u64 = 0x1_0000_0000;
    pub const UNWEIGHTED: u64 = 0x2_0000_0000;
}

/// Weighted finite-state transducer over the semiring `S`.
///
/// States live in a dense arena indexed by [`StateId`]; arcs refer to their
/// destination by id, so cycles need no shared ownership. Every mutation
/// validates state references eagerly, which keeps the graph consistent at
/// all times.
#[derive(Debug, Clone)]
pub struct Fst<S: Semiring> {
    semiring: S,
    states: Vec<State<S>>,
    start: Option<StateId>,
    isymbols: Option<SymbolTableRef>,
    osymbols: Option<SymbolTableRef>,
    /// Property word read from an interchange header; dropped on mutation.
    stored_properties: Option<u64>,
}

impl<S: Semiring> Default for Fst<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Semiring> Fst<S> {
    /// Create an empty automaton with no states and no start state.
    pub fn new() -> Self {
        Self {
            semiring: S::default(),
            states: Vec::new(),
            start: None,
            isymbols: None,
            osymbols: None,
            stored_properties: None,
        }
    }

    pub fn semiring(&self) -> S {
        self.semiring
    }

    pub fn reserve_states(&mut self, additional: usize) {
        self.states.reserve(additional);
    }

    /// Create a fresh, non-final state without arcs.
    pub fn new_state(&mut self) -> StateId {
        self.stored_properties = None;
        let id = self.states.len() as StateId;
        self.states.push(State::new());
        id
    }

    /// Append `arc` to the arcs leaving `state`.
    pub fn add_arc(&mut self, state: StateId, arc: Arc<S>) -> Result<(), WfstError> {
        self.check_state(state)?;
        self.check_state(arc.nextstate)?;
        if !S::is_member(arc.weight) {
            return Err(WfstError::InvalidWeight(arc.weight.to_f32()));
        }
        self.stored_properties = None;
        self.states[state as usize].arcs.push(arc);
        Ok(())
    }

    pub fn set_final(&mut self, state: StateId, weight: S::Weight) -> Result<(), WfstError> {
        self.check_state(state)?;
        if !S::is_member(weight) {
            return Err(WfstError::InvalidWeight(weight.to_f32()));
        }
        self.stored_properties = None;
        self.states[state as usize].final_weight = weight;
        Ok(())
    }

    pub fn set_start(&mut self, state: StateId) -> Result<(), WfstError> {
        self.check_state(state)?;
        self.stored_properties = None;
        self.start = Some(state);
        Ok(())
    }

    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Total number of arcs over all states.
    pub fn num_arcs(&self) -> usize {
        self.states.iter().map(State::num_arcs).sum()
    }

    pub fn state(&self, state: StateId) -> Option<&State<S>> {
        self.states.get(state as usize)
    }

    pub fn states(&self) -> &[State<S>] {
        &self.states
    }

    /// Arcs leaving `state`; empty for unknown ids.
    pub fn arcs(&self, state: StateId) -> &[Arc<S>] {
        self.states
            .get(state as usize)
            .map(|s| s.arcs.as_slice())
            .unwrap_or(&[])
    }

    /// Final weight of `state`; `zero()` for non-final or unknown ids.
    pub fn final_weight(&self, state: StateId) -> S::Weight {
        self.states
            .get(state as usize)
            .map(|s| s.final_weight)
            .unwrap_or_else(S::zero)
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.final_weight(state) != S::zero()
    }

    pub fn delete_arcs(&mut self, state: StateId) -> Result<(), WfstError> {
        self.check_state(state)?;
        self.stored_properties = None;
        self.states[state as usize].arcs.clear();
        Ok(())
    }

    /// Iterator over `(id, state)` pairs.
    pub fn states_iter(&self) -> impl Iterator<Item = (StateId, &State<S>)> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (i as StateId, s))
    }

    pub fn input_symbols(&self) -> Option<&SymbolTableRef> {
        self.isymbols.as_ref()
    }

    pub fn output_symbols(&self) -> Option<&SymbolTableRef> {
        self.osymbols.as_ref()
    }

    pub fn set_input_symbols(&mut self, symbols: Option<SymbolTableRef>) {
        self.isymbols = symbols;
    }

    pub fn set_output_symbols(&mut self, symbols: Option<SymbolTableRef>) {
        self.osymbols = symbols;
    }

    /// Property word stored in the header this automaton was imported from,
    /// if it has not been modified since.
    pub fn stored_properties(&self) -> Option<u64> {
        self.stored_properties
    }

    pub(crate) fn set_stored_properties(&mut self, properties: u64) {
        self.stored_properties = Some(properties);
    }

    /// Mutable access to a state's arcs for in-place algorithms.
    pub(crate) fn arcs_mut(&mut self, state: StateId) -> &mut Vec<Arc<S>> {
        self.stored_properties = None;
        &mut self.states[state as usize].arcs
    }

    /// Replace the whole arena. Callers guarantee every reference is valid.
    pub(crate) fn replace_states(&mut self, states: Vec<State<S>>, start: Option<StateId>) {
        self.stored_properties = None;
        self.states = states;
        self.start = start;
    }

    fn check_state(&self, state: StateId) -> Result<(), WfstError> {
        if (state as usize) < self.states.len() {
            Ok(())
        } else {
            Err(WfstError::InvalidReference {
                state,
                num_states: self.states.len(),
            })
        }
    }

    /// True when every arc carries the same label on both tapes.
    pub fn is_acceptor(&self) -> bool {
        self.states
            .iter()
            .all(|s| s.arcs.iter().all(|a| a.ilabel == a.olabel))
    }

    /// True when no state has two arcs with the same input label.
    pub fn is_input_deterministic(&self) -> bool {
        let mut seen: HashSet<Label> = HashSet::new();
        self.states.iter().all(|s| {
            seen.clear();
            s.arcs.iter().all(|a| seen.insert(a.ilabel))
        })
    }

    /// True when some arc has epsilon on both tapes.
    pub fn has_epsilons(&self) -> bool {
        self.states.iter().any(|s| s.num_epsilons() > 0)
    }

    /// True when every state's arcs are sorted by input label.
    pub fn is_ilabel_sorted(&self) -> bool {
        self.states
            .iter()
            .all(|s| s.arcs.windows(2).all(|w| w[0].ilabel <= w[1].ilabel))
    }

    pub fn is_olabel_sorted(&self) -> bool {
        self.states
            .iter()
            .all(|s| s.arcs.windows(2).all(|w| w[0].olabel <= w[1].olabel))
    }

    /// Compute the OpenFST property word for this automaton.
    pub fn properties(&self) -> u64 {
        let mut bits = props::EXPANDED | props::MUTABLE;
        let pick = |cond: bool, yes: u64, no: u64| if cond { yes } else { no };

        let mut iepsilons = false;
        let mut oepsilons = false;
        let mut epsilons = false;
        let mut weighted = false;
        for s in &self.states {
            if s.final_weight != S::zero() && s.final_weight != S::one() {
                weighted = true;
            }
            for a in &s.arcs {
                iepsilons |= a.ilabel == EPSILON;
                oepsilons |= a.olabel == EPSILON;
                epsilons |= a.is_epsilon();
                weighted |= a.weight != S::one();
            }
        }

        bits |= pick(self.is_acceptor(), props::ACCEPTOR, props::NOT_ACCEPTOR);
        bits |= pick(
            self.is_input_deterministic(),
            props::I_DETERMINISTIC,
            props::NON_I_DETERMINISTIC,
        );
        bits |= pick(epsilons, props::EPSILONS, props::NO_EPSILONS);
        bits |= pick(iepsilons, props::I_EPSILONS, props::NO_I_EPSILONS);
        bits |= pick(oepsilons, props::O_EPSILONS, props::NO_O_EPSILONS);
        bits |= pick(
            self.is_ilabel_sorted(),
            props::I_LABEL_SORTED,
            props::NOT_I_LABEL_SORTED,
        );
        bits |= pick(
            self.is_olabel_sorted(),
            props::O_LABEL_SORTED,
            props::NOT_O_LABEL_SORTED,
        );
        bits |= pick(weighted, props::WEIGHTED, props::UNWEIGHTED);
        bits
    }
}

/// Structural equality: same start state, same number of states, and per
/// state the same final weight and the same multiset of arcs. Symbol tables
/// are not compared.
impl<S: Semiring> PartialEq for Fst<S> {
    fn eq(&self, other: &Self) -> bool {
        if self.start != other.start || self.states.len() != other.states.len() {
            return false;
        }
        self.states.iter().zip(&other.states).all(|(a, b)| {
            if a.final_weight.key_bits() != b.final_weight.key_bits()
                || a.arcs.len() != b.arcs.len()
            {
                return false;
            }
            let mut ka: Vec<_> = a.arcs.iter().map(Arc::sort_key).collect();
            let mut kb: Vec<_> = b.arcs.iter().map(Arc::sort_key).collect();
            ka.sort_unstable();
            kb.sort_unstable();
            ka == kb
        })
    }
}

/// An automaton whose semiring is only known at runtime, e.g. after loading
/// a file.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyFst {
    Tropical(Fst<TropicalSemiring>),
    Log(Fst<LogSemiring>),
    Probability(Fst<ProbabilitySemiring>),
}

impl AnyFst {
    pub fn kind(&self) -> SemiringKind {
        match self {
            AnyFst::Tropical(_) => SemiringKind::Tropical,
            AnyFst::Log(_) => SemiringKind::Log,
            AnyFst::Probability(_) => SemiringKind::Probability,
        }
    }

    pub fn num_states(&self) -> usize {
        match self {
            AnyFst::Tropical(f) => f.num_states(),
            AnyFst::Log(f) => f.num_states(),
            AnyFst::Probability(f) => f.num_states(),
        }
    }

    /// Compose two runtime-typed automata. Both must use the same semiring.
    pub fn compose(&self, other: &AnyFst) -> Result<AnyFst, WfstError> {
        use crate::ops::compose::compose;
        match (self, other) {
            (AnyFst::Tropical(a), AnyFst::Tropical(b)) => compose(a, b).map(AnyFst::Tropical),
            (AnyFst::Log(a), AnyFst::Log(b)) => compose(a, b).map(AnyFst::Log),
            (AnyFst::Probability(a), AnyFst::Probability(b)) => {
                compose(a, b).map(AnyFst::Probability)
            }
            _ => Err(WfstError::SemiringMismatch {
                expected: self.kind().to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }

    pub fn into_tropical(self) -> Result<Fst<TropicalSemiring>, WfstError> {
        match self {
            AnyFst::Tropical(f) => Ok(f),
            other => Err(mismatch(SemiringKind::Tropical, other.kind())),
        }
    }

    pub fn into_log(self) -> Result<Fst<LogSemiring>, WfstError> {
        match self {
            AnyFst::Log(f) => Ok(f),
            other => Err(mismatch(SemiringKind::Log, other.kind())),
        }
    }

    pub fn into_probability(self) -> Result<Fst<ProbabilitySemiring>, WfstError> {
        match self {
            AnyFst::Probability(f) => Ok(f),
            other => Err(mismatch(SemiringKind::Probability, other.kind())),
        }
    }
}

impl From<Fst<TropicalSemiring>> for AnyFst {
    fn from(fst: Fst<TropicalSemiring>) -> Self {
        AnyFst::Tropical(fst)
    }
}

impl From<Fst<LogSemiring>> for AnyFst {
    fn from(fst: Fst<LogSemiring>) -> Self {
        AnyFst::Log(fst)
    }
}

impl From<Fst<ProbabilitySemiring>> for AnyFst {
    fn from(fst: Fst<ProbabilitySemiring>) -> Self {
        AnyFst::Probability(fst)
    }
}

pub(crate) fn mismatch(expected: SemiringKind, actual: SemiringKind) -> WfstError {
    WfstError::SemiringMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}
