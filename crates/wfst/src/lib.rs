//! Weighted finite-state transducer toolkit.
//!
//! This crate provides a generic weighted automaton model together with the
//! classic structural algorithms over it, and codecs for the OpenFST vector
//! binary format, the AT&T text format and a native fast-reload format.
//!
//! # Architecture
//!
//! - [`semiring`] -- Weight algebras (tropical, log, probability)
//! - [`symbols`] -- Shared, append-only symbol tables
//! - [`arc`] / [`state`] -- Graph primitives stored in an index arena
//! - [`fst`] -- The [`Fst`] container and the runtime-typed [`AnyFst`]
//! - [`config`] -- Traversal limits shared by the algorithms
//! - [`ops`] -- ArcSort, Connect, Project, Reverse, RmEpsilon, Determinize,
//!   Compose and NShortestPaths
//! - [`io`] -- OpenFST binary interchange, AT&T text and native persistence

pub mod arc;
pub mod config;
pub mod fst;
pub mod io;
pub mod ops;
pub mod semiring;
pub mod state;
pub mod symbols;

pub use arc::{Arc, EPSILON, Label, NO_STATE, StateId};
pub use config::Limits;
pub use fst::{AnyFst, Fst};
pub use io::{load, load_any, save};
pub use semiring::{LogSemiring, ProbabilitySemiring, Semiring, SemiringKind, TropicalSemiring};
pub use state::State;
pub use symbols::SymbolTable;

/// Error type for graph construction, algorithms and codecs.
#[derive(Debug, thiserror::Error)]
pub enum WfstError {
    #[error("invalid state reference {state} (fst has {num_states} states)")]
    InvalidReference { state: StateId, num_states: usize },
    #[error("weight {0} is not a member of the semiring")]
    InvalidWeight(f32),
    #[error("format error: {0}")]
    Format(String),
    #[error("truncated input: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unsupported format version {found} (supported: {supported})")]
    UnsupportedVersion { found: i64, supported: i64 },
    #[error("semiring mismatch: expected {expected}, got {actual}")]
    SemiringMismatch { expected: String, actual: String },
    #[error("symbol table mismatch: output symbols of the left fst differ from input symbols of the right fst")]
    SymbolTableMismatch,
    #[error("input is not determinizable within the limit of {limit} states")]
    UndeterminizableInput { limit: usize },
    #[error("epsilon closure of state {state} did not converge")]
    ClosureDiverged { state: StateId },
    #[error("semiring {0} has no path order usable for shortest paths")]
    UnorderedSemiring(&'static str),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
