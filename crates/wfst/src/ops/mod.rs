//! Algorithms over [`Fst`](crate::Fst).
//!
//! [`arc_sort`] and [`connect`] work in place on a caller-owned automaton and
//! return it for chaining; everything else builds a fresh result and leaves
//! its input untouched.

pub mod arcsort;
pub mod compose;
pub mod connect;
pub mod determinize;
pub mod project;
pub mod reverse;
pub mod rmepsilon;
pub mod shortest;

pub use arcsort::{SortKey, arc_sort};
pub use compose::{FilterState, compose};
pub use connect::{accessible, coaccessible, connect};
pub use determinize::{determinize, determinize_with};
pub use project::{ProjectType, project};
pub use reverse::reverse;
pub use rmepsilon::{rm_epsilon, rm_epsilon_with};
pub use shortest::{n_shortest_paths, n_shortest_paths_with, shortest_distance, shortest_distance_with};
