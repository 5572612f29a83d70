// Fixed-layout state and arc records of the native format.

use crate::arc::Arc;
use crate::semiring::{Semiring, Weight};
use bytemuck::{Pod, Zeroable};

/// Serialized arc (16 bytes).
///
/// - `ilabel` (u32): input label
/// - `olabel` (u32): output label
/// - `weight` (u32): raw bit pattern of the `f32` weight
/// - `nextstate` (u32): destination state id
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct NativeArc {
    pub ilabel: u32,
    pub olabel: u32,
    pub weight: u32,
    pub nextstate: u32,
}

impl NativeArc {
    pub fn from_arc<S: Semiring>(arc: &Arc<S>) -> Self {
        Self {
            ilabel: arc.ilabel,
            olabel: arc.olabel,
            weight: arc.weight.to_bits(),
            nextstate: arc.nextstate,
        }
    }

    pub fn to_arc<S: Semiring>(self) -> Arc<S> {
        Arc::new(
            self.ilabel,
            self.olabel,
            S::Weight::from_bits(self.weight),
            self.nextstate,
        )
    }
}

/// Serialized state (8 bytes).
///
/// Arcs of all states are stored contiguously; state `i` owns the arc range
/// `first_arc[i]..first_arc[i + 1]`, the last state's range ending at the arc
/// count.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct NativeState {
    /// Raw bit pattern of the final weight.
    pub final_weight: u32,
    pub first_arc: u32,
}

// Static assertions for struct sizes
const _: () = assert!(size_of::<NativeArc>() == 16);
const _: () = assert!(size_of::<NativeState>() == 8);
