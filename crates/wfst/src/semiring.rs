// Weight algebras: the semiring trait and its concrete instances.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 32-bit weight value stored on arcs and final states.
///
/// Weights are plain floats in every supported algebra. The raw bit pattern is
/// exposed so that weights can be written to binary formats without loss, and
/// a normalized pattern so that equal weights hash equally (subset
/// construction memoizes on it). Text codecs parse them with `FromStr`.
pub trait Weight:
    Copy + PartialEq + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static
{
    fn to_bits(self) -> u32;
    fn from_bits(bits: u32) -> Self;
    fn to_f32(self) -> f32;

    /// Bit pattern identical for all weights comparing equal.
    fn key_bits(self) -> u32;
}

impl Weight for f32 {
    #[inline]
    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }

    #[inline]
    fn key_bits(self) -> u32 {
        // -0.0 == 0.0
        if self == 0.0 { 0 } else { f32::to_bits(self) }
    }

    #[inline]
    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

/// Runtime tag identifying a semiring in serialized data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemiringKind {
    Tropical,
    Log,
    Probability,
}

impl SemiringKind {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            SemiringKind::Tropical => "tropical",
            SemiringKind::Log => "log",
            SemiringKind::Probability => "probability",
        }
    }

    /// Arc type string used in the OpenFST binary header.
    pub fn arc_type(self) -> &'static str {
        match self {
            SemiringKind::Tropical => "standard",
            SemiringKind::Log => "log",
            SemiringKind::Probability => "probability",
        }
    }

    /// Resolve an OpenFST arc type string. `"tropical"` is accepted as an alias.
    pub fn from_arc_type(arc_type: &str) -> Option<Self> {
        match arc_type {
            "standard" | "tropical" => Some(SemiringKind::Tropical),
            "log" => Some(SemiringKind::Log),
            "probability" => Some(SemiringKind::Probability),
            _ => None,
        }
    }

    /// Numeric tag used in the native format header.
    pub fn tag(self) -> u32 {
        match self {
            SemiringKind::Tropical => 1,
            SemiringKind::Log => 2,
            SemiringKind::Probability => 3,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(SemiringKind::Tropical),
            2 => Some(SemiringKind::Log),
            3 => Some(SemiringKind::Probability),
            _ => None,
        }
    }
}

impl fmt::Display for SemiringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A weight algebra `(W, plus, times, zero, one)`.
///
/// Implementations must keep `plus` associative and commutative, `times`
/// associative and distributive over `plus`, with `zero` the identity of
/// `plus` (and annihilator of `times`) and `one` the identity of `times`.
///
/// All operations are associated functions: every algorithm in this crate is
/// generic over `S: Semiring` and resolved at compile time. The semiring value
/// itself is zero-sized and only carried by [`crate::Fst`] as a type marker.
pub trait Semiring: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    type Weight: Weight;

    const KIND: SemiringKind;

    /// True when `plus(a, b)` always returns one of `a` or `b`. Shortest-path
    /// algorithms require this.
    const IDEMPOTENT_PATH: bool = false;

    fn zero() -> Self::Weight;
    fn one() -> Self::Weight;
    fn plus(a: Self::Weight, b: Self::Weight) -> Self::Weight;
    fn times(a: Self::Weight, b: Self::Weight) -> Self::Weight;

    /// Left inverse of `times`: `times(b, divide(a, b)) == a` for non-zero `b`.
    fn divide(a: Self::Weight, b: Self::Weight) -> Self::Weight;

    /// Weight carried by an arc after reversal.
    fn reverse(w: Self::Weight) -> Self::Weight {
        w
    }

    fn is_member(w: Self::Weight) -> bool;

    /// Total order on weights: `Less` means `a` is the better (cheaper) weight.
    fn compare(a: Self::Weight, b: Self::Weight) -> Ordering;

    fn approx_eq(a: Self::Weight, b: Self::Weight, delta: f32) -> bool {
        let (a, b) = (a.to_f32(), b.to_f32());
        a == b || (a - b).abs() <= delta
    }

    fn name() -> &'static str {
        Self::KIND.name()
    }
}

/// Min-plus semiring over costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TropicalSemiring;

impl Semiring for TropicalSemiring {
    type Weight = f32;
    const KIND: SemiringKind = SemiringKind::Tropical;
    const IDEMPOTENT_PATH: bool = true;

    #[inline]
    fn zero() -> f32 {
        f32::INFINITY
    }

    #[inline]
    fn one() -> f32 {
        0.0
    }

    #[inline]
    fn plus(a: f32, b: f32) -> f32 {
        if a <= b { a } else { b }
    }

    #[inline]
    fn times(a: f32, b: f32) -> f32 {
        if a == f32::INFINITY || b == f32::INFINITY {
            f32::INFINITY
        } else {
            a + b
        }
    }

    #[inline]
    fn divide(a: f32, b: f32) -> f32 {
        if a == f32::INFINITY || b == f32::INFINITY {
            f32::INFINITY
        } else {
            a - b
        }
    }

    #[inline]
    fn is_member(w: f32) -> bool {
        !w.is_nan() && w != f32::NEG_INFINITY
    }

    #[inline]
    fn compare(a: f32, b: f32) -> Ordering {
        a.total_cmp(&b)
    }
}

/// Log semiring over negative log probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSemiring;

impl Semiring for LogSemiring {
    type Weight = f32;
    const KIND: SemiringKind = SemiringKind::Log;

    #[inline]
    fn zero() -> f32 {
        f32::INFINITY
    }

    #[inline]
    fn one() -> f32 {
        0.0
    }

    fn plus(a: f32, b: f32) -> f32 {
        if a == f32::INFINITY {
            return b;
        }
        if b == f32::INFINITY {
            return a;
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let diff = f64::from(hi - lo);
        (f64::from(lo) - (-diff).exp().ln_1p()) as f32
    }

    #[inline]
    fn times(a: f32, b: f32) -> f32 {
        TropicalSemiring::times(a, b)
    }

    #[inline]
    fn divide(a: f32, b: f32) -> f32 {
        TropicalSemiring::divide(a, b)
    }

    #[inline]
    fn is_member(w: f32) -> bool {
        !w.is_nan() && w != f32::NEG_INFINITY
    }

    #[inline]
    fn compare(a: f32, b: f32) -> Ordering {
        a.total_cmp(&b)
    }
}

/// Sum-product semiring over probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbabilitySemiring;

impl Semiring for ProbabilitySemiring {
    type Weight = f32;
    const KIND: SemiringKind = SemiringKind::Probability;

    #[inline]
    fn zero() -> f32 {
        0.0
    }

    #[inline]
    fn one() -> f32 {
        1.0
    }

    #[inline]
    fn plus(a: f32, b: f32) -> f32 {
        a + b
    }

    #[inline]
    fn times(a: f32, b: f32) -> f32 {
        a * b
    }

    #[inline]
    fn divide(a: f32, b: f32) -> f32 {
        if b == 0.0 { 0.0 } else { a / b }
    }

    #[inline]
    fn is_member(w: f32) -> bool {
        !w.is_nan() && w >= 0.0
    }

    /// Higher probability is the better weight.
    #[inline]
    fn compare(a: f32, b: f32) -> Ordering {
        b.total_cmp(&a)
    }

    fn approx_eq(a: f32, b: f32, delta: f32) -> bool {
        // Relative tolerance: probabilities shrink multiplicatively.
        a == b || (a - b).abs() <= delta * a.abs().max(b.abs()).max(f32::MIN_POSITIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tropical_identities() {
        let w = 3.5f32;
        assert_eq!(TropicalSemiring::plus(TropicalSemiring::zero(), w), w);
        assert_eq!(TropicalSemiring::times(TropicalSemiring::one(), w), w);
        assert_eq!(
            TropicalSemiring::times(TropicalSemiring::zero(), w),
            TropicalSemiring::zero()
        );
    }

    #[test]
    fn tropical_plus_is_min() {
        assert_eq!(TropicalSemiring::plus(2.0, 5.0), 2.0);
        assert_eq!(TropicalSemiring::plus(5.0, 2.0), 2.0);
    }

    #[test]
    fn tropical_divide_inverts_times() {
        let a = 7.0f32;
        let b = 2.5f32;
        assert_eq!(TropicalSemiring::times(b, TropicalSemiring::divide(a, b)), a);
    }

    #[test]
    fn tropical_membership() {
        assert!(TropicalSemiring::is_member(f32::INFINITY));
        assert!(TropicalSemiring::is_member(-3.0));
        assert!(!TropicalSemiring::is_member(f32::NAN));
        assert!(!TropicalSemiring::is_member(f32::NEG_INFINITY));
    }

    #[test]
    fn log_plus_of_equal_weights() {
        // -log(2 * e^-1) = 1 - ln 2
        let w = LogSemiring::plus(1.0, 1.0);
        assert!((w - (1.0 - std::f32::consts::LN_2)).abs() < 1e-6);
    }

    #[test]
    fn log_plus_with_zero() {
        assert_eq!(LogSemiring::plus(LogSemiring::zero(), 4.0), 4.0);
        assert_eq!(LogSemiring::plus(4.0, LogSemiring::zero()), 4.0);
    }

    #[test]
    fn probability_compare_prefers_larger() {
        assert_eq!(ProbabilitySemiring::compare(0.9, 0.1), Ordering::Less);
        assert_eq!(ProbabilitySemiring::compare(0.1, 0.9), Ordering::Greater);
        assert!(!ProbabilitySemiring::is_member(-0.5));
    }

    #[test]
    fn kind_lookups() {
        assert_eq!(SemiringKind::from_arc_type("standard"), Some(SemiringKind::Tropical));
        assert_eq!(SemiringKind::from_arc_type("log"), Some(SemiringKind::Log));
        assert_eq!(SemiringKind::from_arc_type("log64"), None);
        for kind in [SemiringKind::Tropical, SemiringKind::Log, SemiringKind::Probability] {
            assert_eq!(SemiringKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(TropicalSemiring::name(), "tropical");
    }

    #[test]
    fn negative_zero_hashes_like_zero() {
        assert_eq!(Weight::key_bits(-0.0f32), Weight::key_bits(0.0f32));
        assert_ne!(Weight::to_bits(-0.0f32), Weight::to_bits(0.0f32));
    }
}
