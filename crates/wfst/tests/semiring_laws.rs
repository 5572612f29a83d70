//! Algebraic laws of the concrete semirings, checked on sampled weights.

use proptest::prelude::*;
use wfst::{LogSemiring, ProbabilitySemiring, Semiring, TropicalSemiring};

/// Integer-valued costs keep tropical arithmetic exact.
fn tropical_weight() -> impl Strategy<Value = f32> {
    prop_oneof![
        9 => (-50i16..50).prop_map(f32::from),
        1 => Just(f32::INFINITY),
    ]
}

fn log_weight() -> impl Strategy<Value = f32> {
    prop_oneof![
        9 => 0.0f32..20.0,
        1 => Just(f32::INFINITY),
    ]
}

fn probability_weight() -> impl Strategy<Value = f32> {
    0.0f32..1.0
}

macro_rules! semiring_laws {
    ($module:ident, $semiring:ty, $weight:expr, $delta:expr) => {
        mod $module {
            use super::*;

            type S = $semiring;

            fn close(a: f32, b: f32) -> bool {
                S::approx_eq(a, b, $delta)
            }

            proptest! {
                #[test]
                fn plus_is_commutative(a in $weight, b in $weight) {
                    prop_assert!(close(S::plus(a, b), S::plus(b, a)));
                }

                #[test]
                fn plus_is_associative(a in $weight, b in $weight, c in $weight) {
                    prop_assert!(close(S::plus(S::plus(a, b), c), S::plus(a, S::plus(b, c))));
                }

                #[test]
                fn times_is_associative(a in $weight, b in $weight, c in $weight) {
                    prop_assert!(close(S::times(S::times(a, b), c), S::times(a, S::times(b, c))));
                }

                #[test]
                fn times_distributes_over_plus(a in $weight, b in $weight, c in $weight) {
                    let left = S::times(a, S::plus(b, c));
                    let right = S::plus(S::times(a, b), S::times(a, c));
                    prop_assert!(close(left, right), "{} vs {}", left, right);
                    let left = S::times(S::plus(a, b), c);
                    let right = S::plus(S::times(a, c), S::times(b, c));
                    prop_assert!(close(left, right), "{} vs {}", left, right);
                }

                #[test]
                fn identities(a in $weight) {
                    prop_assert_eq!(S::plus(S::zero(), a), a);
                    prop_assert_eq!(S::plus(a, S::zero()), a);
                    prop_assert_eq!(S::times(S::one(), a), a);
                    prop_assert_eq!(S::times(a, S::one()), a);
                }

                #[test]
                fn zero_annihilates(a in $weight) {
                    prop_assert_eq!(S::times(S::zero(), a), S::zero());
                    prop_assert_eq!(S::times(a, S::zero()), S::zero());
                }

                #[test]
                fn sampled_weights_are_members(a in $weight, b in $weight) {
                    prop_assert!(S::is_member(a));
                    prop_assert!(S::is_member(S::plus(a, b)));
                    prop_assert!(S::is_member(S::times(a, b)));
                }

                #[test]
                fn reverse_is_an_involution(a in $weight) {
                    prop_assert_eq!(S::reverse(S::reverse(a)), a);
                }
            }
        }
    };
}

semiring_laws!(tropical, TropicalSemiring, tropical_weight(), 0.0);
semiring_laws!(log, LogSemiring, log_weight(), 1e-4);
semiring_laws!(probability, ProbabilitySemiring, probability_weight(), 1e-5);

proptest! {
    #[test]
    fn tropical_plus_selects_an_operand(a in tropical_weight(), b in tropical_weight()) {
        let p = TropicalSemiring::plus(a, b);
        prop_assert!(p == a || p == b);
        prop_assert!(TropicalSemiring::compare(p, a).is_le());
        prop_assert!(TropicalSemiring::compare(p, b).is_le());
    }

    #[test]
    fn tropical_divide_undoes_times(a in -50i16..50, b in -50i16..50) {
        let (a, b) = (f32::from(a), f32::from(b));
        prop_assert_eq!(TropicalSemiring::divide(TropicalSemiring::times(a, b), b), a);
    }
}
