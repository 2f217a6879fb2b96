//! Time-bending deadline transform.
//!
//! Raw qualities are exponentially distributed; dividing by the base
//! target alone would make block intervals exponential as well. The
//! transform takes the cube root of the difficulty-adjusted quality and
//! rescales it so inter-arrival times follow a chi-squared shape with mean
//! equal to the configured block spacing. All arithmetic is integer-only
//! fixed point so every implementation reproduces the same deadlines bit
//! for bit.

use crate::bigint::{cbrt_floor, low_u64};
use num_bigint::BigUint;
use num_traits::One;

/// Fractional bits of the quality domain.
const P: u32 = 21;

/// Fractional bits of the scale factor.
const Q: u32 = 42;

/// Γ(4/3) ≈ 0.892979511 in Q42 fixed point.
const GAMMA_43_Q42: u64 = 3_927_365_422_841;

/// Scale factor for a given block spacing, in Q42 fixed point:
/// `(T << 2Q) / ((cbrt(T << 3Q) · Γ(4/3)) >> Q)`, rounded half-up.
fn scale_q(block_time: u64) -> BigUint {
    let t = BigUint::from(block_time);

    let t_cbrt = cbrt_floor(&(&t << (3 * Q)));

    let numerator: BigUint = &t << (2 * Q);
    let denominator = (t_cbrt * BigUint::from(GAMMA_43_Q42)) >> Q;

    (numerator + (&denominator >> 1)) / denominator
}

/// Map a raw 64-bit quality to a deadline in seconds.
///
/// `block_time` is the target spacing in seconds. The result is truncated
/// to its low 64 bits after the final rounding division.
pub fn time_bent_deadline(quality: u64, base_target: u64, block_time: u64) -> u64 {
    if quality == 0 {
        return 0;
    }
    let base_target = base_target.max(1);

    let scale = scale_q(block_time);

    let v = (BigUint::from(quality) << (3 * P)) / BigUint::from(base_target);
    let r = cbrt_floor(&v);

    let numer = scale * r;
    let denom: BigUint = BigUint::one() << (P + Q);
    low_u64(&((numer + (&denom >> 1)) / denom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::genesis_base_target;

    #[test]
    fn zero_quality_is_zero_deadline() {
        assert_eq!(time_bent_deadline(0, 1, 600), 0);
        assert_eq!(time_bent_deadline(0, u64::MAX, 1), 0);
    }

    #[test]
    fn deadline_monotone_in_quality() {
        let bt = genesis_base_target(600, false);
        let mut last = 0;
        for shift in 0..64 {
            let d = time_bent_deadline(1u64 << shift, bt, 600);
            assert!(d >= last, "deadline not monotone at quality 2^{}", shift);
            last = d;
        }
    }

    #[test]
    fn deadline_shrinks_with_easier_target() {
        let q = 1u64 << 50;
        let d_hard = time_bent_deadline(q, 1 << 20, 600);
        let d_easy = time_bent_deadline(q, 1 << 40, 600);
        assert!(d_easy < d_hard);
    }

    #[test]
    fn expected_quality_lands_near_spacing() {
        // A quality equal to base_target (difficulty-adjusted quality 1,
        // i.e. one second raw deadline) must map to a small deadline, and
        // the transform must stretch large adjusted qualities well past
        // their raw value's cube root scale.
        let bt = genesis_base_target(600, false);
        let one_second = time_bent_deadline(bt, bt, 600);
        assert!(one_second <= 600, "one-second raw quality bent to {}", one_second);

        let huge = time_bent_deadline(u64::MAX, bt, 600);
        assert!(huge > one_second);
    }

    #[test]
    fn deterministic() {
        let bt = genesis_base_target(600, false);
        let a = time_bent_deadline(1 << 63, bt, 600);
        let b = time_bent_deadline(1 << 63, bt, 600);
        assert_eq!(a, b);
    }
}
