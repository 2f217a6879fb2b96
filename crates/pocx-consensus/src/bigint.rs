//! Big-integer helpers for the deadline transform.

use num_bigint::BigUint;
use num_traits::One;

/// Largest `r` with `r³ ≤ x`.
///
/// Doubles an upper bound until it overshoots, then bisects. The midpoint
/// rounds up so the loop terminates with `lo == hi` at the exact floor.
pub fn cbrt_floor(x: &BigUint) -> BigUint {
    let mut hi = BigUint::one();
    while &(&hi * &hi * &hi) < x {
        hi <<= 1;
    }
    let mut lo: BigUint = &hi >> 1;

    while lo < hi {
        let mid: BigUint = (&lo + &hi + BigUint::one()) >> 1;
        if &(&mid * &mid * &mid) <= x {
            lo = mid;
        } else {
            hi = mid - BigUint::one();
        }
    }
    lo
}

/// Low 64 bits of `x`. Truncating by design: callers that reach this after
/// the deadline rounding step fit in a u64 for every realistic input.
pub fn low_u64(x: &BigUint) -> u64 {
    x.iter_u64_digits().next().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cbrt_u64(x: u64) -> u64 {
        low_u64(&cbrt_floor(&BigUint::from(x)))
    }

    #[test]
    fn small_values() {
        assert_eq!(cbrt_u64(0), 0);
        assert_eq!(cbrt_u64(1), 1);
        assert_eq!(cbrt_u64(7), 1);
        assert_eq!(cbrt_u64(8), 2);
        assert_eq!(cbrt_u64(26), 2);
        assert_eq!(cbrt_u64(27), 3);
        assert_eq!(cbrt_u64(1_000_000), 100);
    }

    #[test]
    fn exact_floor_invariant() {
        // r³ ≤ x < (r+1)³ across magnitudes, including perfect cubes and
        // their neighbours.
        for base in [2u128, 3, 10, 255, 65_536, 4_000_037] {
            for x in [base * base * base - 1, base * base * base, base * base * base + 1] {
                let r = cbrt_floor(&BigUint::from(x));
                let r1 = &r + BigUint::from(1u32);
                assert!(&r * &r * &r <= BigUint::from(x));
                assert!(&r1 * &r1 * &r1 > BigUint::from(x));
            }
        }
    }

    #[test]
    fn large_value_floor() {
        // 2^126: cube root is 2^42
        let x = BigUint::from(1u32) << 126;
        assert_eq!(cbrt_floor(&x), BigUint::from(1u64) << 42);
    }

    #[test]
    fn low_u64_truncates() {
        let x = (BigUint::from(1u32) << 100) + BigUint::from(42u32);
        assert_eq!(low_u64(&x), 42);
    }
}
