// 2.0 math.rs: full-width u128 multiply/divide. every proportional formula in the
// engine routes through these so a*b/c never silently wraps at 128 bits.

const LO_MASK: u128 = (1u128 << 64) - 1;

/// 128x128 -> 256 bit multiply, returned as (high, low) limbs.
fn full_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LO_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LO_MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // mid column cannot overflow: 3 terms each < 2^64 summed into a u128
    let mid = (ll >> 64) + (lh & LO_MASK) + (hl & LO_MASK);
    let lo = (mid << 64) | (ll & LO_MASK);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// 256/128 restoring division. Requires hi < d so the quotient fits in u128.
/// Returns (quotient, remainder).
fn div_rem_256_128(mut hi: u128, mut lo: u128, d: u128) -> (u128, u128) {
    debug_assert!(d != 0 && hi < d);
    let mut q = 0u128;
    for _ in 0..128 {
        // the bit shifted out of hi makes the partial remainder >= 2^128 > d,
        // so it forces a subtraction even though the wrapped hi compares small
        let overflow = hi >> 127;
        hi = (hi << 1) | (lo >> 127);
        lo <<= 1;
        q <<= 1;
        if overflow != 0 || hi >= d {
            hi = hi.wrapping_sub(d);
            q |= 1;
        }
    }
    (q, hi)
}

/// floor(a * b / d). None when d == 0 or the quotient exceeds u128.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (hi, lo) = full_mul(a, b);
    if hi == 0 {
        return Some(lo / d);
    }
    if hi >= d {
        return None;
    }
    Some(div_rem_256_128(hi, lo, d).0)
}

/// ceil(a * b / d). None when d == 0 or the quotient exceeds u128.
pub fn mul_div_ceil(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (hi, lo) = full_mul(a, b);
    if hi == 0 {
        let q = lo / d;
        let r = lo % d;
        return if r == 0 { Some(q) } else { q.checked_add(1) };
    }
    if hi >= d {
        return None;
    }
    let (q, r) = div_rem_256_128(hi, lo, d);
    if r == 0 {
        Some(q)
    } else {
        q.checked_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_match_native() {
        assert_eq!(mul_div_floor(7, 9, 4), Some(15)); // 63/4
        assert_eq!(mul_div_ceil(7, 9, 4), Some(16));
        assert_eq!(mul_div_floor(10, 10, 5), Some(20));
        assert_eq!(mul_div_ceil(10, 10, 5), Some(20)); // exact, no bump
    }

    #[test]
    fn zero_denominator_rejected() {
        assert_eq!(mul_div_floor(1, 1, 0), None);
        assert_eq!(mul_div_ceil(1, 1, 0), None);
    }

    #[test]
    fn wide_intermediate_no_overflow() {
        // a*b overflows u128 (1e30 * 1e30 = 1e60) but the quotient fits
        let a = 1_000_000_000_000_000_000_000_000_000_000u128; // 1e30
        assert_eq!(mul_div_floor(a, a, a), Some(a));
        assert_eq!(mul_div_ceil(a, a, a), Some(a));
    }

    #[test]
    fn quotient_overflow_detected() {
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), None);
        assert_eq!(mul_div_ceil(u128::MAX, 2, 1), None);
    }

    #[test]
    fn large_denominator_identity() {
        // d > 2^127: doubling the partial remainder overflows the hi limb,
        // and the shifted-out bit must still force a subtraction
        let d = 0xf8e5_dd85_a0ca_b1a8_10e6_3c97_2f1a_d57bu128;
        assert!(d > 1u128 << 127);
        for a in [1u128, 3, 1_000_000_007, u128::MAX - 1, u128::MAX] {
            assert_eq!(mul_div_floor(a, d, d), Some(a));
            assert_eq!(mul_div_ceil(a, d, d), Some(a));
        }
        let b = 226_854_911_280_625_642_308_916_404_954_512_140_971u128;
        assert_eq!(mul_div_floor(3, b, b), Some(3));
    }

    #[test]
    fn full_mul_limbs() {
        let (hi, lo) = full_mul(u128::MAX, u128::MAX);
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        assert_eq!(lo, 1);
        assert_eq!(hi, u128::MAX - 1);
    }

    #[test]
    fn division_remainder_exact() {
        let (hi, lo) = full_mul(u128::MAX, 3);
        let (q, r) = div_rem_256_128(hi, lo, 7);
        // verify q*7 + r reconstructs a*b
        let (chk_hi, chk_lo) = full_mul(q, 7);
        let (sum_lo, carry) = chk_lo.overflowing_add(r);
        assert_eq!(sum_lo, lo);
        assert_eq!(chk_hi + carry as u128, hi);
        assert!(r < 7);
    }
}
