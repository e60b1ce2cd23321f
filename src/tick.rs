// 3.0 tick.rs: tick <-> volume conversion. price = 1.0001^tick in quote units per
// base unit. all conversions are deterministic fixed point: ratios live in Decimal
// (96-bit integer mantissa), amounts stay u128 and cross over via mantissa/scale
// split + wide mul_div. no floats anywhere.

use crate::math::{mul_div_floor, mul_div_ceil};
use crate::types::{Tick, MAX_TICK, MIN_TICK};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

// largest integer a Decimal mantissa can hold (2^96 - 1)
const DECIMAL_MAX_INT: u128 = 79_228_162_514_264_337_593_543_950_335;

fn tick_base() -> Decimal {
    dec!(1.0001)
}

/// 1.0001^tick. None outside [MIN_TICK, MAX_TICK].
pub fn ratio_from_tick(tick: Tick) -> Option<Decimal> {
    if !tick.is_in_range() {
        return None;
    }
    tick_base().checked_powi(tick.value() as i64)
}

/// floor(base * 1.0001^tick). None on out-of-range tick or u128 overflow.
pub fn base_to_quote_floor(base: u128, tick: Tick) -> Option<u128> {
    let ratio = ratio_from_tick(tick)?;
    let mantissa = ratio.mantissa() as u128;
    let scale = 10u128.checked_pow(ratio.scale())?;
    mul_div_floor(base, mantissa, scale)
}

/// ceil(base * 1.0001^tick).
pub fn base_to_quote_ceil(base: u128, tick: Tick) -> Option<u128> {
    let ratio = ratio_from_tick(tick)?;
    let mantissa = ratio.mantissa() as u128;
    let scale = 10u128.checked_pow(ratio.scale())?;
    mul_div_ceil(base, mantissa, scale)
}

/// floor(quote / 1.0001^tick). None on out-of-range tick or u128 overflow.
pub fn quote_to_base_floor(quote: u128, tick: Tick) -> Option<u128> {
    let ratio = ratio_from_tick(tick)?;
    let mantissa = ratio.mantissa() as u128;
    let scale = 10u128.checked_pow(ratio.scale())?;
    mul_div_floor(quote, scale, mantissa)
}

// 3.1: floor of log_1.0001(quote/base). the workhorse behind every realized-price
// check: initial-mint revalidation and rebalance trade ticks both come through here.
//
// Ratios beyond the representable window clamp to MAX_TICK+1 / MIN_TICK-1, which
// by construction fall outside every deviation band. A zero side clamps the same
// way, so degenerate volumes can never pass a price check.
pub fn tick_from_volumes(quote: u128, base: u128) -> Tick {
    if base == 0 {
        return Tick(MAX_TICK + 1);
    }
    if quote == 0 {
        return Tick(MIN_TICK - 1);
    }

    // scale both sides down together until they fit a Decimal mantissa.
    // the ratio is preserved; a side that vanishes means the ratio is
    // beyond the representable window anyway.
    let (mut q, mut b) = (quote, base);
    while q > DECIMAL_MAX_INT || b > DECIMAL_MAX_INT {
        q >>= 4;
        b >>= 4;
    }
    if b == 0 {
        return Tick(MAX_TICK + 1);
    }
    if q == 0 {
        return Tick(MIN_TICK - 1);
    }

    let ratio = Decimal::from_i128_with_scale(q as i128, 0)
        / Decimal::from_i128_with_scale(b as i128, 0);
    if ratio <= Decimal::ZERO {
        // quotient underflowed the 28-place grid
        return Tick(MIN_TICK - 1);
    }

    // window clamps before the log so the refinement loops stay in range
    let max_ratio = ratio_from_tick(Tick(MAX_TICK)).unwrap_or(Decimal::MAX);
    let min_ratio = ratio_from_tick(Tick(MIN_TICK)).unwrap_or(Decimal::ZERO);
    if ratio >= max_ratio * tick_base() {
        return Tick(MAX_TICK + 1);
    }
    if ratio < min_ratio {
        return Tick(MIN_TICK - 1);
    }

    // ln gives a close guess; exact floor is pinned by comparing against the
    // powi ladder, which is the same arithmetic the conversion functions use.
    let approx = (ratio.ln() / tick_base().ln()).floor();
    let mut t = approx
        .to_i64()
        .unwrap_or(0)
        .clamp(MIN_TICK as i64, MAX_TICK as i64) as i32;

    while t > MIN_TICK && ratio_from_tick(Tick(t)).is_some_and(|r| r > ratio) {
        t -= 1;
    }
    while t < MAX_TICK && ratio_from_tick(Tick(t + 1)).is_some_and(|r| r <= ratio) {
        t += 1;
    }
    Tick(t)
}
