// 7.0 fees.rs: continuous management fee, realized by dilution. instead of moving
// tokens, accrual mints new shares to the fee recipient so every other holder's
// claim shrinks by exactly the intended fraction. minted = S*f/(P-f) rather than
// S*f/P: the fee is a fraction of the POST-dilution pool, which matches
// continuous compounding instead of under-charging simple interest.

use crate::math::mul_div_floor;
use crate::types::{Address, Shares, Timestamp};
use serde::{Deserialize, Serialize};

/// Fee rates are expressed in parts per 100_000 per year.
pub const RATE_PRECISION: u128 = 100_000;
pub const SECONDS_PER_YEAR: u128 = 31_536_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("annual rate {rate} exceeds maximum {max}")]
    RateTooHigh { rate: u64, max: u64 },

    #[error("fee accrual overflowed")]
    Overflow,
}

// 7.1: the fee ledger. last_accrual is monotone non-decreasing; accrual is lazy,
// pulled at the top of every state-changing vault call, never timer-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeState {
    pub annual_rate: u64,
    pub recipient: Address,
    pub last_accrual: Timestamp,
    pub total_accrued: Shares,
}

impl FeeState {
    pub fn new(annual_rate: u64, recipient: Address, now: Timestamp) -> Self {
        Self {
            annual_rate,
            recipient,
            last_accrual: now,
            total_accrued: Shares::zero(),
        }
    }

    // 7.2: idempotent accrual. with rate*elapsed folded into the denominator the
    // integer division keeps full precision for small windows; the literal
    // two-step (rate*elapsed/YEAR first) would truncate sub-hour accruals to zero.
    // minted = supply * r*dt / (PREC*YEAR - r*dt).
    pub fn accrue(&mut self, now: Timestamp, supply: Shares) -> Result<Shares, FeeError> {
        let elapsed = now.since(self.last_accrual);
        if elapsed <= 0 {
            // never regress the accrual clock
            return Ok(Shares::zero());
        }
        self.last_accrual = now;

        if self.annual_rate == 0 || supply.is_zero() {
            return Ok(Shares::zero());
        }

        let denom_full = RATE_PRECISION * SECONDS_PER_YEAR;
        // cap at 100% of the pool; beyond that the formula divides by zero
        let accumulated = (self.annual_rate as u128)
            .saturating_mul(elapsed as u128)
            .min(denom_full - 1);

        let minted = mul_div_floor(supply.value(), accumulated, denom_full - accumulated)
            .ok_or(FeeError::Overflow)?;
        self.total_accrued = self
            .total_accrued
            .checked_add(Shares(minted))
            .ok_or(FeeError::Overflow)?;
        Ok(Shares(minted))
    }

    pub fn set_rate(&mut self, rate: u64, max: u64) -> Result<(), FeeError> {
        if rate > max {
            return Err(FeeError::RateTooHigh { rate, max });
        }
        self.annual_rate = rate;
        Ok(())
    }

    pub fn set_recipient(&mut self, recipient: Address) {
        self.recipient = recipient;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    #[test]
    fn accrue_is_idempotent_at_zero_elapsed() {
        let mut fees = FeeState::new(5_000, Address(9), t(1_000));
        let supply = Shares(1_000_000_000_000);

        let first = fees.accrue(t(1_000 + 3_600), supply).unwrap();
        assert!(first.value() > 0);

        // same instant again: nothing minted
        let second = fees.accrue(t(1_000 + 3_600), supply).unwrap();
        assert_eq!(second, Shares::zero());
    }

    #[test]
    fn one_year_at_five_percent() {
        let mut fees = FeeState::new(5_000, Address(9), t(0));
        let supply = Shares(1_000_000_000_000);

        let minted = fees.accrue(t(SECONDS_PER_YEAR as i64), supply).unwrap();
        // 5% of the post-dilution pool: S * 0.05/0.95 = S/19
        assert_eq!(minted, Shares(1_000_000_000_000 / 19));
        assert_eq!(fees.total_accrued, minted);

        // recipient's fraction of the diluted pool is the intended 5%
        let diluted = supply.value() + minted.value();
        let fraction_e9 = minted.value() * 1_000_000_000 / diluted;
        assert!((49_999_999..=50_000_000).contains(&fraction_e9));
    }

    #[test]
    fn zero_rate_only_advances_clock() {
        let mut fees = FeeState::new(0, Address(9), t(0));
        let minted = fees.accrue(t(1_000_000), Shares(1_000_000)).unwrap();
        assert_eq!(minted, Shares::zero());
        assert_eq!(fees.last_accrual, t(1_000_000));
    }

    #[test]
    fn zero_supply_only_advances_clock() {
        let mut fees = FeeState::new(5_000, Address(9), t(0));
        let minted = fees.accrue(t(1_000_000), Shares::zero()).unwrap();
        assert_eq!(minted, Shares::zero());
        assert_eq!(fees.last_accrual, t(1_000_000));
    }

    #[test]
    fn clock_never_regresses() {
        let mut fees = FeeState::new(5_000, Address(9), t(1_000));
        fees.accrue(t(500), Shares(1_000_000)).unwrap();
        assert_eq!(fees.last_accrual, t(1_000));
    }

    #[test]
    fn small_window_still_accrues() {
        // 5% annual over one minute on a large supply must not truncate to zero
        let mut fees = FeeState::new(5_000, Address(9), t(0));
        let minted = fees.accrue(t(60), Shares(1_000_000_000_000_000_000)).unwrap();
        assert!(minted.value() > 0);
    }

    #[test]
    fn rate_cap_enforced() {
        let mut fees = FeeState::new(0, Address(9), t(0));
        assert!(fees.set_rate(10_000, 10_000).is_ok());
        assert_eq!(
            fees.set_rate(10_001, 10_000),
            Err(FeeError::RateTooHigh { rate: 10_001, max: 10_000 })
        );
    }
}
