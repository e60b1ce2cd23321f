// 8.0 accounting.rs: proportional share issuance and redemption. shares are a
// strict pro-rata claim on total (local + strategy) balances; the only ways
// supply moves are mint, burn and fee dilution. the initial mint is priced by the
// oracle and pays a one-time minimum-liquidity toll that stays locked forever,
// which makes near-zero-supply share-price manipulation uneconomical.

use crate::math::{mul_div_ceil, mul_div_floor};
use crate::tick::{base_to_quote_floor, quote_to_base_floor, tick_from_volumes};
use crate::types::{BaseAmount, QuoteAmount, Shares, Tick, TokenSide};
use serde::{Deserialize, Serialize};

/// Shares locked to no owner at the first mint.
pub const MINIMUM_LIQUIDITY: u128 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountingError {
    #[error("zero-amount call")]
    ZeroAmount,

    #[error("invalid initial mint amounts")]
    InvalidInitialMintAmounts,

    #[error("minted shares {shares} below caller minimum {min}")]
    SlippageExceeded { shares: u128, min: u128 },

    #[error("burn payout below caller minimum")]
    BurnSlippageExceeded,

    #[error("deposit cap exceeded on {0:?} side")]
    CapExceeded(TokenSide),

    #[error("burn exceeds circulating shares")]
    InsufficientShares,

    #[error("vault has shares but no reserves")]
    EmptyReserves,

    #[error("accounting arithmetic overflow")]
    Overflow,
}

// 8.1: the vault's book position. totals are always local + strategy; the engine
// re-syncs both legs from measured balances after every external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VaultPosition {
    pub local_base: BaseAmount,
    pub local_quote: QuoteAmount,
    pub strategy_base: BaseAmount,
    pub strategy_quote: QuoteAmount,
    pub total_shares: Shares,
    pub locked_shares: Shares,
}

impl VaultPosition {
    pub fn total_base(&self) -> BaseAmount {
        BaseAmount(self.local_base.value() + self.strategy_base.value())
    }

    pub fn total_quote(&self) -> QuoteAmount {
        QuoteAmount(self.local_quote.value() + self.strategy_quote.value())
    }

    /// Shares that can actually be burned: total minus the permanently locked floor.
    pub fn circulating_shares(&self) -> Shares {
        Shares(self.total_shares.value() - self.locked_shares.value())
    }
}

/// Result of sizing a deposit: the share count and the exact amounts that buy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintAmounts {
    pub shares: Shares,
    pub base_in: BaseAmount,
    pub quote_in: QuoteAmount,
    /// Non-zero only on the first mint.
    pub locked: Shares,
}

// 8.2: deposit sizing against a live supply. candidate shares are computed
// independently from each side and the minimum wins; amounts are then derived
// BACK from that share count (ceil, protocol's favor) rather than taken from the
// raw maxima, so the claim is exactly proportional. a zero reserve side is inert
// and the other side drives sizing alone.
pub fn shares_for_deposit(
    position: &VaultPosition,
    max_base: u128,
    max_quote: u128,
) -> Result<MintAmounts, AccountingError> {
    let supply = position.total_shares.value();
    debug_assert!(supply > 0, "initial mint goes through initial_mint_amounts");
    if max_base == 0 && max_quote == 0 {
        return Err(AccountingError::ZeroAmount);
    }

    let total_base = position.total_base().value();
    let total_quote = position.total_quote().value();
    if total_base == 0 && total_quote == 0 {
        return Err(AccountingError::EmptyReserves);
    }

    // a candidate that overflows u128 just means that side is unconstrained
    let cand_base = if total_base > 0 {
        mul_div_floor(supply, max_base, total_base).unwrap_or(u128::MAX)
    } else {
        u128::MAX
    };
    let cand_quote = if total_quote > 0 {
        mul_div_floor(supply, max_quote, total_quote).unwrap_or(u128::MAX)
    } else {
        u128::MAX
    };

    let shares = cand_base.min(cand_quote);
    if shares == 0 {
        return Err(AccountingError::ZeroAmount);
    }
    if shares == u128::MAX {
        return Err(AccountingError::Overflow);
    }

    let base_in = if total_base > 0 {
        mul_div_ceil(shares, total_base, supply).ok_or(AccountingError::Overflow)?
    } else {
        0
    };
    let quote_in = if total_quote > 0 {
        mul_div_ceil(shares, total_quote, supply).ok_or(AccountingError::Overflow)?
    } else {
        0
    };

    Ok(MintAmounts {
        shares: Shares(shares),
        base_in: BaseAmount(base_in),
        quote_in: QuoteAmount(quote_in),
        locked: Shares::zero(),
    })
}

// 8.3: the oracle-priced first mint. base implied by max_quote, capped at
// max_base with the quote leg recomputed from the cap; all rounding floors in
// the protocol's favor. the realized ratio is re-validated against the oracle
// band AFTER conversion, not assumed from the inputs, so rounding drift at small
// amounts is caught. shares are the quote-equivalent value of the deposit, minus
// the minimum-liquidity floor.
pub fn initial_mint_amounts(
    oracle_tick: Tick,
    max_deviation: u32,
    max_base: u128,
    max_quote: u128,
) -> Result<MintAmounts, AccountingError> {
    if max_base == 0 && max_quote == 0 {
        return Err(AccountingError::InvalidInitialMintAmounts);
    }

    let implied_base =
        quote_to_base_floor(max_quote, oracle_tick).ok_or(AccountingError::Overflow)?;
    let (base_in, quote_in) = if implied_base > max_base {
        let quote = base_to_quote_floor(max_base, oracle_tick).ok_or(AccountingError::Overflow)?;
        (max_base, quote.min(max_quote))
    } else {
        (implied_base, max_quote)
    };

    let realized = tick_from_volumes(quote_in, base_in);
    if !realized.within_band(oracle_tick, max_deviation) {
        return Err(AccountingError::InvalidInitialMintAmounts);
    }

    let base_value =
        base_to_quote_floor(base_in, oracle_tick).ok_or(AccountingError::Overflow)?;
    let gross = quote_in
        .checked_add(base_value)
        .ok_or(AccountingError::Overflow)?;
    if gross <= MINIMUM_LIQUIDITY {
        return Err(AccountingError::InvalidInitialMintAmounts);
    }

    Ok(MintAmounts {
        shares: Shares(gross - MINIMUM_LIQUIDITY),
        base_in: BaseAmount(base_in),
        quote_in: QuoteAmount(quote_in),
        locked: Shares(MINIMUM_LIQUIDITY),
    })
}

// 8.4: redemption. strictly proportional to TOTAL balances, floored. whether the
// vault holds enough locally is the caller's (vault.rs) problem: it fully
// withdraws the strategy first when short, so a burn succeeds whenever the whole
// system is solvent.
pub fn amounts_for_burn(
    position: &VaultPosition,
    shares: Shares,
) -> Result<(BaseAmount, QuoteAmount), AccountingError> {
    if shares.is_zero() {
        return Err(AccountingError::ZeroAmount);
    }
    let supply = position.total_shares.value();
    if supply == 0 || shares.value() > position.circulating_shares().value() {
        return Err(AccountingError::InsufficientShares);
    }

    let base_out = mul_div_floor(shares.value(), position.total_base().value(), supply)
        .ok_or(AccountingError::Overflow)?;
    let quote_out = mul_div_floor(shares.value(), position.total_quote().value(), supply)
        .ok_or(AccountingError::Overflow)?;
    Ok((BaseAmount(base_out), QuoteAmount(quote_out)))
}
