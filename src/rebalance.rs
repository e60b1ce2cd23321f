// 11.0 rebalance.rs: gated trade execution through whitelisted external targets.
// the target is an opaque callee: it gets a bounded allowance and a payload, and
// everything it claims to have done is ignored in favor of balance diffs. the
// realized price of whatever actually moved must clear the oracle deviation
// band; better-than-fair trades always pass.

use crate::strategy::{Strategy, StrategyError};
use crate::tick::tick_from_volumes;
use crate::timelock::AddressTimelock;
use crate::tokens::{TokenError, TokenPair};
use crate::types::{Address, BaseAmount, QuoteAmount, Tick, TokenSide};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebalanceError {
    #[error("target {0} is not whitelisted")]
    NotWhitelisted(Address),

    #[error("insufficient balance: need {needed}, hold {available} after withdrawal")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("received {received} below minimum {min}")]
    SlippageExceeded { received: u128, min: u128 },

    #[error("realized trade tick {realized} outside oracle band (floor {floor})")]
    InvalidTradeTick { realized: i32, floor: i64 },

    #[error("rebalance target reverted: {0}")]
    TargetReverted(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Opaque external trade venue. Pulls the source token from the vault within
/// its allowance and is expected to send proceeds back; nothing it reports is
/// trusted.
pub trait RebalanceTarget {
    fn address(&self) -> Address;

    fn invoke(
        &mut self,
        payload: &[u8],
        vault: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), String>;
}

/// What actually happened, measured from balance deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    pub sent: u128,
    pub received: u128,
    /// None when the target sent nothing (no price check applies).
    pub realized_tick: Option<Tick>,
}

pub(crate) struct RebalanceContext<'a> {
    pub whitelist: &'a AddressTimelock,
    pub oracle_tick: Tick,
    pub max_deviation: u32,
    pub vault: Address,
    pub tokens: &'a mut TokenPair,
    pub strategy: Option<&'a mut (dyn Strategy + Send + Sync + 'static)>,
}

// 11.1: the guarded execution path. order matters: funds are pulled local
// BEFORE snapshots so the deltas attribute to the target call alone, and the
// allowance is revoked on every exit path after the call.
pub(crate) fn execute(
    ctx: RebalanceContext<'_>,
    target: &mut dyn RebalanceTarget,
    sell: TokenSide,
    amount_in: u128,
    min_amount_out: u128,
    payload: &[u8],
    withdraw_all: bool,
) -> Result<RebalanceOutcome, RebalanceError> {
    let RebalanceContext {
        whitelist,
        oracle_tick,
        max_deviation,
        vault,
        tokens,
        mut strategy,
    } = ctx;

    if !whitelist.is_whitelisted(target.address()) {
        return Err(RebalanceError::NotWhitelisted(target.address()));
    }

    // pull the source token local, from the strategy if we are short
    let held = tokens.side(sell).balance_of(vault);
    if held < amount_in {
        if let Some(strategy) = strategy.as_deref_mut() {
            if withdraw_all {
                strategy.withdraw_all(vault, tokens)?;
            } else {
                let shortfall = (amount_in - held).min(strategy.reserve_balance(sell));
                let (b, q) = match sell {
                    TokenSide::Base => (BaseAmount(shortfall), QuoteAmount::zero()),
                    TokenSide::Quote => (BaseAmount::zero(), QuoteAmount(shortfall)),
                };
                strategy.withdraw_funds(b, q, vault, tokens)?;
            }
        }
    }
    let held = tokens.side(sell).balance_of(vault);
    if held < amount_in {
        return Err(RebalanceError::InsufficientBalance {
            needed: amount_in,
            available: held,
        });
    }

    let snap_src = tokens.side(sell).balance_of(vault);
    let snap_dst = tokens.side(sell.other()).balance_of(vault);

    tokens.side_mut(sell).approve(vault, target.address(), amount_in);
    let call = target.invoke(payload, vault, tokens);
    // revoke before anything else, on success and failure alike
    tokens.side_mut(sell).approve(vault, target.address(), 0);
    call.map_err(RebalanceError::TargetReverted)?;

    let sent = snap_src.saturating_sub(tokens.side(sell).balance_of(vault));
    let received = tokens
        .side(sell.other())
        .balance_of(vault)
        .saturating_sub(snap_dst);

    if received < min_amount_out {
        return Err(RebalanceError::SlippageExceeded {
            received,
            min: min_amount_out,
        });
    }

    // a zero send is not a trade; only real outflow is price-checked
    let realized_tick = if sent > 0 {
        let realized = tick_from_volumes(received, sent);
        let fair = match sell {
            TokenSide::Base => oracle_tick,
            TokenSide::Quote => oracle_tick.negate(),
        };
        let floor = fair.value() as i64 - max_deviation as i64;
        if (realized.value() as i64) < floor {
            return Err(RebalanceError::InvalidTradeTick {
                realized: realized.value(),
                floor,
            });
        }
        Some(realized)
    } else {
        None
    };

    // sweep leftovers back into an active strategy
    if let Some(strategy) = strategy.as_deref_mut() {
        if strategy.is_active() {
            let local_base = BaseAmount(tokens.base.balance_of(vault));
            let local_quote = QuoteAmount(tokens.quote.balance_of(vault));
            strategy.deposit_funds(local_base, local_quote, vault, tokens)?;
        }
    }

    Ok(RebalanceOutcome {
        sent,
        received,
        realized_tick,
    })
}

// 11.2: simple fixed-rate venue for tests and the simulator. swaps the full
// allowance at `rate_tick` (quote per base = 1.0001^rate_tick), funded from its
// own inventory.
pub struct MockSwapVenue {
    address: Address,
    rate_tick: Tick,
    /// take the allowance but send nothing back
    keep_funds: bool,
    /// consume only this much of the allowance, if set
    partial_take: Option<u128>,
}

impl MockSwapVenue {
    pub fn new(address: Address, rate_tick: Tick) -> Self {
        Self {
            address,
            rate_tick,
            keep_funds: false,
            partial_take: None,
        }
    }

    pub fn set_keep_funds(&mut self, keep: bool) {
        self.keep_funds = keep;
    }

    pub fn set_partial_take(&mut self, amount: Option<u128>) {
        self.partial_take = amount;
    }
}

impl RebalanceTarget for MockSwapVenue {
    fn address(&self) -> Address {
        self.address
    }

    /// payload: [0] = sell side (0 base, 1 quote)
    fn invoke(
        &mut self,
        payload: &[u8],
        vault: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), String> {
        let sell = match payload.first() {
            Some(0) => TokenSide::Base,
            Some(1) => TokenSide::Quote,
            _ => return Err("bad payload".into()),
        };

        let allowance = tokens.side(sell).allowance(vault, self.address);
        let take = self.partial_take.unwrap_or(allowance).min(allowance);
        if take == 0 {
            return Ok(());
        }
        tokens
            .side_mut(sell)
            .transfer_from(self.address, vault, self.address, take)
            .map_err(|e| e.to_string())?;
        if self.keep_funds {
            return Ok(());
        }

        let out = match sell {
            TokenSide::Base => crate::tick::base_to_quote_floor(take, self.rate_tick),
            TokenSide::Quote => crate::tick::quote_to_base_floor(take, self.rate_tick),
        }
        .ok_or("rate overflow")?;
        tokens
            .side_mut(sell.other())
            .transfer(self.address, vault, out)
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
