// 1.0: all the primitives live here. nothing in the engine works without these types.
// ticks, token amounts, shares, addresses, timestamps. each is a newtype so the
// compiler catches base/quote mixups.

use serde::{Deserialize, Serialize};
use std::fmt;

// 1.1: log-scale price coordinate. price = 1.0001^tick, quote units per base unit.
// valid range is bounded so the ratio stays representable in fixed point; see tick.rs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(pub i32);

/// Largest tick whose ratio the conversion layer can represent.
pub const MAX_TICK: i32 = 500_000;
pub const MIN_TICK: i32 = -MAX_TICK;

impl Tick {
    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_in_range(&self) -> bool {
        (MIN_TICK..=MAX_TICK).contains(&self.0)
    }

    // the bid side of a book is priced against the inverted pair
    pub fn negate(&self) -> Tick {
        Tick(-self.0)
    }

    /// Inclusive deviation-band check: |self - reference| <= max_deviation.
    pub fn within_band(&self, reference: Tick, max_deviation: u32) -> bool {
        let diff = (self.0 as i64 - reference.0 as i64).abs();
        diff <= max_deviation as i64
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: base token amount in native precision. raw integer units, no decimals applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BaseAmount(pub u128);

impl BaseAmount {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: BaseAmount) -> Option<BaseAmount> {
        self.0.checked_add(other.0).map(BaseAmount)
    }

    pub fn checked_sub(&self, other: BaseAmount) -> Option<BaseAmount> {
        self.0.checked_sub(other.0).map(BaseAmount)
    }
}

impl fmt::Display for BaseAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: quote token amount in native precision. share value is denominated in this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuoteAmount(pub u128);

impl QuoteAmount {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: QuoteAmount) -> Option<QuoteAmount> {
        self.0.checked_add(other.0).map(QuoteAmount)
    }

    pub fn checked_sub(&self, other: QuoteAmount) -> Option<QuoteAmount> {
        self.0.checked_sub(other.0).map(QuoteAmount)
    }
}

impl fmt::Display for QuoteAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: vault shares. proportional claim on total balances; supply only moves
// through mint, burn and fee accrual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Shares(pub u128);

impl Shares {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Shares) -> Option<Shares> {
        self.0.checked_add(other.0).map(Shares)
    }

    pub fn checked_sub(&self, other: Shares) -> Option<Shares> {
        self.0.checked_sub(other.0).map(Shares)
    }
}

impl fmt::Display for Shares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.5: opaque account/contract address. the engine only ever compares these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:012x}", self.0)
    }
}

// 1.6: which of the two pooled tokens an amount refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenSide {
    Base,
    Quote,
}

impl TokenSide {
    pub fn other(&self) -> TokenSide {
        match self {
            TokenSide::Base => TokenSide::Quote,
            TokenSide::Quote => TokenSide::Base,
        }
    }
}

// 1.7: second-resolution timestamp. timelocks are wall-clock windows so seconds
// are the native unit everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Seconds elapsed since `earlier`. Negative when `earlier` is in the future.
    pub fn since(&self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }

    pub fn plus_secs(&self, secs: i64) -> Timestamp {
        Timestamp(self.0 + secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
