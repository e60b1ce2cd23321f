// 10.0 strategy.rs: the liquidity-management collaborator. it holds a slice of
// vault funds as resting market-making positions and exposes synchronous
// deposit/withdraw/populate/retract primitives. every call is revertible and a
// revert aborts the enclosing vault operation; the vault re-measures its own
// token balances after each call rather than trusting what the strategy reports.

use crate::distribution::Distribution;
use crate::tokens::{TokenError, TokenPair};
use crate::types::{Address, BaseAmount, QuoteAmount, TokenSide};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("strategy call reverted: {0}")]
    Reverted(String),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Placement parameters forwarded opaquely to the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Number of price points the strategy spreads liquidity across.
    pub price_points: u32,
    /// Index distance between a level and its dual on the other side.
    pub step_size: u32,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            price_points: 10,
            step_size: 1,
        }
    }
}

// 10.1: the collaborator interface. `from`/`to`/`recipient` are always the vault;
// token movement goes through the shared pair so balances stay observable.
pub trait Strategy {
    fn address(&self) -> Address;

    /// Move funds from the vault into strategy custody.
    fn deposit_funds(
        &mut self,
        base: BaseAmount,
        quote: QuoteAmount,
        from: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), StrategyError>;

    /// Move funds from strategy custody back to `to`.
    fn withdraw_funds(
        &mut self,
        base: BaseAmount,
        quote: QuoteAmount,
        to: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), StrategyError>;

    /// Retract all resting liquidity and return every held token to `to`.
    fn withdraw_all(
        &mut self,
        to: Address,
        tokens: &mut TokenPair,
    ) -> Result<(BaseAmount, QuoteAmount), StrategyError>;

    /// Commit a resting-liquidity layout, funding it with `base`/`quote`
    /// pulled from `from`. The caller has already price-validated `dist`.
    fn populate(
        &mut self,
        dist: &Distribution,
        params: &StrategyParams,
        base: BaseAmount,
        quote: QuoteAmount,
        from: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), StrategyError>;

    /// Retract price levels in [from_index, to_index), sending freed funds
    /// to `recipient`.
    fn retract(
        &mut self,
        from_index: u32,
        to_index: u32,
        recipient: Address,
        tokens: &mut TokenPair,
    ) -> Result<(BaseAmount, QuoteAmount), StrategyError>;

    /// Strategy-side custody of one token, resting orders included.
    fn reserve_balance(&self, side: TokenSide) -> u128;

    fn params(&self) -> StrategyParams;

    /// True while a populated distribution is live.
    fn is_active(&self) -> bool;
}

// trait objects don't auto derive Debug
impl std::fmt::Debug for Box<dyn Strategy + Send + Sync> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Strategy({})", self.address())
    }
}

// 10.2: mock strategy for tests and the simulator. custody is tracked in the
// shared token ledgers, so vault-side balance diffs behave exactly like they
// would against a real venue. `set_failing` makes every subsequent call revert.
pub struct MockStrategy {
    address: Address,
    params: StrategyParams,
    distribution: Option<Distribution>,
    reserve_base: u128,
    reserve_quote: u128,
    failing: bool,
}

impl MockStrategy {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            params: StrategyParams::default(),
            distribution: None,
            reserve_base: 0,
            reserve_quote: 0,
            failing: false,
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn distribution(&self) -> Option<&Distribution> {
        self.distribution.as_ref()
    }

    fn check_live(&self) -> Result<(), StrategyError> {
        if self.failing {
            Err(StrategyError::Reverted("strategy is failing".into()))
        } else {
            Ok(())
        }
    }
}

impl Strategy for MockStrategy {
    fn address(&self) -> Address {
        self.address
    }

    fn deposit_funds(
        &mut self,
        base: BaseAmount,
        quote: QuoteAmount,
        from: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), StrategyError> {
        self.check_live()?;
        tokens.base.transfer(from, self.address, base.value())?;
        tokens.quote.transfer(from, self.address, quote.value())?;
        self.reserve_base += base.value();
        self.reserve_quote += quote.value();
        Ok(())
    }

    fn withdraw_funds(
        &mut self,
        base: BaseAmount,
        quote: QuoteAmount,
        to: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), StrategyError> {
        self.check_live()?;
        if base.value() > self.reserve_base || quote.value() > self.reserve_quote {
            return Err(StrategyError::Reverted("withdraw exceeds reserves".into()));
        }
        tokens.base.transfer(self.address, to, base.value())?;
        tokens.quote.transfer(self.address, to, quote.value())?;
        self.reserve_base -= base.value();
        self.reserve_quote -= quote.value();
        Ok(())
    }

    fn withdraw_all(
        &mut self,
        to: Address,
        tokens: &mut TokenPair,
    ) -> Result<(BaseAmount, QuoteAmount), StrategyError> {
        self.check_live()?;
        let base = self.reserve_base;
        let quote = self.reserve_quote;
        tokens.base.transfer(self.address, to, base)?;
        tokens.quote.transfer(self.address, to, quote)?;
        self.reserve_base = 0;
        self.reserve_quote = 0;
        self.distribution = None;
        Ok((BaseAmount(base), QuoteAmount(quote)))
    }

    fn populate(
        &mut self,
        dist: &Distribution,
        params: &StrategyParams,
        base: BaseAmount,
        quote: QuoteAmount,
        from: Address,
        tokens: &mut TokenPair,
    ) -> Result<(), StrategyError> {
        self.check_live()?;
        tokens.base.transfer(from, self.address, base.value())?;
        tokens.quote.transfer(from, self.address, quote.value())?;
        self.reserve_base += base.value();
        self.reserve_quote += quote.value();
        self.params = *params;
        self.distribution = Some(dist.clone());
        Ok(())
    }

    fn retract(
        &mut self,
        _from_index: u32,
        _to_index: u32,
        recipient: Address,
        tokens: &mut TokenPair,
    ) -> Result<(BaseAmount, QuoteAmount), StrategyError> {
        self.check_live()?;
        // the mock retracts everything regardless of the index range
        let base = self.reserve_base;
        let quote = self.reserve_quote;
        tokens.base.transfer(self.address, recipient, base)?;
        tokens.quote.transfer(self.address, recipient, quote)?;
        self.reserve_base = 0;
        self.reserve_quote = 0;
        self.distribution = None;
        Ok((BaseAmount(base), QuoteAmount(quote)))
    }

    fn reserve_balance(&self, side: TokenSide) -> u128 {
        match side {
            TokenSide::Base => self.reserve_base,
            TokenSide::Quote => self.reserve_quote,
        }
    }

    fn params(&self) -> StrategyParams {
        self.params
    }

    fn is_active(&self) -> bool {
        self.distribution.is_some()
    }
}
