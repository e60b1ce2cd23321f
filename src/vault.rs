// 14.0 vault.rs: the engine root. owns the token pair, the share ledger, the
// oracle engine, the fee clock, the target whitelist, and an optional strategy
// collaborator, and wires every operation through the same discipline: accrue
// fees first, price-check against the oracle band, never trust a callee, and
// re-sync the book from measured balances after any external call.

use crate::accounting::{self, AccountingError, MintAmounts, VaultPosition};
use crate::config::{ConfigError, Roles, VaultConfig};
use crate::distribution::{self, Distribution};
use crate::events::{
    BurnEvent, Event, EventCollector, EventEmitter, EventPayload, FeeAccruedEvent,
    FeeRateChangedEvent, GuardianChangedEvent, ManagerChangedEvent, MintEvent,
    OracleAcceptedEvent, OracleProposedEvent, OracleRejectedEvent, PopulatedEvent,
    RebalancedEvent, RetractedEvent, StrategyWithdrawalEvent, TargetAcceptedEvent,
    TargetProposedEvent, TargetRejectedEvent,
};
use crate::fees::{FeeError, FeeState};
use crate::oracle::{OracleConfig, OracleEngine, OracleError};
use crate::rebalance::{self, RebalanceContext, RebalanceError, RebalanceOutcome, RebalanceTarget};
use crate::strategy::{Strategy, StrategyError, StrategyParams};
use crate::timelock::{AddressTimelock, TimelockError};
use crate::tokens::{TokenError, TokenPair};
use crate::types::{Address, BaseAmount, QuoteAmount, Shares, Timestamp, TokenSide};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("reentrant call")]
    Reentrancy,

    #[error("caller {0} is not the owner")]
    NotOwner(Address),

    #[error("caller {0} is not the manager")]
    NotManager(Address),

    #[error("caller {0} is not the guardian")]
    NotGuardian(Address),

    #[error("no strategy is installed")]
    NoStrategy,

    #[error("distribution violates the oracle deviation band")]
    InvalidDistribution,

    #[error("token transfer moved {actual}, expected {expected}")]
    BalanceMismatch { expected: u128, actual: u128 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Timelock(#[from] TimelockError),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error(transparent)]
    Accounting(#[from] AccountingError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Rebalance(#[from] RebalanceError),
}

// 14.1: the engine. everything external (tokens, strategy, rebalance targets,
// price feeds) sits behind trait objects.
pub struct Vault {
    config: VaultConfig,
    roles: Roles,
    position: VaultPosition,
    balances: HashMap<Address, u128>,
    fees: FeeState,
    oracle: OracleEngine,
    whitelist: AddressTimelock,
    tokens: TokenPair,
    strategy: Option<Box<dyn Strategy + Send + Sync>>,
    events: EventCollector,
    entered: bool,
}

impl Vault {
    pub fn new(config: VaultConfig, tokens: TokenPair, now: Timestamp) -> Result<Self, VaultError> {
        config.validate()?;
        // the vault and its own tokens can never be rebalance targets
        let forbidden = vec![
            config.vault_address,
            tokens.base.address(),
            tokens.quote.address(),
        ];
        Ok(Self {
            roles: config.roles,
            fees: FeeState::new(config.initial_annual_fee, config.fee_recipient, now),
            oracle: OracleEngine::new(config.initial_oracle),
            whitelist: AddressTimelock::new(config.whitelist_timelock_minutes, forbidden),
            position: VaultPosition::default(),
            balances: HashMap::new(),
            tokens,
            strategy: None,
            events: EventCollector::with_config(config.max_events, config.verbose),
            entered: false,
            config,
        })
    }

    fn non_reentrant<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        if self.entered {
            return Err(VaultError::Reentrancy);
        }
        self.entered = true;
        let result = f(self);
        self.entered = false;
        result
    }

    fn require_owner(&self, caller: Address) -> Result<(), VaultError> {
        if !self.roles.is_owner(caller) {
            return Err(VaultError::NotOwner(caller));
        }
        Ok(())
    }

    fn require_manager(&self, caller: Address) -> Result<(), VaultError> {
        if !self.roles.is_manager(caller) {
            return Err(VaultError::NotManager(caller));
        }
        Ok(())
    }

    fn emit(&mut self, now: Timestamp, payload: EventPayload) {
        let id = self.events.next_id();
        self.events.emit(Event::new(id, now, payload));
    }

    // 14.2: fee accrual, pulled at the top of every state-changing call. the
    // dilution mints straight into the fee recipient's share balance.
    fn accrue(&mut self, now: Timestamp) -> Result<(), VaultError> {
        let minted = self.fees.accrue(now, self.position.total_shares)?;
        if minted.is_zero() {
            return Ok(());
        }
        self.position.total_shares = self
            .position
            .total_shares
            .checked_add(minted)
            .ok_or(AccountingError::Overflow)?;
        *self.balances.entry(self.fees.recipient).or_insert(0) += minted.value();
        self.emit(
            now,
            EventPayload::FeeAccrued(FeeAccruedEvent {
                recipient: self.fees.recipient,
                minted,
                total_supply: self.position.total_shares,
            }),
        );
        Ok(())
    }

    /// Re-measure both legs of the book: local from the token ledgers, strategy
    /// from strategy-side custody.
    fn resync(&mut self) {
        let vault = self.config.vault_address;
        self.position.local_base = BaseAmount(self.tokens.base.balance_of(vault));
        self.position.local_quote = QuoteAmount(self.tokens.quote.balance_of(vault));
        let (sb, sq) = match &self.strategy {
            Some(s) => (
                s.reserve_balance(TokenSide::Base),
                s.reserve_balance(TokenSide::Quote),
            ),
            None => (0, 0),
        };
        self.position.strategy_base = BaseAmount(sb);
        self.position.strategy_quote = QuoteAmount(sq);
    }

    /// Pull `amount` of one token from `from`, verifying the measured delta
    /// matches what the ledger claims to have moved.
    fn pull_exact(
        &mut self,
        side: TokenSide,
        from: Address,
        amount: u128,
    ) -> Result<(), VaultError> {
        if amount == 0 {
            return Ok(());
        }
        let vault = self.config.vault_address;
        let before = self.tokens.side(side).balance_of(vault);
        self.tokens.side_mut(side).transfer(from, vault, amount)?;
        let actual = self
            .tokens
            .side(side)
            .balance_of(vault)
            .saturating_sub(before);
        if actual != amount {
            return Err(VaultError::BalanceMismatch {
                expected: amount,
                actual,
            });
        }
        Ok(())
    }

    // ---- share operations ----

    // 14.3: deposit. first mint is oracle-priced with the minimum-liquidity
    // floor burned to the zero address; every later mint is strictly
    // proportional to live reserves.
    pub fn mint(
        &mut self,
        caller: Address,
        max_base: u128,
        max_quote: u128,
        min_shares: u128,
        now: Timestamp,
    ) -> Result<MintAmounts, VaultError> {
        self.non_reentrant(|v| {
            v.accrue(now)?;
            let (oracle_tick, max_deviation) = v.oracle.band()?;

            let mint = if v.position.total_shares.is_zero() {
                accounting::initial_mint_amounts(oracle_tick, max_deviation, max_base, max_quote)?
            } else {
                accounting::shares_for_deposit(&v.position, max_base, max_quote)?
            };

            if mint.shares.value() < min_shares {
                return Err(AccountingError::SlippageExceeded {
                    shares: mint.shares.value(),
                    min: min_shares,
                }
                .into());
            }

            let new_base = v
                .position
                .total_base()
                .value()
                .checked_add(mint.base_in.value())
                .ok_or(AccountingError::Overflow)?;
            let new_quote = v
                .position
                .total_quote()
                .value()
                .checked_add(mint.quote_in.value())
                .ok_or(AccountingError::Overflow)?;
            if new_base > v.config.max_base_total {
                return Err(AccountingError::CapExceeded(TokenSide::Base).into());
            }
            if new_quote > v.config.max_quote_total {
                return Err(AccountingError::CapExceeded(TokenSide::Quote).into());
            }

            // both legs must be funded before either transfer runs, otherwise a
            // failed second pull strands the first leg in the pool
            for (side, needed) in [
                (TokenSide::Base, mint.base_in.value()),
                (TokenSide::Quote, mint.quote_in.value()),
            ] {
                let available = v.tokens.side(side).balance_of(caller);
                if available < needed {
                    return Err(TokenError::InsufficientBalance {
                        requested: needed,
                        available,
                    }
                    .into());
                }
            }
            v.pull_exact(TokenSide::Base, caller, mint.base_in.value())?;
            v.pull_exact(TokenSide::Quote, caller, mint.quote_in.value())?;

            let total_minted = mint
                .shares
                .checked_add(mint.locked)
                .ok_or(AccountingError::Overflow)?;
            v.position.total_shares = v
                .position
                .total_shares
                .checked_add(total_minted)
                .ok_or(AccountingError::Overflow)?;
            v.position.locked_shares = v
                .position
                .locked_shares
                .checked_add(mint.locked)
                .ok_or(AccountingError::Overflow)?;
            *v.balances.entry(caller).or_insert(0) += mint.shares.value();
            if !mint.locked.is_zero() {
                *v.balances.entry(Address(0)).or_insert(0) += mint.locked.value();
            }
            v.resync();

            v.emit(
                now,
                EventPayload::Mint(MintEvent {
                    recipient: caller,
                    shares: mint.shares,
                    base_in: mint.base_in,
                    quote_in: mint.quote_in,
                    locked: mint.locked,
                }),
            );
            Ok(mint)
        })
    }

    // 14.4: redemption. proportional to TOTAL balances; if local funds cannot
    // cover the payout the strategy is fully withdrawn and the claim re-sized
    // against what actually came back.
    pub fn burn(
        &mut self,
        caller: Address,
        shares: Shares,
        min_base_out: u128,
        min_quote_out: u128,
        now: Timestamp,
    ) -> Result<(BaseAmount, QuoteAmount), VaultError> {
        self.non_reentrant(|v| {
            v.accrue(now)?;

            let held = v.balances.get(&caller).copied().unwrap_or(0);
            if shares.value() > held {
                return Err(AccountingError::InsufficientShares.into());
            }

            let (mut base_out, mut quote_out) = accounting::amounts_for_burn(&v.position, shares)?;
            if base_out.value() > v.position.local_base.value()
                || quote_out.value() > v.position.local_quote.value()
            {
                if let Some(strategy) = v.strategy.as_deref_mut() {
                    strategy.withdraw_all(v.config.vault_address, &mut v.tokens)?;
                }
                v.resync();
                let resized = accounting::amounts_for_burn(&v.position, shares)?;
                base_out = resized.0;
                quote_out = resized.1;
            }

            if base_out.value() < min_base_out || quote_out.value() < min_quote_out {
                return Err(AccountingError::BurnSlippageExceeded.into());
            }

            let vault = v.config.vault_address;
            v.tokens
                .base
                .transfer(vault, caller, base_out.value())?;
            v.tokens
                .quote
                .transfer(vault, caller, quote_out.value())?;

            *v.balances.entry(caller).or_insert(0) -= shares.value();
            v.position.total_shares = v
                .position
                .total_shares
                .checked_sub(shares)
                .ok_or(AccountingError::Overflow)?;
            v.resync();

            v.emit(
                now,
                EventPayload::Burn(BurnEvent {
                    holder: caller,
                    shares,
                    base_out,
                    quote_out,
                }),
            );
            Ok((base_out, quote_out))
        })
    }

    // ---- strategy operations ----

    pub fn set_strategy(
        &mut self,
        caller: Address,
        strategy: Box<dyn Strategy + Send + Sync>,
    ) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        self.strategy = Some(strategy);
        self.resync();
        Ok(())
    }

    // 14.5: commit a resting-liquidity layout. the distribution's worst active
    // tick on each side must clear the oracle band before any funds move.
    pub fn populate(
        &mut self,
        caller: Address,
        dist: &Distribution,
        params: &StrategyParams,
        base: BaseAmount,
        quote: QuoteAmount,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.non_reentrant(|v| {
            v.require_manager(caller)?;
            v.accrue(now)?;
            let (oracle_tick, max_deviation) = v.oracle.band()?;
            if !distribution::validate(dist, oracle_tick, max_deviation) {
                return Err(VaultError::InvalidDistribution);
            }

            let strategy = v.strategy.as_deref_mut().ok_or(VaultError::NoStrategy)?;
            strategy.populate(dist, params, base, quote, v.config.vault_address, &mut v.tokens)?;
            v.resync();

            v.emit(
                now,
                EventPayload::Populated(PopulatedEvent {
                    ask_levels: dist.asks.len(),
                    bid_levels: dist.bids.len(),
                    base_committed: base,
                    quote_committed: quote,
                    oracle_tick,
                }),
            );
            Ok(())
        })
    }

    /// Retract price levels in [from_index, to_index); freed funds land back in
    /// local custody.
    pub fn retract(
        &mut self,
        caller: Address,
        from_index: u32,
        to_index: u32,
        now: Timestamp,
    ) -> Result<(BaseAmount, QuoteAmount), VaultError> {
        self.non_reentrant(|v| {
            v.require_manager(caller)?;
            v.accrue(now)?;

            let strategy = v.strategy.as_deref_mut().ok_or(VaultError::NoStrategy)?;
            let (base_freed, quote_freed) =
                strategy.retract(from_index, to_index, v.config.vault_address, &mut v.tokens)?;
            v.resync();

            v.emit(
                now,
                EventPayload::Retracted(RetractedEvent {
                    from_index,
                    to_index,
                    base_freed,
                    quote_freed,
                }),
            );
            Ok((base_freed, quote_freed))
        })
    }

    pub fn withdraw_from_strategy(
        &mut self,
        caller: Address,
        base: BaseAmount,
        quote: QuoteAmount,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.non_reentrant(|v| {
            v.require_manager(caller)?;
            v.accrue(now)?;

            let strategy = v.strategy.as_deref_mut().ok_or(VaultError::NoStrategy)?;
            strategy.withdraw_funds(base, quote, v.config.vault_address, &mut v.tokens)?;
            v.resync();

            v.emit(
                now,
                EventPayload::StrategyWithdrawal(StrategyWithdrawalEvent {
                    base_out: base,
                    quote_out: quote,
                }),
            );
            Ok(())
        })
    }

    // 14.6: trade through a whitelisted target. everything economic happens in
    // rebalance::execute; this wrapper only does roles, accrual, the band
    // lookup, and the post-trade resync.
    pub fn rebalance(
        &mut self,
        caller: Address,
        target: &mut dyn RebalanceTarget,
        sell: TokenSide,
        amount_in: u128,
        min_amount_out: u128,
        payload: &[u8],
        withdraw_all: bool,
        now: Timestamp,
    ) -> Result<RebalanceOutcome, VaultError> {
        self.non_reentrant(|v| {
            v.require_manager(caller)?;
            v.accrue(now)?;
            let (oracle_tick, max_deviation) = v.oracle.band()?;

            let ctx = RebalanceContext {
                whitelist: &v.whitelist,
                oracle_tick,
                max_deviation,
                vault: v.config.vault_address,
                tokens: &mut v.tokens,
                strategy: v.strategy.as_deref_mut(),
            };
            let outcome = rebalance::execute(
                ctx,
                target,
                sell,
                amount_in,
                min_amount_out,
                payload,
                withdraw_all,
            )?;
            v.resync();

            let target_addr = target.address();
            v.emit(
                now,
                EventPayload::Rebalanced(RebalancedEvent {
                    target: target_addr,
                    sell,
                    sent: outcome.sent,
                    received: outcome.received,
                    realized_tick: outcome.realized_tick,
                    oracle_tick,
                }),
            );
            Ok(outcome)
        })
    }

    // ---- governance ----

    pub fn propose_oracle(
        &mut self,
        caller: Address,
        candidate: OracleConfig,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.accrue(now)?;
        self.oracle.propose_config(candidate, caller, &self.roles, now)?;
        self.emit(
            now,
            EventPayload::OracleProposed(OracleProposedEvent { config: candidate }),
        );
        Ok(())
    }

    pub fn accept_oracle(&mut self, caller: Address, now: Timestamp) -> Result<(), VaultError> {
        self.accrue(now)?;
        self.oracle.accept_config(caller, &self.roles, now)?;
        let config = *self.oracle.active_config();
        self.emit(
            now,
            EventPayload::OracleAccepted(OracleAcceptedEvent { config }),
        );
        Ok(())
    }

    pub fn reject_oracle(&mut self, caller: Address, now: Timestamp) -> Result<(), VaultError> {
        if !self.roles.is_guardian(caller) {
            return Err(VaultError::NotGuardian(caller));
        }
        let rejected = self
            .oracle
            .pending_config()
            .map(|p| p.value)
            .ok_or(OracleError::NoProposal)?;
        self.oracle.reject_config(caller, &self.roles)?;
        self.emit(
            now,
            EventPayload::OracleRejected(OracleRejectedEvent {
                config: rejected,
                guardian: caller,
            }),
        );
        Ok(())
    }

    pub fn propose_target(
        &mut self,
        caller: Address,
        target: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        self.accrue(now)?;
        self.whitelist.propose(target, now)?;
        self.emit(
            now,
            EventPayload::TargetProposed(TargetProposedEvent { target }),
        );
        Ok(())
    }

    pub fn accept_target(
        &mut self,
        caller: Address,
        target: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        self.accrue(now)?;
        self.whitelist.accept(target, now)?;
        self.emit(
            now,
            EventPayload::TargetAccepted(TargetAcceptedEvent { target }),
        );
        Ok(())
    }

    pub fn reject_target(
        &mut self,
        caller: Address,
        target: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        if !self.roles.is_guardian(caller) {
            return Err(TimelockError::NotGuardian(caller).into());
        }
        self.whitelist.reject(target)?;
        self.emit(
            now,
            EventPayload::TargetRejected(TargetRejectedEvent {
                target,
                guardian: caller,
            }),
        );
        Ok(())
    }

    pub fn set_fee_rate(&mut self, caller: Address, rate: u64, now: Timestamp) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        // settle the old rate up to now before the new one takes over
        self.accrue(now)?;
        let old_rate = self.fees.annual_rate;
        self.fees.set_rate(rate, self.config.max_annual_fee)?;
        self.emit(
            now,
            EventPayload::FeeRateChanged(FeeRateChangedEvent {
                old_rate,
                new_rate: rate,
            }),
        );
        Ok(())
    }

    pub fn set_fee_recipient(
        &mut self,
        caller: Address,
        recipient: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        self.accrue(now)?;
        self.fees.set_recipient(recipient);
        Ok(())
    }

    /// Guardian self-transfer: only the sitting guardian names a successor,
    /// so a compromised owner cannot strip the veto. Never touches the fee
    /// clock; it has to work even when accrual arithmetic is wedged.
    pub fn set_guardian(
        &mut self,
        caller: Address,
        new_guardian: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        if !self.roles.is_guardian(caller) {
            return Err(VaultError::NotGuardian(caller));
        }
        let old_guardian = self.roles.guardian;
        self.roles.guardian = new_guardian;
        self.emit(
            now,
            EventPayload::GuardianChanged(GuardianChangedEvent {
                old_guardian,
                new_guardian,
            }),
        );
        Ok(())
    }

    pub fn set_manager(
        &mut self,
        caller: Address,
        new_manager: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        self.accrue(now)?;
        let old_manager = self.roles.manager;
        self.roles.manager = new_manager;
        self.emit(
            now,
            EventPayload::ManagerChanged(ManagerChangedEvent {
                old_manager,
                new_manager,
            }),
        );
        Ok(())
    }

    pub fn set_caps(
        &mut self,
        caller: Address,
        max_base_total: u128,
        max_quote_total: u128,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        self.accrue(now)?;
        // existing balances are untouched, only new deposits are bounded
        self.config.max_base_total = max_base_total;
        self.config.max_quote_total = max_quote_total;
        Ok(())
    }

    pub fn register_feed(
        &mut self,
        caller: Address,
        id: crate::oracle::FeedId,
        feed: Box<dyn crate::oracle::PriceSource + Send + Sync>,
    ) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        self.oracle.register_feed(id, feed);
        Ok(())
    }

    // ---- views ----

    pub fn position(&self) -> &VaultPosition {
        &self.position
    }

    /// Combined local-plus-strategy holdings per token.
    pub fn total_balances(&self) -> (BaseAmount, QuoteAmount) {
        (self.position.total_base(), self.position.total_quote())
    }

    pub fn fee_state(&self) -> &FeeState {
        &self.fees
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn oracle(&self) -> &OracleEngine {
        &self.oracle
    }

    pub fn whitelist(&self) -> &AddressTimelock {
        &self.whitelist
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn share_balance_of(&self, holder: Address) -> Shares {
        Shares(self.balances.get(&holder).copied().unwrap_or(0))
    }

    /// Size a deposit without touching state. Accrual between now and the real
    /// mint can shift the answer slightly.
    pub fn preview_mint(&self, max_base: u128, max_quote: u128) -> Result<MintAmounts, VaultError> {
        let (oracle_tick, max_deviation) = self.oracle.band()?;
        let mint = if self.position.total_shares.is_zero() {
            accounting::initial_mint_amounts(oracle_tick, max_deviation, max_base, max_quote)?
        } else {
            accounting::shares_for_deposit(&self.position, max_base, max_quote)?
        };
        Ok(mint)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("position", &self.position)
            .field("fees", &self.fees)
            .field("oracle", &self.oracle)
            .field("strategy", &self.strategy.is_some())
            .finish()
    }
}
