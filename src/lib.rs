// vault-core: oracle-gated vault engine.
// governance-first architecture: every pricing input and trade path changes
// only through timelocks, and every economic action is checked against the
// oracle deviation band. all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Tick, BaseAmount, QuoteAmount, Shares, Address
//   2.x  math.rs: 256-bit intermediate mul_div, floor and ceil
//   3.x  tick.rs: tick <-> price ratio conversion, realized-tick measurement
//   4.x  timelock.rs: timelocked proposals, rebalance-target whitelist
//   5.x  oracle.rs: oracle config slot, price feeds, governed swaps
//   6.x  distribution.rs: price-level layout and band validation
//   7.x  fees.rs: dilution-based management fee accrual
//   8.x  accounting.rs: share mint/burn sizing, minimum-liquidity floor
//   9.x  tokens.rs: token transfer trait, balance-diff discipline
//   10.x strategy.rs: liquidity-management collaborator interface
//   11.x rebalance.rs: gated trades through whitelisted targets
//   12.x events.rs: state transition events for audit
//   13.x config.rs: roles, caps, timelocks, env presets
//   14.x vault.rs: the engine root tying it all together

// core accounting modules
pub mod accounting;
pub mod fees;
pub mod math;
pub mod tick;
pub mod types;

// governance and safety modules
pub mod distribution;
pub mod oracle;
pub mod timelock;

// integration modules
pub mod config;
pub mod events;
pub mod rebalance;
pub mod strategy;
pub mod tokens;
pub mod vault;

// re exports for convenience
pub use accounting::*;
pub use distribution::*;
pub use events::*;
pub use fees::*;
pub use timelock::*;
pub use types::*;
pub use vault::*;
pub use config::{ConfigError, Roles, VaultConfig};
pub use oracle::{FeedId, MockPriceSource, OracleConfig, OracleEngine, OracleError, OracleKind, PriceSource};
pub use rebalance::{MockSwapVenue, RebalanceError, RebalanceOutcome, RebalanceTarget};
pub use strategy::{MockStrategy, Strategy, StrategyError, StrategyParams};
pub use tokens::{MockToken, TokenError, TokenLedger, TokenPair};
