// 5.0 oracle.rs: price oracle resolution + the timelocked config swap. the active
// config decides where price truth comes from (a static tick or a registered
// feed); changing it takes an owner proposal, a timelock window, and survives a
// guardian veto. splitting propose (owner) from veto (guardian) bounds the blast
// radius of either key: a stolen owner key cannot redirect price truth inside the
// window, a stolen guardian key can only block.

use crate::config::Roles;
use crate::timelock::TimelockedProposal;
use crate::types::{Address, Tick, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle for a registered dynamic price feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedId(pub u32);

// 5.1: where the oracle tick comes from. exactly one variant governs resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleKind {
    /// Fixed tick, set at config time.
    Static(Tick),
    /// Resolved live from a registered feed.
    Feed(FeedId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub kind: OracleKind,
    /// Inclusive tick distance allowed between the oracle and any proposed or
    /// realized price.
    pub max_deviation_ticks: u32,
    /// Window a successor config must wait before acceptance.
    pub timelock_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("caller {0} is not the owner")]
    NotOwner(Address),

    #[error("caller {0} is not the guardian")]
    NotGuardian(Address),

    #[error("oracle price is unavailable")]
    OracleUnavailable,

    #[error("proposed oracle config is invalid: {0}")]
    InvalidOracle(String),

    #[error("pending oracle config is still timelocked")]
    Timelocked,

    #[error("no pending oracle config")]
    NoProposal,
}

/// External price feed collaborator. Read-only; the engine never mutates it.
pub trait PriceSource {
    fn name(&self) -> &str;

    fn current_tick(&self) -> Result<Tick, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("price source failed: {0}")]
pub struct SourceError(pub String);

// trait objects don't auto derive Debug
impl std::fmt::Debug for Box<dyn PriceSource + Send + Sync> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PriceSource({})", self.name())
    }
}

// 5.2: the engine. one active config, at most one pending proposal.
#[derive(Debug)]
pub struct OracleEngine {
    active: OracleConfig,
    pending: Option<TimelockedProposal<OracleConfig>>,
    feeds: HashMap<FeedId, Box<dyn PriceSource + Send + Sync>>,
}

impl OracleEngine {
    /// The initial config is active immediately; only later swaps go through
    /// the timelock.
    pub fn new(initial: OracleConfig) -> Self {
        Self {
            active: initial,
            pending: None,
            feeds: HashMap::new(),
        }
    }

    pub fn register_feed(&mut self, id: FeedId, feed: Box<dyn PriceSource + Send + Sync>) {
        self.feeds.insert(id, feed);
    }

    pub fn active_config(&self) -> &OracleConfig {
        &self.active
    }

    pub fn pending_config(&self) -> Option<&TimelockedProposal<OracleConfig>> {
        self.pending.as_ref()
    }

    pub fn max_deviation(&self) -> u32 {
        self.active.max_deviation_ticks
    }

    /// Resolve the current oracle tick from the active config.
    pub fn current_tick(&self) -> Result<Tick, OracleError> {
        self.resolve(&self.active)
            .map_err(|_| OracleError::OracleUnavailable)
    }

    /// Current tick plus the active deviation bound, the pair every price
    /// check needs.
    pub fn band(&self) -> Result<(Tick, u32), OracleError> {
        Ok((self.current_tick()?, self.active.max_deviation_ticks))
    }

    // 5.3: propose validates the candidate NOW. a config that cannot resolve a
    // sane tick today never enters the pending slot; a prior pending proposal
    // is overwritten unconditionally.
    pub fn propose_config(
        &mut self,
        candidate: OracleConfig,
        caller: Address,
        roles: &Roles,
        now: Timestamp,
    ) -> Result<(), OracleError> {
        if caller != roles.owner {
            return Err(OracleError::NotOwner(caller));
        }
        if candidate.timelock_minutes < 0 {
            return Err(OracleError::InvalidOracle("negative timelock".into()));
        }
        self.resolve(&candidate)?;
        self.pending = Some(TimelockedProposal::new(candidate, now));
        Ok(())
    }

    /// Acceptance is gated by the ACTIVE config's timelock, so a candidate
    /// cannot smuggle in a shorter window for its own activation.
    pub fn accept_config(
        &mut self,
        caller: Address,
        roles: &Roles,
        now: Timestamp,
    ) -> Result<(), OracleError> {
        if caller != roles.owner {
            return Err(OracleError::NotOwner(caller));
        }
        let pending = self.pending.as_ref().ok_or(OracleError::NoProposal)?;
        if pending.is_locked(now, self.active.timelock_minutes) {
            return Err(OracleError::Timelocked);
        }
        self.active = pending.value;
        self.pending = None;
        Ok(())
    }

    /// Guardian veto: clears the pending slot at any time, pre- or post-expiry.
    pub fn reject_config(&mut self, caller: Address, roles: &Roles) -> Result<(), OracleError> {
        if caller != roles.guardian {
            return Err(OracleError::NotGuardian(caller));
        }
        if self.pending.is_none() {
            return Err(OracleError::NoProposal);
        }
        self.pending = None;
        Ok(())
    }

    fn resolve(&self, cfg: &OracleConfig) -> Result<Tick, OracleError> {
        match cfg.kind {
            OracleKind::Static(tick) => {
                if tick.is_in_range() {
                    Ok(tick)
                } else {
                    Err(OracleError::InvalidOracle(format!(
                        "static tick {} out of range",
                        tick
                    )))
                }
            }
            OracleKind::Feed(id) => {
                let feed = self.feeds.get(&id).ok_or_else(|| {
                    OracleError::InvalidOracle(format!("feed {:?} is not registered", id))
                })?;
                let tick = feed
                    .current_tick()
                    .map_err(|e| OracleError::InvalidOracle(e.to_string()))?;
                if tick.is_in_range() {
                    Ok(tick)
                } else {
                    Err(OracleError::InvalidOracle(format!(
                        "feed tick {} out of range",
                        tick
                    )))
                }
            }
        }
    }
}

// 5.4: mock feed for tests and the simulator.
pub struct MockPriceSource {
    name: String,
    tick: Tick,
    healthy: bool,
}

impl MockPriceSource {
    pub fn new(name: &str, tick: Tick) -> Self {
        Self {
            name: name.to_string(),
            tick,
            healthy: true,
        }
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    pub fn set_healthy(&mut self, healthy: bool) {
        self.healthy = healthy;
    }
}

impl PriceSource for MockPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn current_tick(&self) -> Result<Tick, SourceError> {
        if self.healthy {
            Ok(self.tick)
        } else {
            Err(SourceError("feed reverted".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_TICK;

    fn roles() -> Roles {
        Roles {
            owner: Address(1),
            guardian: Address(2),
            manager: Address(3),
        }
    }

    fn static_cfg(tick: i32, timelock_minutes: i64) -> OracleConfig {
        OracleConfig {
            kind: OracleKind::Static(Tick(tick)),
            max_deviation_ticks: 100,
            timelock_minutes,
        }
    }

    fn t(secs: i64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    #[test]
    fn static_resolution() {
        let oracle = OracleEngine::new(static_cfg(1234, 60));
        assert_eq!(oracle.current_tick(), Ok(Tick(1234)));
        assert_eq!(oracle.band(), Ok((Tick(1234), 100)));
    }

    #[test]
    fn feed_resolution_and_failure() {
        let mut cfg = static_cfg(0, 60);
        cfg.kind = OracleKind::Feed(FeedId(1));
        let mut oracle = OracleEngine::new(cfg);

        // unregistered feed: unavailable, not a panic
        assert_eq!(oracle.current_tick(), Err(OracleError::OracleUnavailable));

        oracle.register_feed(FeedId(1), Box::new(MockPriceSource::new("mock", Tick(500))));
        assert_eq!(oracle.current_tick(), Ok(Tick(500)));
    }

    #[test]
    fn reverting_feed_is_unavailable() {
        let mut cfg = static_cfg(0, 60);
        cfg.kind = OracleKind::Feed(FeedId(1));
        let mut oracle = OracleEngine::new(cfg);
        let mut feed = MockPriceSource::new("mock", Tick(500));
        feed.set_healthy(false);
        oracle.register_feed(FeedId(1), Box::new(feed));
        assert_eq!(oracle.current_tick(), Err(OracleError::OracleUnavailable));
    }

    #[test]
    fn propose_requires_owner() {
        let mut oracle = OracleEngine::new(static_cfg(0, 60));
        let err = oracle
            .propose_config(static_cfg(10, 60), Address(99), &roles(), t(0))
            .unwrap_err();
        assert_eq!(err, OracleError::NotOwner(Address(99)));
    }

    #[test]
    fn propose_validates_candidate_now() {
        let mut oracle = OracleEngine::new(static_cfg(0, 60));

        // out-of-range static tick
        let err = oracle
            .propose_config(static_cfg(MAX_TICK + 1, 60), Address(1), &roles(), t(0))
            .unwrap_err();
        assert!(matches!(err, OracleError::InvalidOracle(_)));

        // unregistered feed ("no code at the handle")
        let mut cfg = static_cfg(0, 60);
        cfg.kind = OracleKind::Feed(FeedId(9));
        let err = oracle
            .propose_config(cfg, Address(1), &roles(), t(0))
            .unwrap_err();
        assert!(matches!(err, OracleError::InvalidOracle(_)));

        // reverting feed
        let mut feed = MockPriceSource::new("mock", Tick(0));
        feed.set_healthy(false);
        oracle.register_feed(FeedId(9), Box::new(feed));
        let err = oracle
            .propose_config(cfg, Address(1), &roles(), t(0))
            .unwrap_err();
        assert!(matches!(err, OracleError::InvalidOracle(_)));
    }

    #[test]
    fn accept_respects_active_timelock() {
        let mut oracle = OracleEngine::new(static_cfg(0, 60));
        oracle
            .propose_config(static_cfg(50, 60), Address(1), &roles(), t(1_000))
            .unwrap();

        // one second early: still locked
        assert_eq!(
            oracle.accept_config(Address(1), &roles(), t(1_000 + 3_599)),
            Err(OracleError::Timelocked)
        );
        // exactly at the window: accepted, pending slot cleared
        oracle.accept_config(Address(1), &roles(), t(1_000 + 3_600)).unwrap();
        assert_eq!(oracle.current_tick(), Ok(Tick(50)));
        assert!(oracle.pending_config().is_none());
        assert_eq!(
            oracle.accept_config(Address(1), &roles(), t(10_000)),
            Err(OracleError::NoProposal)
        );
    }

    #[test]
    fn candidate_cannot_shorten_its_own_window() {
        let mut oracle = OracleEngine::new(static_cfg(0, 60));
        // candidate claims a zero-minute timelock
        oracle
            .propose_config(static_cfg(50, 0), Address(1), &roles(), t(0))
            .unwrap();
        // still gated by the active 60 minute window
        assert_eq!(
            oracle.accept_config(Address(1), &roles(), t(1)),
            Err(OracleError::Timelocked)
        );
    }

    #[test]
    fn repropose_overwrites_pending() {
        let mut oracle = OracleEngine::new(static_cfg(0, 60));
        oracle.propose_config(static_cfg(10, 60), Address(1), &roles(), t(0)).unwrap();
        oracle.propose_config(static_cfg(20, 60), Address(1), &roles(), t(3_000)).unwrap();

        // clock restarts at the second proposal
        assert_eq!(
            oracle.accept_config(Address(1), &roles(), t(3_600)),
            Err(OracleError::Timelocked)
        );
        oracle.accept_config(Address(1), &roles(), t(3_000 + 3_600)).unwrap();
        assert_eq!(oracle.current_tick(), Ok(Tick(20)));
    }

    #[test]
    fn guardian_veto() {
        let mut oracle = OracleEngine::new(static_cfg(0, 60));
        oracle.propose_config(static_cfg(10, 60), Address(1), &roles(), t(0)).unwrap();

        // owner cannot veto
        assert_eq!(
            oracle.reject_config(Address(1), &roles()),
            Err(OracleError::NotGuardian(Address(1)))
        );
        // guardian can, immediately
        oracle.reject_config(Address(2), &roles()).unwrap();
        assert_eq!(oracle.reject_config(Address(2), &roles()), Err(OracleError::NoProposal));

        // and also after the window has elapsed
        oracle.propose_config(static_cfg(10, 60), Address(1), &roles(), t(0)).unwrap();
        oracle.reject_config(Address(2), &roles()).unwrap();
        assert_eq!(oracle.current_tick(), Ok(Tick(0)));
    }
}
