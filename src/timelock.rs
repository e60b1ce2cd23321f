// 4.0 timelock.rs: propose/accept/reject governance plumbing. the owner proposes,
// time unlocks, the guardian can veto at any moment. the generic proposal wrapper
// is shared by the oracle-config swap (oracle.rs) and the rebalance-target
// whitelist below.

use crate::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// 4.1: a value waiting out its timelock window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockedProposal<T> {
    pub value: T,
    pub proposed_at: Timestamp,
}

impl<T> TimelockedProposal<T> {
    pub fn new(value: T, proposed_at: Timestamp) -> Self {
        Self { value, proposed_at }
    }

    /// Locked while now - proposed_at < timelock_minutes * 60. A proposal
    /// stamped in the future is always locked.
    pub fn is_locked(&self, now: Timestamp, timelock_minutes: i64) -> bool {
        let elapsed = now.since(self.proposed_at);
        elapsed < timelock_minutes * 60
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelockError {
    #[error("caller {0} is not the owner")]
    NotOwner(Address),

    #[error("caller {0} is not the guardian")]
    NotGuardian(Address),

    #[error("proposal for {0} already pending; reject it first")]
    AlreadyProposed(Address),

    #[error("no pending proposal for {0}")]
    NoProposal(Address),

    #[error("proposal for {0} is still timelocked")]
    Timelocked(Address),

    #[error("target {0} is structurally ineligible for whitelisting")]
    IneligibleTarget(Address),
}

// 4.2: whitelist entry state for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub is_whitelisted: bool,
    pub proposed_at: Option<Timestamp>,
}

// 4.3: address-keyed timelock used for whitelisting rebalance targets. unlike the
// oracle slot there is no overwrite: a pending key must be rejected before it can
// be proposed again. the forbidden set holds addresses that may never be
// whitelisted (the strategy itself and both traded tokens) because routing a
// trade through them would bypass the downstream economic checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressTimelock {
    entries: HashMap<Address, WhitelistEntry>,
    forbidden: Vec<Address>,
    timelock_minutes: i64,
}

impl AddressTimelock {
    pub fn new(timelock_minutes: i64, forbidden: Vec<Address>) -> Self {
        Self {
            entries: HashMap::new(),
            forbidden,
            timelock_minutes,
        }
    }

    pub fn is_whitelisted(&self, target: Address) -> bool {
        self.entries
            .get(&target)
            .map(|e| e.is_whitelisted)
            .unwrap_or(false)
    }

    pub fn entry(&self, target: Address) -> Option<&WhitelistEntry> {
        self.entries.get(&target)
    }

    pub fn propose(&mut self, target: Address, now: Timestamp) -> Result<(), TimelockError> {
        if self.forbidden.contains(&target) {
            return Err(TimelockError::IneligibleTarget(target));
        }
        match self.entries.get(&target) {
            Some(e) if e.proposed_at.is_some() => Err(TimelockError::AlreadyProposed(target)),
            Some(e) if e.is_whitelisted => Err(TimelockError::AlreadyProposed(target)),
            _ => {
                self.entries.insert(
                    target,
                    WhitelistEntry {
                        is_whitelisted: false,
                        proposed_at: Some(now),
                    },
                );
                Ok(())
            }
        }
    }

    pub fn accept(&mut self, target: Address, now: Timestamp) -> Result<(), TimelockError> {
        let entry = self
            .entries
            .get_mut(&target)
            .ok_or(TimelockError::NoProposal(target))?;
        let proposed_at = entry.proposed_at.ok_or(TimelockError::NoProposal(target))?;
        let proposal = TimelockedProposal::new(target, proposed_at);
        if proposal.is_locked(now, self.timelock_minutes) {
            return Err(TimelockError::Timelocked(target));
        }
        entry.is_whitelisted = true;
        entry.proposed_at = None;
        Ok(())
    }

    /// Guardian veto: clears a pending proposal at any time, before or after
    /// its window elapses.
    pub fn reject(&mut self, target: Address) -> Result<(), TimelockError> {
        let entry = self
            .entries
            .get_mut(&target)
            .ok_or(TimelockError::NoProposal(target))?;
        if entry.proposed_at.is_none() {
            return Err(TimelockError::NoProposal(target));
        }
        if entry.is_whitelisted {
            entry.proposed_at = None;
        } else {
            self.entries.remove(&target);
        }
        Ok(())
    }

    pub fn timelock_minutes(&self) -> i64 {
        self.timelock_minutes
    }
}
