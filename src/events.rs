// 12.0 events.rs: every state change produces an event. used for audit trails,
// state reconstruction, and notifying external systems. the EventPayload enum
// lists all event types.

use crate::oracle::OracleConfig;
use crate::types::{Address, BaseAmount, QuoteAmount, Shares, Tick, Timestamp, TokenSide};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Share events
    Mint(MintEvent),
    Burn(BurnEvent),

    // Fee events
    FeeAccrued(FeeAccruedEvent),
    FeeRateChanged(FeeRateChangedEvent),

    // Governance events
    OracleProposed(OracleProposedEvent),
    OracleAccepted(OracleAcceptedEvent),
    OracleRejected(OracleRejectedEvent),
    TargetProposed(TargetProposedEvent),
    TargetAccepted(TargetAcceptedEvent),
    TargetRejected(TargetRejectedEvent),
    GuardianChanged(GuardianChangedEvent),
    ManagerChanged(ManagerChangedEvent),

    // Position events
    Populated(PopulatedEvent),
    Retracted(RetractedEvent),
    StrategyWithdrawal(StrategyWithdrawalEvent),

    // Trade events
    Rebalanced(RebalancedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintEvent {
    pub recipient: Address,
    pub shares: Shares,
    pub base_in: BaseAmount,
    pub quote_in: QuoteAmount,
    pub locked: Shares,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnEvent {
    pub holder: Address,
    pub shares: Shares,
    pub base_out: BaseAmount,
    pub quote_out: QuoteAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeAccruedEvent {
    pub recipient: Address,
    pub minted: Shares,
    pub total_supply: Shares,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRateChangedEvent {
    pub old_rate: u64,
    pub new_rate: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleProposedEvent {
    pub config: OracleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleAcceptedEvent {
    pub config: OracleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRejectedEvent {
    pub config: OracleConfig,
    pub guardian: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetProposedEvent {
    pub target: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetAcceptedEvent {
    pub target: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRejectedEvent {
    pub target: Address,
    pub guardian: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianChangedEvent {
    pub old_guardian: Address,
    pub new_guardian: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerChangedEvent {
    pub old_manager: Address,
    pub new_manager: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulatedEvent {
    pub ask_levels: usize,
    pub bid_levels: usize,
    pub base_committed: BaseAmount,
    pub quote_committed: QuoteAmount,
    pub oracle_tick: Tick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetractedEvent {
    pub from_index: u32,
    pub to_index: u32,
    pub base_freed: BaseAmount,
    pub quote_freed: QuoteAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyWithdrawalEvent {
    pub base_out: BaseAmount,
    pub quote_out: QuoteAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancedEvent {
    pub target: Address,
    pub sell: TokenSide,
    pub sent: u128,
    pub received: u128,
    pub realized_tick: Option<Tick>,
    pub oracle_tick: Tick,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

// 12.1: bounded in-engine audit buffer. oldest events fall off the front once
// max_events is reached; verbose mode prints each event as it lands.
#[derive(Debug)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
    verbose: bool,
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCollector {
    pub fn new() -> Self {
        Self::with_config(10_000, false)
    }

    pub fn with_config(max_events: usize, verbose: bool) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events: max_events.max(1),
            verbose,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        if self.verbose {
            println!("[event {}] t={} {:?}", event.id.0, event.timestamp, event.payload);
        }
        if self.events.len() >= self.max_events {
            self.events.remove(0);
        }
        self.events.push(event);
    }
}
