// 13.0 config.rs: all settings in one place. roles, caps, timelocks, fee bounds.
// 13.1 Roles is threaded by reference through every permissioned entry point.

use crate::oracle::{OracleConfig, OracleKind};
use crate::types::{Address, Tick};
use serde::{Deserialize, Serialize};

// The three permissioned actors. Owner governs, guardian vetoes, manager
// operates day to day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub owner: Address,
    pub guardian: Address,
    pub manager: Address,
}

impl Roles {
    pub fn single(owner: Address) -> Self {
        Self {
            owner,
            guardian: owner,
            manager: owner,
        }
    }

    pub fn is_owner(&self, caller: Address) -> bool {
        caller == self.owner
    }

    pub fn is_guardian(&self, caller: Address) -> bool {
        caller == self.guardian
    }

    /// Owner can always do what the manager can.
    pub fn is_manager(&self, caller: Address) -> bool {
        caller == self.manager || caller == self.owner
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid oracle config: {reason}")]
    InvalidOracle { reason: String },

    #[error("invalid fee config: {reason}")]
    InvalidFees { reason: String },

    #[error("invalid roles: {reason}")]
    InvalidRoles { reason: String },
}

// Complete configuration for one vault instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub roles: Roles,
    // The vault's own address, holder of local token balances
    pub vault_address: Address,
    // Deposit caps per token; u128::MAX means uncapped
    pub max_base_total: u128,
    pub max_quote_total: u128,
    // Oracle config the vault starts with (no timelock on genesis)
    pub initial_oracle: OracleConfig,
    // Timelock applied to rebalance-target whitelisting, minutes
    pub whitelist_timelock_minutes: i64,
    // Ceiling on the annual management fee, units of 1/100_000
    pub max_annual_fee: u64,
    // Annual management fee at genesis
    pub initial_annual_fee: u64,
    // Where accrued fee shares are minted
    pub fee_recipient: Address,
    // Audit buffer size and whether events print as they land
    pub max_events: usize,
    pub verbose: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            roles: Roles::single(Address(1)),
            vault_address: Address(100),
            max_base_total: u128::MAX,
            max_quote_total: u128::MAX,
            initial_oracle: OracleConfig {
                kind: OracleKind::Static(Tick(0)),
                max_deviation_ticks: 100,
                timelock_minutes: 60,
            },
            whitelist_timelock_minutes: 60,
            max_annual_fee: 10_000, // 10%
            initial_annual_fee: 0,
            fee_recipient: Address(1),
            max_events: 10_000,
            verbose: false,
        }
    }
}

impl VaultConfig {
    // Tight band, day-long timelocks. For value-bearing deployments.
    pub fn conservative() -> Self {
        Self {
            initial_oracle: OracleConfig {
                kind: OracleKind::Static(Tick(0)),
                max_deviation_ticks: 50,
                timelock_minutes: 1_440,
            },
            whitelist_timelock_minutes: 1_440,
            max_annual_fee: 2_000, // 2%
            ..Self::default()
        }
    }

    // Wide band, no timelocks. For tests and local simulation.
    pub fn permissive() -> Self {
        Self {
            initial_oracle: OracleConfig {
                kind: OracleKind::Static(Tick(0)),
                max_deviation_ticks: 10_000,
                timelock_minutes: 0,
            },
            whitelist_timelock_minutes: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // role checks
        if self.roles.owner == Address(0) {
            return Err(ConfigError::InvalidRoles {
                reason: "Owner must be a live address".to_string(),
            });
        }

        // oracle checks
        if self.initial_oracle.max_deviation_ticks == 0 {
            return Err(ConfigError::InvalidOracle {
                reason: "Deviation band must be nonzero".to_string(),
            });
        }
        if self.initial_oracle.timelock_minutes < 0 || self.whitelist_timelock_minutes < 0 {
            return Err(ConfigError::InvalidOracle {
                reason: "Timelock cannot be negative".to_string(),
            });
        }

        // fee checks
        if u128::from(self.max_annual_fee) > crate::fees::RATE_PRECISION {
            return Err(ConfigError::InvalidFees {
                reason: "Fee ceiling above 100%".to_string(),
            });
        }
        if self.initial_annual_fee > self.max_annual_fee {
            return Err(ConfigError::InvalidFees {
                reason: "Genesis fee above ceiling".to_string(),
            });
        }

        Ok(())
    }
}
