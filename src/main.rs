//! Oracle-Gated Vault Simulation.
//!
//! Demonstrates the full vault lifecycle including oracle governance,
//! proportional share accounting, fee dilution, strategy placement, and
//! guarded rebalancing through whitelisted targets.

use vault_core::*;

const OWNER: Address = Address(1);
const GUARDIAN: Address = Address(2);
const ALICE: Address = Address(3);
const BOB: Address = Address(4);
const VAULT_ADDR: Address = Address(100);
const STRAT_ADDR: Address = Address(40);
const VENUE_ADDR: Address = Address(50);

fn main() {
    println!("Oracle-Gated Vault Engine Simulation");
    println!("Single Pair, Static Oracle, Full Lifecycle\n");

    scenario_1_deposits_and_redemptions();
    scenario_2_fee_dilution();
    scenario_3_oracle_governance();
    scenario_4_strategy_placement();
    scenario_5_guarded_rebalance();

    println!("\nAll simulations completed successfully.");
}

fn t(secs: i64) -> Timestamp {
    Timestamp::from_secs(secs)
}

fn fresh_vault(whitelist_minutes: i64) -> Vault {
    let mut base = MockToken::new(Address(10));
    let mut quote = MockToken::new(Address(11));
    for user in [ALICE, BOB] {
        base.mint_to(user, 10_000_000_000);
        quote.mint_to(user, 10_000_000_000);
    }
    base.mint_to(VENUE_ADDR, 10_000_000_000);
    quote.mint_to(VENUE_ADDR, 10_000_000_000);
    let tokens = TokenPair::new(Box::new(base), Box::new(quote));

    let config = VaultConfig {
        roles: Roles {
            owner: OWNER,
            guardian: GUARDIAN,
            manager: OWNER,
        },
        vault_address: VAULT_ADDR,
        initial_oracle: OracleConfig {
            kind: OracleKind::Static(Tick(0)),
            max_deviation_ticks: 1_000,
            timelock_minutes: 60,
        },
        whitelist_timelock_minutes: whitelist_minutes,
        fee_recipient: OWNER,
        ..VaultConfig::default()
    };
    match Vault::new(config, tokens, t(0)) {
        Ok(v) => v,
        Err(e) => panic!("vault construction failed: {e}"),
    }
}

/// First mint is oracle-priced; later mints and burns are proportional.
fn scenario_1_deposits_and_redemptions() {
    println!("Scenario 1: Deposits and Redemptions\n");

    let mut vault = fresh_vault(60);

    let mint = vault.mint(ALICE, 2_000_000_000, 2_000_000_000, 0, t(0)).unwrap();
    println!("  Alice deposits base={} quote={}", mint.base_in, mint.quote_in);
    println!("  Shares minted: {} (locked floor: {})", mint.shares, mint.locked);

    let mint2 = vault.mint(BOB, 1_000_000_000, 1_000_000_000, 0, t(10)).unwrap();
    println!("  Bob deposits for {} shares", mint2.shares);

    let (base_out, quote_out) = vault.burn(BOB, mint2.shares, 0, 0, t(20)).unwrap();
    println!("  Bob redeems: base={base_out} quote={quote_out}");
    println!("  Supply after: {}\n", vault.position().total_shares);
}

/// A 5% annual fee dilutes holders into the recipient over a simulated year.
fn scenario_2_fee_dilution() {
    println!("Scenario 2: Fee Dilution\n");

    let mut vault = fresh_vault(60);
    vault.mint(ALICE, 2_000_000_000, 2_000_000_000, 0, t(0)).unwrap();
    vault.set_fee_rate(OWNER, 5_000, t(0)).unwrap();

    let before = vault.position().total_shares;
    // any state-changing call a year later settles the accrual
    vault.set_fee_rate(OWNER, 5_000, t(31_536_000)).unwrap();
    let minted = vault.position().total_shares.value() - before.value();

    println!("  Supply before: {before}");
    println!("  Fee shares minted after one year at 5%: {minted}");
    println!("  Recipient balance: {}\n", vault.share_balance_of(OWNER));
}

/// Config swaps go through the timelock; the guardian can veto at any time.
fn scenario_3_oracle_governance() {
    println!("Scenario 3: Oracle Governance\n");

    let mut vault = fresh_vault(60);
    let candidate = OracleConfig {
        kind: OracleKind::Static(Tick(500)),
        max_deviation_ticks: 500,
        timelock_minutes: 120,
    };

    vault.propose_oracle(OWNER, candidate, t(0)).unwrap();
    println!("  Owner proposes a new static oracle at tick 500");

    let early = vault.accept_oracle(OWNER, t(30 * 60));
    println!("  Accept after 30m: {early:?}");

    vault.accept_oracle(OWNER, t(60 * 60)).unwrap();
    println!("  Accept after 60m: active tick is now {:?}", vault.oracle().active_config().kind);

    vault.propose_oracle(OWNER, candidate, t(60 * 60)).unwrap();
    vault.reject_oracle(GUARDIAN, t(61 * 60)).unwrap();
    println!("  Guardian vetoes the next proposal immediately\n");
}

/// Liquidity placement is blocked unless the layout clears the oracle band.
fn scenario_4_strategy_placement() {
    println!("Scenario 4: Strategy Placement\n");

    let mut vault = fresh_vault(60);
    vault.mint(ALICE, 2_000_000_000, 2_000_000_000, 0, t(0)).unwrap();
    vault.set_strategy(OWNER, Box::new(MockStrategy::new(STRAT_ADDR))).unwrap();

    let good = Distribution::new(
        vec![PriceLevel::new(Tick(100), 1_000)],
        vec![PriceLevel::new(Tick(-100), 1_000)],
    );
    vault
        .populate(OWNER, &good, &StrategyParams::default(), BaseAmount(1_000_000_000), QuoteAmount(1_000_000_000), t(10))
        .unwrap();
    println!("  In-band distribution committed");
    println!("  Strategy custody: base={} quote={}", vault.position().strategy_base, vault.position().strategy_quote);

    let bad = Distribution::new(vec![PriceLevel::new(Tick(-2_000), 1_000)], vec![]);
    let err = vault
        .populate(OWNER, &bad, &StrategyParams::default(), BaseAmount(1_000), QuoteAmount::zero(), t(20))
        .unwrap_err();
    println!("  Off-band distribution rejected: {err}\n");
}

/// Trades run through whitelisted targets with realized prices measured from
/// balance diffs.
fn scenario_5_guarded_rebalance() {
    println!("Scenario 5: Guarded Rebalance\n");

    let mut vault = fresh_vault(0);
    vault.mint(ALICE, 2_000_000_000, 2_000_000_000, 0, t(0)).unwrap();

    let mut venue = MockSwapVenue::new(VENUE_ADDR, Tick(0));
    let premature = vault.rebalance(OWNER, &mut venue, TokenSide::Base, 1_000_000, 0, &[0], false, t(0));
    println!("  Before whitelisting: {premature:?}");

    vault.propose_target(OWNER, VENUE_ADDR, t(0)).unwrap();
    vault.accept_target(OWNER, VENUE_ADDR, t(0)).unwrap();
    println!("  Venue whitelisted");

    let outcome = vault
        .rebalance(OWNER, &mut venue, TokenSide::Base, 1_000_000, 0, &[0], false, t(10))
        .unwrap();
    println!(
        "  Sold {} base for {} quote, realized tick {:?}",
        outcome.sent, outcome.received, outcome.realized_tick
    );

    // same whitelisted address, but now the quoted rate is far under fair
    let mut bad_venue = MockSwapVenue::new(VENUE_ADDR, Tick(-5_000));
    let err = vault
        .rebalance(OWNER, &mut bad_venue, TokenSide::Base, 1_000_000, 0, &[0], false, t(20))
        .unwrap_err();
    println!("  Underpriced venue rejected: {err}");
}
