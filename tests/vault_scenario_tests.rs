//! End-to-end vault lifecycle tests.
//!
//! Full flows through real module wiring: oracle-priced first mints, fee
//! dilution over time, strategy placement, and guarded rebalances where only
//! measured balance diffs count.

use vault_core::*;

const OWNER: Address = Address(1);
const GUARDIAN: Address = Address(2);
const ALICE: Address = Address(3);
const BOB: Address = Address(4);
const VAULT_ADDR: Address = Address(100);
const STRAT_ADDR: Address = Address(40);
const VENUE: Address = Address(50);

fn t(secs: i64) -> Timestamp {
    Timestamp::from_secs(secs)
}

struct Harness {
    vault: Vault,
}

fn setup(oracle_tick: i32, max_deviation: u32) -> Harness {
    let mut base = MockToken::new(Address(10));
    let mut quote = MockToken::new(Address(11));
    for user in [ALICE, BOB] {
        base.mint_to(user, u128::MAX / 4);
        quote.mint_to(user, u128::MAX / 4);
    }
    base.mint_to(VENUE, 1_000_000_000_000);
    quote.mint_to(VENUE, 1_000_000_000_000);
    let tokens = TokenPair::new(Box::new(base), Box::new(quote));

    let config = VaultConfig {
        roles: Roles {
            owner: OWNER,
            guardian: GUARDIAN,
            manager: OWNER,
        },
        vault_address: VAULT_ADDR,
        initial_oracle: OracleConfig {
            kind: OracleKind::Static(Tick(oracle_tick)),
            max_deviation_ticks: max_deviation,
            timelock_minutes: 0,
        },
        whitelist_timelock_minutes: 0,
        ..VaultConfig::default()
    };
    let vault = match Vault::new(config, tokens, t(0)) {
        Ok(v) => v,
        Err(e) => panic!("setup failed: {e}"),
    };
    Harness { vault }
}

fn whitelist(vault: &mut Vault, target: Address, now: Timestamp) {
    vault.propose_target(OWNER, target, now).unwrap();
    vault.accept_target(OWNER, target, now).unwrap();
}

// At oracle tick 0 a base unit and a quote unit are worth the same; a deposit
// of 1e18 base and 2e18 quote is worth 3e18 gross, less the locked floor.
#[test]
fn initial_mint_prices_by_oracle() {
    let mut h = setup(0, 1_000);
    let deposit_base = 1_000_000_000_000_000_000u128;
    let deposit_quote = 2_000_000_000_000_000_000u128;

    // quote implies 2e18 base, capped at 1e18 with the quote leg recomputed
    let mint = h.vault.mint(ALICE, deposit_base, deposit_quote, 0, t(0)).unwrap();
    assert_eq!(mint.base_in.value(), deposit_base);
    assert_eq!(mint.quote_in.value(), deposit_base); // parity cap
    assert_eq!(mint.shares.value(), 2 * deposit_base - 1_000);
    assert_eq!(mint.locked.value(), 1_000);
}

// A mint that cannot fund both legs must move nothing: a pulled base leg with
// a failed quote leg would be silently donated to the pool at the next resync.
#[test]
fn aborted_mint_leaves_no_stranded_funds() {
    const CAROL: Address = Address(5);
    let mut base = MockToken::new(Address(10));
    let mut quote = MockToken::new(Address(11));
    base.mint_to(ALICE, 10_000_000_000);
    quote.mint_to(ALICE, 10_000_000_000);
    base.mint_to(CAROL, 2_000_000_000); // no quote at all
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
            timelock_minutes: 0,
        },
        whitelist_timelock_minutes: 0,
        ..VaultConfig::default()
    };
    let mut vault = Vault::new(config, tokens, t(0)).unwrap();
    vault.mint(ALICE, 2_000_000_000, 2_000_000_000, 0, t(0)).unwrap();

    let err = vault
        .mint(CAROL, 2_000_000_000, 2_000_000_000, 0, t(1))
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::Token(TokenError::InsufficientBalance { .. })
    ));
    assert_eq!(vault.share_balance_of(CAROL).value(), 0);

    // a later clean mint sees only its own contribution, none of carol's base
    vault.mint(ALICE, 1_000_000, 1_000_000, 0, t(2)).unwrap();
    let (pool_base, pool_quote) = vault.total_balances();
    assert_eq!(pool_base.value(), 2_001_000_000);
    assert_eq!(pool_quote.value(), 2_001_000_000);
}

#[test]
fn initial_mint_resists_ratio_manipulation() {
    let mut h = setup(0, 1_000);
    // wildly lopsided amounts cannot buy a distorted share price
    let err = h
        .vault
        .mint(ALICE, 1, 1_000_000_000_000_000_000_000_000_000_000u128, 0, t(0))
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::Accounting(AccountingError::InvalidInitialMintAmounts)
    ));
}

#[test]
fn share_value_never_decreases_across_deposits() {
    let mut h = setup(0, 1_000);
    h.vault.mint(ALICE, 1_000_000_000, 1_000_000_000, 0, t(0)).unwrap();

    // value per share before: (B + Q) / S at parity pricing
    let before = h.vault.position();
    let value_before =
        (before.total_base().value() + before.total_quote().value()) as f64
            / before.total_shares.value() as f64;

    for i in 0..5 {
        h.vault
            .mint(BOB, 777_777 + i, 1_000_000_000, 0, t(i as i64))
            .unwrap();
    }

    let after = h.vault.position();
    let value_after = (after.total_base().value() + after.total_quote().value()) as f64
        / after.total_shares.value() as f64;
    assert!(value_after >= value_before * 0.999999);
}

#[test]
fn fee_dilution_preserves_token_balances() {
    let mut h = setup(0, 1_000);
    h.vault.mint(ALICE, 1_000_000_000, 1_000_000_000, 0, t(0)).unwrap();
    h.vault.set_fee_rate(OWNER, 2_000, t(0)).unwrap(); // 2%

    let base_before = h.vault.position().total_base();
    let quote_before = h.vault.position().total_quote();
    let supply_before = h.vault.position().total_shares;

    // half a year later, any operation settles the accrual
    h.vault.set_fee_recipient(OWNER, Address(9), t(15_768_000)).unwrap();

    // dilution mints shares but moves no tokens
    assert_eq!(h.vault.position().total_base(), base_before);
    assert_eq!(h.vault.position().total_quote(), quote_before);
    assert!(h.vault.position().total_shares.value() > supply_before.value());
    assert!(h.vault.share_balance_of(OWNER).value() > 0);
}

#[test]
fn burn_after_dilution_pays_the_fee_recipient() {
    let mut h = setup(0, 1_000);
    let mint = h.vault.mint(ALICE, 1_000_000_000, 1_000_000_000, 0, t(0)).unwrap();
    h.vault.set_fee_rate(OWNER, 5_000, t(0)).unwrap();

    // a year of 5%: recipient (owner) can redeem their fee shares for tokens
    h.vault.set_fee_rate(OWNER, 0, t(31_536_000)).unwrap();
    let fee_shares = h.vault.share_balance_of(OWNER);
    assert!(fee_shares.value() > 0);

    let (base_out, quote_out) = h
        .vault
        .burn(OWNER, fee_shares, 0, 0, t(31_536_000))
        .unwrap();
    assert!(base_out.value() > 0 && quote_out.value() > 0);

    // and Alice's claim shrank by roughly the same slice
    let (alice_base, _) = h.vault.burn(ALICE, mint.shares, 0, 0, t(31_536_000)).unwrap();
    assert!(alice_base.value() < 1_000_000_000);
}

#[test]
fn full_lifecycle_with_strategy_and_rebalance() {
    let mut h = setup(0, 1_000);
    let mint = h.vault.mint(ALICE, 2_000_000_000, 2_000_000_000, 0, t(0)).unwrap();

    h.vault.set_strategy(OWNER, Box::new(MockStrategy::new(STRAT_ADDR))).unwrap();
    let dist = Distribution::new(
        vec![PriceLevel::new(Tick(50), 10_000)],
        vec![PriceLevel::new(Tick(-50), 10_000)],
    );
    h.vault
        .populate(
            OWNER,
            &dist,
            &StrategyParams::default(),
            BaseAmount(1_000_000_000),
            QuoteAmount(1_000_000_000),
            t(10),
        )
        .unwrap();
    assert_eq!(h.vault.position().strategy_base.value(), 1_000_000_000);

    // trade local funds through a fair venue
    whitelist(&mut h.vault, VENUE, t(20));
    let mut venue = MockSwapVenue::new(VENUE, Tick(0));
    let outcome = h
        .vault
        .rebalance(OWNER, &mut venue, TokenSide::Base, 500_000_000, 0, &[0], false, t(30))
        .unwrap();
    assert_eq!(outcome.sent, 500_000_000);
    assert!(outcome.received >= 499_000_000);

    // book total is conserved up to swap rounding
    let pos = h.vault.position();
    let total = pos.total_base().value() + pos.total_quote().value();
    assert!(total >= 4_000_000_000 - 10 && total <= 4_000_000_000);

    // leftovers were swept into the active strategy
    assert_eq!(pos.local_base.value(), 0);
    assert_eq!(pos.local_quote.value(), 0);

    // a full burn drains the strategy and pays out nearly everything
    let (base_out, quote_out) = h.vault.burn(ALICE, mint.shares, 0, 0, t(40)).unwrap();
    let paid = base_out.value() + quote_out.value();
    assert!(paid >= total - total / 1_000_000);
}

#[test]
fn rebalance_pulls_missing_funds_from_strategy() {
    let mut h = setup(0, 1_000);
    h.vault.mint(ALICE, 2_000_000_000, 2_000_000_000, 0, t(0)).unwrap();
    h.vault.set_strategy(OWNER, Box::new(MockStrategy::new(STRAT_ADDR))).unwrap();
    h.vault
        .populate(
            OWNER,
            &Distribution::new(
                vec![PriceLevel::new(Tick(50), 10_000)],
                vec![PriceLevel::new(Tick(-50), 10_000)],
            ),
            &StrategyParams::default(),
            BaseAmount(2_000_000_000),
            QuoteAmount(2_000_000_000),
            t(10),
        )
        .unwrap();
    assert_eq!(h.vault.position().local_base.value(), 0);

    whitelist(&mut h.vault, VENUE, t(20));
    let mut venue = MockSwapVenue::new(VENUE, Tick(0));
    let outcome = h
        .vault
        .rebalance(OWNER, &mut venue, TokenSide::Base, 1_000_000_000, 0, &[0], false, t(30))
        .unwrap();
    assert_eq!(outcome.sent, 1_000_000_000);
}

#[test]
fn rebalance_rejects_underpriced_fill() {
    let mut h = setup(0, 200);
    h.vault.mint(ALICE, 1_000_000_000, 1_000_000_000, 0, t(0)).unwrap();
    whitelist(&mut h.vault, VENUE, t(0));

    // 3% under fair against a 2% band
    let mut venue = MockSwapVenue::new(VENUE, Tick(-300));
    let err = h
        .vault
        .rebalance(OWNER, &mut venue, TokenSide::Base, 500_000_000, 0, &[0], false, t(10))
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::Rebalance(RebalanceError::InvalidTradeTick { .. })
    ));
}

#[test]
fn rebalance_min_out_guards_theft() {
    let mut h = setup(0, 1_000);
    h.vault.mint(ALICE, 1_000_000_000, 1_000_000_000, 0, t(0)).unwrap();
    whitelist(&mut h.vault, VENUE, t(0));

    let mut venue = MockSwapVenue::new(VENUE, Tick(0));
    venue.set_keep_funds(true);
    let err = h
        .vault
        .rebalance(OWNER, &mut venue, TokenSide::Base, 500_000_000, 499_000_000, &[0], false, t(10))
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::Rebalance(RebalanceError::SlippageExceeded { .. })
    ));
}

#[test]
fn oracle_swap_moves_the_band() {
    let mut h = setup(0, 100);
    h.vault.mint(ALICE, 1_000_000_000, 1_000_000_000, 0, t(0)).unwrap();
    h.vault.set_strategy(OWNER, Box::new(MockStrategy::new(STRAT_ADDR))).unwrap();

    // an ask at -500 sells base below the 100-tick band around 0
    let dist = Distribution::new(vec![PriceLevel::new(Tick(-500), 1_000)], vec![]);
    assert!(matches!(
        h.vault.populate(OWNER, &dist, &StrategyParams::default(), BaseAmount(1_000), QuoteAmount::zero(), t(0)),
        Err(VaultError::InvalidDistribution)
    ));

    // swap the oracle to tick -500 (timelock is zero here) and retry
    let candidate = OracleConfig {
        kind: OracleKind::Static(Tick(-500)),
        max_deviation_ticks: 100,
        timelock_minutes: 0,
    };
    h.vault.propose_oracle(OWNER, candidate, t(10)).unwrap();
    h.vault.accept_oracle(OWNER, t(10)).unwrap();
    h.vault
        .populate(OWNER, &dist, &StrategyParams::default(), BaseAmount(1_000), QuoteAmount::zero(), t(20))
        .unwrap();
}

#[test]
fn feed_backed_oracle_swap_and_failure() {
    let mut h = setup(0, 1_000);
    h.vault.mint(ALICE, 1_000_000_000, 1_000_000_000, 0, t(0)).unwrap();

    let feed = MockPriceSource::new("test-feed", Tick(25));
    h.vault.register_feed(OWNER, FeedId(1), Box::new(feed)).unwrap();
    let candidate = OracleConfig {
        kind: OracleKind::Feed(FeedId(1)),
        max_deviation_ticks: 1_000,
        timelock_minutes: 0,
    };
    h.vault.propose_oracle(OWNER, candidate, t(10)).unwrap();
    h.vault.accept_oracle(OWNER, t(10)).unwrap();

    // the feed resolves; a mint now prices off tick 25
    h.vault.mint(BOB, 1_000_000, 1_000_000, 0, t(20)).unwrap();

    // a dead feed never makes it past the proposal check
    let mut dead = MockPriceSource::new("dead-feed", Tick(0));
    dead.set_healthy(false);
    h.vault.register_feed(OWNER, FeedId(2), Box::new(dead)).unwrap();
    let broken = OracleConfig {
        kind: OracleKind::Feed(FeedId(2)),
        ..candidate
    };
    assert!(matches!(
        h.vault.propose_oracle(OWNER, broken, t(30)),
        Err(VaultError::Oracle(OracleError::InvalidOracle(_)))
    ));
}

#[test]
fn mint_and_burn_series_conserves_value() {
    let mut h = setup(0, 1_000);
    h.vault.mint(ALICE, 10_000_000_000, 10_000_000_000, 0, t(0)).unwrap();

    let mut bob_in = 0u128;
    let mut bob_shares = Shares::zero();
    for i in 0..10 {
        let mint = h
            .vault
            .mint(BOB, 1_000_000 + i * 37, 1_000_000, 0, t(i as i64))
            .unwrap();
        bob_in += mint.base_in.value() + mint.quote_in.value();
        bob_shares = Shares(bob_shares.value() + mint.shares.value());
    }
    let (b, q) = h.vault.burn(BOB, bob_shares, 0, 0, t(100)).unwrap();
    let bob_out = b.value() + q.value();

    // rounding always favors the vault, never Bob
    assert!(bob_out <= bob_in);
    assert!(bob_in - bob_out < 100);
}
