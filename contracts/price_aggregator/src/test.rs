#![cfg(test)]

use super::*;
use soroban_sdk::{
    contract, contractimpl, symbol_short,
    testutils::{Address as _, Ledger},
    Address, Env,
};

// Minimal adapter used to drive the aggregator. A feed that never had
// `set_quote` called panics on `quote`, standing in for an unresponsive
// adapter.
#[contract]
pub struct MockFeed;

#[contractimpl]
impl MockFeed {
    pub fn set_quote(env: Env, price: i128, timestamp: u64) {
        env.storage()
            .instance()
            .set(&symbol_short!("quote"), &PriceData { price, timestamp });
    }

    pub fn quote(env: Env, _base: Address, _quote: Address) -> PriceData {
        env.storage()
            .instance()
            .get(&symbol_short!("quote"))
            .unwrap()
    }
}

const NOW: u64 = 10_000;

fn setup<'a>(env: &'a Env) -> (PriceAggregatorClient<'a>, Address, AssetPair) {
    env.mock_all_auths();
    env.ledger().set_timestamp(NOW);

    let contract_id = env.register_contract(None, PriceAggregator);
    let client = PriceAggregatorClient::new(env, &contract_id);

    let owner = Address::generate(env);
    client.initialize(&owner, &500);

    let pair = AssetPair {
        base: Address::generate(env),
        quote: Address::generate(env),
    };
    (client, owner, pair)
}

fn add_mock_feed(
    env: &Env,
    client: &PriceAggregatorClient,
    pair: &AssetPair,
    price: i128,
) -> Address {
    let feed_id = env.register_contract(None, MockFeed);
    MockFeedClient::new(env, &feed_id).set_quote(&price, &NOW);
    client.add_feed(pair, &feed_id);
    feed_id
}

#[test]
fn test_initialize_once() {
    let env = Env::default();
    let (client, owner, _) = setup(&env);

    assert_eq!(client.get_owner(), Some(owner.clone()));
    assert_eq!(client.get_deviation_bps(), 500);
    assert_eq!(
        client.try_initialize(&owner, &100),
        Err(Ok(AggregatorError::AlreadyInitialized))
    );
}

#[test]
fn test_add_feed_validation() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    let same = AssetPair {
        base: pair.base.clone(),
        quote: pair.base.clone(),
    };
    let adapter = env.register_contract(None, MockFeed);
    assert_eq!(
        client.try_add_feed(&same, &adapter),
        Err(Ok(AggregatorError::IdenticalAssets))
    );

    assert_eq!(client.add_feed(&pair, &adapter), 0);
    assert_eq!(
        client.try_add_feed(&pair, &adapter),
        Err(Ok(AggregatorError::DuplicateFeed))
    );

    let reverse = AssetPair {
        base: pair.quote.clone(),
        quote: pair.base.clone(),
    };
    let other = env.register_contract(None, MockFeed);
    assert_eq!(
        client.try_add_feed(&reverse, &other),
        Err(Ok(AggregatorError::ReversePairExists))
    );
}

#[test]
fn test_remove_feed_swaps_last_into_hole() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    let a = add_mock_feed(&env, &client, &pair, 100);
    let b = add_mock_feed(&env, &client, &pair, 101);
    let c = add_mock_feed(&env, &client, &pair, 102);

    client.remove_feed(&pair, &0);

    let feeds = client.get_feeds(&pair);
    assert_eq!(feeds.len(), 2);
    // c was swapped into index 0, b stays at index 1
    assert_eq!(feeds.get_unchecked(0).adapter, c);
    assert_eq!(feeds.get_unchecked(1).adapter, b);
    assert!(!feeds.iter().any(|f| f.adapter == a));

    assert_eq!(
        client.try_remove_feed(&pair, &2),
        Err(Ok(AggregatorError::InvalidIndex))
    );
}

#[test]
fn test_removing_all_feeds_frees_reverse_pair() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 100);
    client.remove_feed(&pair, &0);

    let reverse = AssetPair {
        base: pair.quote.clone(),
        quote: pair.base.clone(),
    };
    let adapter = env.register_contract(None, MockFeed);
    assert_eq!(client.add_feed(&reverse, &adapter), 0);
}

#[test]
fn test_toggle_feed_idempotent() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 100);

    client.set_feed_enabled(&pair, &0, &false);
    let once = client.get_feeds(&pair);
    client.set_feed_enabled(&pair, &0, &false);
    let twice = client.get_feeds(&pair);
    assert_eq!(once, twice);
    assert!(!twice.get_unchecked(0).enabled);

    client.set_feed_enabled(&pair, &0, &true);
    client.set_feed_enabled(&pair, &0, &true);
    assert!(client.get_feeds(&pair).get_unchecked(0).enabled);

    assert_eq!(
        client.try_set_feed_enabled(&pair, &1, &true),
        Err(Ok(AggregatorError::InvalidIndex))
    );
}

#[test]
fn test_consensus_within_bound() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 100);
    add_mock_feed(&env, &client, &pair, 102);
    add_mock_feed(&env, &client, &pair, 98);

    // 500 bps bound: all three sit within 5% of 100
    assert_eq!(client.consensus_price(&pair, &true), 100);
    assert_eq!(client.consensus_price(&pair, &false), 100);
}

#[test]
fn test_consensus_deviation_rejected() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 100);
    add_mock_feed(&env, &client, &pair, 200);

    assert_eq!(
        client.try_consensus_price(&pair, &true),
        Err(Ok(AggregatorError::DeviationTooHigh))
    );
    assert_eq!(
        client.try_consensus_price(&pair, &false),
        Err(Ok(AggregatorError::DeviationTooHigh))
    );
}

#[test]
fn test_single_feed_skips_deviation_check() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 50);
    add_mock_feed(&env, &client, &pair, 5000);
    client.set_feed_enabled(&pair, &1, &false);

    assert_eq!(client.consensus_price(&pair, &true), 50);
    assert_eq!(client.consensus_price(&pair, &false), 50);
}

#[test]
fn test_failing_feed_excluded() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    // never receives a quote, so it panics when called
    let broken = env.register_contract(None, MockFeed);
    client.add_feed(&pair, &broken);
    add_mock_feed(&env, &client, &pair, 100);

    assert_eq!(client.consensus_price(&pair, &true), 100);
}

#[test]
fn test_garbage_and_stale_quotes_excluded() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    let zero = env.register_contract(None, MockFeed);
    MockFeedClient::new(&env, &zero).set_quote(&0, &NOW);
    client.add_feed(&pair, &zero);

    let stale = env.register_contract(None, MockFeed);
    MockFeedClient::new(&env, &stale).set_quote(&900, &(NOW - MAX_QUOTE_AGE_SECS - 1));
    client.add_feed(&pair, &stale);

    add_mock_feed(&env, &client, &pair, 100);

    assert_eq!(client.consensus_price(&pair, &true), 100);
}

#[test]
fn test_no_usable_feed_is_no_data() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    assert_eq!(
        client.try_consensus_price(&pair, &true),
        Err(Ok(AggregatorError::NoData))
    );

    let broken = env.register_contract(None, MockFeed);
    client.add_feed(&pair, &broken);
    assert_eq!(
        client.try_consensus_price(&pair, &false),
        Err(Ok(AggregatorError::NoData))
    );
}

#[test]
fn test_even_median_takes_upper_middle() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 104);
    add_mock_feed(&env, &client, &pair, 100);

    assert_eq!(client.consensus_price(&pair, &true), 104);
    assert_eq!(client.consensus_price(&pair, &false), 102);
}

#[test]
fn test_zero_bound_demands_exact_equality() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);
    client.set_deviation_bps(&0);

    add_mock_feed(&env, &client, &pair, 77);
    add_mock_feed(&env, &client, &pair, 77);
    assert_eq!(client.consensus_price(&pair, &true), 77);

    add_mock_feed(&env, &client, &pair, 78);
    assert_eq!(
        client.try_consensus_price(&pair, &true),
        Err(Ok(AggregatorError::DeviationTooHigh))
    );
}

#[test]
fn test_quote_scales_amount() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 100);
    assert_eq!(client.quote(&7, &pair, &true), 700);
    assert_eq!(client.quote(&0, &pair, &false), 0);
}

#[test]
fn test_set_deviation_bps() {
    let env = Env::default();
    let (client, _, pair) = setup(&env);

    add_mock_feed(&env, &client, &pair, 100);
    add_mock_feed(&env, &client, &pair, 200);
    assert_eq!(
        client.try_consensus_price(&pair, &true),
        Err(Ok(AggregatorError::DeviationTooHigh))
    );

    client.set_deviation_bps(&10_000);
    assert_eq!(client.get_deviation_bps(), 10_000);
    assert_eq!(client.consensus_price(&pair, &true), 200);
}

#[test]
fn test_transfer_ownership() {
    let env = Env::default();
    let (client, owner, _) = setup(&env);

    let new_owner = Address::generate(&env);
    client.transfer_ownership(&new_owner);
    assert_eq!(client.get_owner(), Some(new_owner));
    assert_ne!(client.get_owner(), Some(owner));
}
