#![no_std]

mod storage;
mod test;
pub mod types;

use soroban_sdk::{
    contract, contractclient, contractimpl, symbol_short, Address, Env, Symbol, Vec,
};

use crate::storage::Storage;
use crate::types::{AggregatorError, AssetPair, FeedRegistration, PriceData};

/// Quotes older than this are excluded from consensus.
pub const MAX_QUOTE_AGE_SECS: u64 = 3600;

const BPS_DENOMINATOR: i128 = 10_000;

const FEED_ADDED: Symbol = symbol_short!("feed_add");
const FEED_REMOVED: Symbol = symbol_short!("feed_rm");
const FEED_TOGGLED: Symbol = symbol_short!("feed_tgl");
const DEVIATION_SET: Symbol = symbol_short!("dev_bps");
const OWNER_SET: Symbol = symbol_short!("owner");

/// Interface every feed adapter must expose. Adapters are untrusted: they
/// may fail, return garbage, or serve stale data, so the aggregator only
/// ever talks to them through `try_quote`.
#[contractclient(name = "PriceFeedAdapterClient")]
pub trait PriceFeedAdapter {
    fn quote(env: Env, base: Address, quote: Address) -> PriceData;
}

#[contract]
pub struct PriceAggregator;

#[contractimpl]
impl PriceAggregator {
    pub fn initialize(env: Env, owner: Address, deviation_bps: u32) -> Result<(), AggregatorError> {
        if Storage::has_owner(&env) {
            return Err(AggregatorError::AlreadyInitialized);
        }
        Storage::set_owner(&env, &owner);
        Storage::set_deviation_bps(&env, deviation_bps);
        Ok(())
    }

    /// Register an adapter for a pair, enabled. Returns the feed's index.
    pub fn add_feed(env: Env, pair: AssetPair, adapter: Address) -> Result<u32, AggregatorError> {
        Self::require_owner(&env)?;

        if pair.base == pair.quote {
            return Err(AggregatorError::IdenticalAssets);
        }
        let reverse = AssetPair {
            base: pair.quote.clone(),
            quote: pair.base.clone(),
        };
        if Storage::pair_configured(&env, &reverse) {
            return Err(AggregatorError::ReversePairExists);
        }

        let mut feeds = Storage::get_feeds(&env, &pair);
        for feed in feeds.iter() {
            if feed.adapter == adapter {
                return Err(AggregatorError::DuplicateFeed);
            }
        }

        feeds.push_back(FeedRegistration {
            adapter: adapter.clone(),
            enabled: true,
        });
        Storage::set_feeds(&env, &pair, &feeds);

        let index = feeds.len() - 1;
        env.events().publish(
            (FEED_ADDED, pair.base.clone(), pair.quote.clone()),
            (adapter, index),
        );
        Ok(index)
    }

    /// Swap-with-last-and-pop removal. The feed previously at the tail takes
    /// over the removed index, so callers must not cache indices across
    /// removals.
    pub fn remove_feed(env: Env, pair: AssetPair, index: u32) -> Result<(), AggregatorError> {
        Self::require_owner(&env)?;

        let mut feeds = Storage::get_feeds(&env, &pair);
        if index >= feeds.len() {
            return Err(AggregatorError::InvalidIndex);
        }

        let removed = feeds.get_unchecked(index);
        let last = feeds.len() - 1;
        if index != last {
            let tail = feeds.get_unchecked(last);
            feeds.set(index, tail);
        }
        let _ = feeds.pop_back();
        Storage::set_feeds(&env, &pair, &feeds);

        env.events().publish(
            (FEED_REMOVED, pair.base.clone(), pair.quote.clone()),
            (removed.adapter, index),
        );
        Ok(())
    }

    /// Flips the enabled flag in place, no reordering. Idempotent.
    pub fn set_feed_enabled(
        env: Env,
        pair: AssetPair,
        index: u32,
        enabled: bool,
    ) -> Result<(), AggregatorError> {
        Self::require_owner(&env)?;

        let mut feeds = Storage::get_feeds(&env, &pair);
        if index >= feeds.len() {
            return Err(AggregatorError::InvalidIndex);
        }

        let mut feed = feeds.get_unchecked(index);
        let was_enabled = feed.enabled;
        feed.enabled = enabled;
        feeds.set(index, feed.clone());
        Storage::set_feeds(&env, &pair, &feeds);

        env.events().publish(
            (FEED_TOGGLED, pair.base.clone(), pair.quote.clone()),
            (feed.adapter, index, was_enabled, enabled),
        );
        Ok(())
    }

    pub fn set_deviation_bps(env: Env, deviation_bps: u32) -> Result<(), AggregatorError> {
        Self::require_owner(&env)?;

        let old = Storage::get_deviation_bps(&env);
        Storage::set_deviation_bps(&env, deviation_bps);

        env.events().publish((DEVIATION_SET,), (old, deviation_bps));
        Ok(())
    }

    pub fn transfer_ownership(env: Env, new_owner: Address) -> Result<(), AggregatorError> {
        let old = Self::require_owner(&env)?;
        new_owner.require_auth();
        Storage::set_owner(&env, &new_owner);

        env.events().publish((OWNER_SET,), (old, new_owner));
        Ok(())
    }

    /// Consensus unit price for a pair from the currently enabled feeds.
    ///
    /// Failing adapters, non-positive prices and stale quotes are excluded;
    /// one bad feed must not block consensus. With no usable value the call
    /// fails `NoData`; with more than one, every value must sit within the
    /// deviation bound of the consensus or the call fails `DeviationTooHigh`.
    pub fn consensus_price(
        env: Env,
        pair: AssetPair,
        use_median: bool,
    ) -> Result<i128, AggregatorError> {
        let prices = Self::collect_prices(&env, &pair);
        let n = prices.len();
        if n == 0 {
            return Err(AggregatorError::NoData);
        }

        let consensus = if use_median {
            // Sorted ascending; for even N this is the upper of the two
            // middle values, an explicit tie-break rather than an average.
            prices.get_unchecked(n / 2)
        } else {
            let mut sum: i128 = 0;
            for price in prices.iter() {
                sum += price;
            }
            sum / n as i128
        };

        if n > 1 {
            let bound = Storage::get_deviation_bps(&env) as i128;
            for price in prices.iter() {
                let diff = (price - consensus).abs();
                // Multiplication form keeps a zero bound meaning exact
                // equality instead of truncating small deviations away.
                if diff * BPS_DENOMINATOR > bound * consensus {
                    return Err(AggregatorError::DeviationTooHigh);
                }
            }
        }

        Ok(consensus)
    }

    /// Scales `amount` by the consensus unit price.
    pub fn quote(
        env: Env,
        amount: i128,
        pair: AssetPair,
        use_median: bool,
    ) -> Result<i128, AggregatorError> {
        let price = Self::consensus_price(env, pair, use_median)?;
        Ok(amount * price)
    }

    pub fn get_feeds(env: Env, pair: AssetPair) -> Vec<FeedRegistration> {
        Storage::get_feeds(&env, &pair)
    }

    pub fn get_deviation_bps(env: Env) -> u32 {
        Storage::get_deviation_bps(&env)
    }

    pub fn get_owner(env: Env) -> Option<Address> {
        env.storage().instance().get(&types::DataKey::Owner)
    }

    // Helpers

    fn require_owner(env: &Env) -> Result<Address, AggregatorError> {
        let owner = Storage::get_owner(env)?;
        owner.require_auth();
        Ok(owner)
    }

    /// Usable prices from enabled feeds, kept sorted ascending.
    fn collect_prices(env: &Env, pair: &AssetPair) -> Vec<i128> {
        let now = env.ledger().timestamp();
        let mut prices: Vec<i128> = Vec::new(env);

        for feed in Storage::get_feeds(env, pair).iter() {
            if !feed.enabled {
                continue;
            }
            let adapter = PriceFeedAdapterClient::new(env, &feed.adapter);
            let data = match adapter.try_quote(&pair.base, &pair.quote) {
                Ok(Ok(data)) => data,
                _ => continue,
            };
            if data.price <= 0 || now.saturating_sub(data.timestamp) > MAX_QUOTE_AGE_SECS {
                continue;
            }

            let mut at = 0;
            while at < prices.len() && prices.get_unchecked(at) <= data.price {
                at += 1;
            }
            prices.insert(at, data.price);
        }

        prices
    }
}
