use crate::types::{AggregatorError, AssetPair, DataKey, FeedRegistration};
use soroban_sdk::{Address, Env, Vec};

pub struct Storage;

impl Storage {
    pub fn has_owner(env: &Env) -> bool {
        env.storage().instance().has(&DataKey::Owner)
    }

    pub fn set_owner(env: &Env, owner: &Address) {
        env.storage().instance().set(&DataKey::Owner, owner);
    }

    pub fn get_owner(env: &Env) -> Result<Address, AggregatorError> {
        env.storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(AggregatorError::NotInitialized)
    }

    pub fn set_deviation_bps(env: &Env, bps: u32) {
        env.storage().instance().set(&DataKey::DeviationBps, &bps);
    }

    pub fn get_deviation_bps(env: &Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::DeviationBps)
            .unwrap_or(0)
    }

    pub fn get_feeds(env: &Env, pair: &AssetPair) -> Vec<FeedRegistration> {
        env.storage()
            .persistent()
            .get(&DataKey::Feeds(pair.clone()))
            .unwrap_or(Vec::new(env))
    }

    /// A pair counts as configured only while it has at least one feed;
    /// writing an empty list clears the key so the reverse direction can
    /// be registered afterwards.
    pub fn set_feeds(env: &Env, pair: &AssetPair, feeds: &Vec<FeedRegistration>) {
        let key = DataKey::Feeds(pair.clone());
        if feeds.is_empty() {
            env.storage().persistent().remove(&key);
        } else {
            env.storage().persistent().set(&key, feeds);
        }
    }

    pub fn pair_configured(env: &Env, pair: &AssetPair) -> bool {
        env.storage().persistent().has(&DataKey::Feeds(pair.clone()))
    }
}
