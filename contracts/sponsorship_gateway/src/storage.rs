use crate::types::{DataKey, FeeAsset, FeeConfig, GatewayError, ValidatorConfig};
use soroban_sdk::{Address, Env};

pub struct Storage;

impl Storage {
    pub fn has_owner(env: &Env) -> bool {
        env.storage().instance().has(&DataKey::Owner)
    }

    pub fn set_owner(env: &Env, owner: &Address) {
        env.storage().instance().set(&DataKey::Owner, owner);
    }

    pub fn get_owner(env: &Env) -> Result<Address, GatewayError> {
        env.storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn set_coordinator(env: &Env, coordinator: &Address) {
        env.storage()
            .instance()
            .set(&DataKey::Coordinator, coordinator);
    }

    pub fn get_coordinator(env: &Env) -> Result<Address, GatewayError> {
        env.storage()
            .instance()
            .get(&DataKey::Coordinator)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn set_aggregator(env: &Env, aggregator: &Address) {
        env.storage()
            .instance()
            .set(&DataKey::Aggregator, aggregator);
    }

    pub fn get_aggregator(env: &Env) -> Result<Address, GatewayError> {
        env.storage()
            .instance()
            .get(&DataKey::Aggregator)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn set_native_asset(env: &Env, asset: &Address) {
        env.storage().instance().set(&DataKey::NativeAsset, asset);
    }

    pub fn get_native_asset(env: &Env) -> Result<Address, GatewayError> {
        env.storage()
            .instance()
            .get(&DataKey::NativeAsset)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn set_config(env: &Env, config: &ValidatorConfig) {
        env.storage().instance().set(&DataKey::Config, config);
    }

    pub fn get_config(env: &Env) -> Result<ValidatorConfig, GatewayError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn set_fee_config(env: &Env, fee_config: &FeeConfig) {
        env.storage().instance().set(&DataKey::FeeConfig, fee_config);
    }

    pub fn get_fee_config(env: &Env) -> Result<FeeConfig, GatewayError> {
        env.storage()
            .instance()
            .get(&DataKey::FeeConfig)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn set_operation_allowed(env: &Env, op_type: u32, allowed: bool) {
        let key = DataKey::AllowedOp(op_type);
        if allowed {
            env.storage().persistent().set(&key, &true);
        } else {
            env.storage().persistent().remove(&key);
        }
    }

    pub fn is_operation_allowed(env: &Env, op_type: u32) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::AllowedOp(op_type))
            .unwrap_or(false)
    }

    pub fn get_accumulated_fees(env: &Env, asset: &FeeAsset) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Accumulated(asset.clone()))
            .unwrap_or(0)
    }

    pub fn set_accumulated_fees(env: &Env, asset: &FeeAsset, total: i128) {
        env.storage()
            .persistent()
            .set(&DataKey::Accumulated(asset.clone()), &total);
    }
}
