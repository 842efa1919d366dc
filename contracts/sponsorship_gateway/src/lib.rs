#![no_std]

mod storage;
pub mod types;

use soroban_sdk::{
    contract, contractclient, contractimpl, symbol_short, token, Address, Bytes, BytesN, Env,
    Symbol,
};

use crate::storage::Storage;
use crate::types::{
    AssetPair, AuthPolicy, FeeAsset, FeeConfig, FeeContext, GatewayError, OperationRequest,
    TokenFeeQuote, ValidationContext, ValidatorConfig,
};

const BPS_DENOMINATOR: i128 = 10_000;
const MAX_MARKUP_BPS: u32 = 1_000;

/// expiry(6) || signer key(32) || ed25519 signature(64)
const AUTH_BLOCK_LEN: u32 = 102;
const EXPIRY_LEN: u32 = 6;

const PAUSED_SET: Symbol = symbol_short!("paused");
const ALLOW_SET: Symbol = symbol_short!("allow_op");
const CEILING_SET: Symbol = symbol_short!("ceiling");
const SIGNER_SET: Symbol = symbol_short!("signer");
const DEV_MODE_SET: Symbol = symbol_short!("dev_mode");
const FEE_CONFIG_SET: Symbol = symbol_short!("fee_cfg");
const AGGREGATOR_SET: Symbol = symbol_short!("aggr");
const OWNER_SET: Symbol = symbol_short!("owner");
const SPONSORED: Symbol = symbol_short!("sponsored");
const WITHDRAWN: Symbol = symbol_short!("withdraw");

/// The slice of the price aggregator the gateway consumes: a consensus unit
/// price per pair and the deviation bound that produced it.
#[contractclient(name = "PriceAggregatorClient")]
pub trait PriceAggregator {
    fn consensus_price(env: Env, pair: AssetPair, use_median: bool) -> i128;
    fn get_deviation_bps(env: Env) -> u32;
}

#[contract]
pub struct SponsorshipGateway;

#[contractimpl]
impl SponsorshipGateway {
    pub fn initialize(
        env: Env,
        owner: Address,
        coordinator: Address,
        aggregator: Address,
        native_asset: Address,
        authorized_signer: BytesN<32>,
        cost_ceiling: i128,
        fee_config: FeeConfig,
    ) -> Result<(), GatewayError> {
        if Storage::has_owner(&env) {
            return Err(GatewayError::AlreadyInitialized);
        }
        if fee_config.markup_bps > MAX_MARKUP_BPS {
            return Err(GatewayError::MarkupTooHigh);
        }

        Storage::set_owner(&env, &owner);
        Storage::set_coordinator(&env, &coordinator);
        Storage::set_aggregator(&env, &aggregator);
        Storage::set_native_asset(&env, &native_asset);
        Storage::set_config(
            &env,
            &ValidatorConfig {
                paused: false,
                cost_ceiling,
                authorized_signer,
                dev_mode: false,
            },
        );
        Storage::set_fee_config(&env, &fee_config);
        Ok(())
    }

    /// Admission control, invoked by the coordinator once per request before
    /// execution. Fail-fast and side-effect free: a reject mutates nothing
    /// and no debit happens here, only feasibility checks.
    ///
    /// The returned context is handed back unchanged to `settle`.
    pub fn validate(
        env: Env,
        request: OperationRequest,
        request_hash: BytesN<32>,
        max_cost: i128,
    ) -> Result<ValidationContext, GatewayError> {
        Storage::get_coordinator(&env)?.require_auth();
        let config = Storage::get_config(&env)?;

        if config.paused {
            return Err(GatewayError::Paused);
        }

        let op_type = Self::operation_type(&request.payload)?;
        if !Storage::is_operation_allowed(&env, op_type) {
            return Err(GatewayError::DisallowedFunction);
        }

        // Boundary inclusive: a ceiling exactly at the limit is accepted.
        if request.declared_cost_ceiling > config.cost_ceiling
            || max_cost > request.declared_cost_ceiling
        {
            return Err(GatewayError::CostCeilingExceeded);
        }

        Self::check_authorization(
            &env,
            Self::auth_policy(&config),
            &request.authorization,
            &request_hash,
        )?;

        let fee = match &request.fee_quote {
            None => None,
            Some(quote) => Some(Self::check_fee_quote(&env, &request.caller, quote, max_cost)?),
        };

        Ok(ValidationContext {
            caller: request.caller,
            request_hash,
            fee,
        })
    }

    /// Settlement, invoked by the coordinator once per accepted request
    /// after execution. A failed sponsored operation is absorbed: no debit,
    /// no fee event. A successful one is charged
    /// `max(minimum_fee, actual_cost * unit_price * (1 + markup))`.
    pub fn settle(
        env: Env,
        context: ValidationContext,
        actual_cost: i128,
        success: bool,
    ) -> Result<i128, GatewayError> {
        Storage::get_coordinator(&env)?.require_auth();

        if !success {
            return Ok(0);
        }

        let fee_config = Storage::get_fee_config(&env)?;
        let (asset, fee) = match &context.fee {
            None => (
                FeeAsset::Native,
                Self::fee_with_markup(actual_cost, 1, &fee_config),
            ),
            Some(fee_context) => {
                let fee = Self::fee_with_markup(actual_cost, fee_context.unit_price, &fee_config);
                let gateway = env.current_contract_address();
                token::Client::new(&env, &fee_context.token).transfer_from(
                    &gateway,
                    &context.caller,
                    &gateway,
                    &fee,
                );
                (FeeAsset::Token(fee_context.token.clone()), fee)
            }
        };

        let total = Storage::get_accumulated_fees(&env, &asset);
        Storage::set_accumulated_fees(&env, &asset, total + fee);

        env.events().publish(
            (SPONSORED, context.caller, context.request_hash),
            (asset, fee, actual_cost),
        );
        Ok(fee)
    }

    // Administrative entry points, owner-gated, each evented with the old
    // and new value.

    pub fn set_paused(env: Env, paused: bool) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;
        let mut config = Storage::get_config(&env)?;
        let old = config.paused;
        config.paused = paused;
        Storage::set_config(&env, &config);
        env.events().publish((PAUSED_SET,), (old, paused));
        Ok(())
    }

    pub fn set_allowed_operation(env: Env, op_type: u32, allowed: bool) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;
        let old = Storage::is_operation_allowed(&env, op_type);
        Storage::set_operation_allowed(&env, op_type, allowed);
        env.events().publish((ALLOW_SET, op_type), (old, allowed));
        Ok(())
    }

    pub fn set_cost_ceiling(env: Env, cost_ceiling: i128) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;
        let mut config = Storage::get_config(&env)?;
        let old = config.cost_ceiling;
        config.cost_ceiling = cost_ceiling;
        Storage::set_config(&env, &config);
        env.events().publish((CEILING_SET,), (old, cost_ceiling));
        Ok(())
    }

    pub fn set_authorized_signer(env: Env, signer: BytesN<32>) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;
        let mut config = Storage::get_config(&env)?;
        let old = config.authorized_signer.clone();
        config.authorized_signer = signer.clone();
        Storage::set_config(&env, &config);
        env.events().publish((SIGNER_SET,), (old, signer));
        Ok(())
    }

    /// The auditable escape hatch: while on, attached authorizations are
    /// ignored entirely. Never on by default.
    pub fn set_dev_mode(env: Env, dev_mode: bool) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;
        let mut config = Storage::get_config(&env)?;
        let old = config.dev_mode;
        config.dev_mode = dev_mode;
        Storage::set_config(&env, &config);
        env.events().publish((DEV_MODE_SET,), (old, dev_mode));
        Ok(())
    }

    pub fn set_fee_config(env: Env, fee_config: FeeConfig) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;
        if fee_config.markup_bps > MAX_MARKUP_BPS {
            return Err(GatewayError::MarkupTooHigh);
        }
        let old = Storage::get_fee_config(&env)?;
        Storage::set_fee_config(&env, &fee_config);
        env.events().publish((FEE_CONFIG_SET,), (old, fee_config));
        Ok(())
    }

    pub fn set_aggregator(env: Env, aggregator: Address) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;
        let old = Storage::get_aggregator(&env)?;
        Storage::set_aggregator(&env, &aggregator);
        env.events().publish((AGGREGATOR_SET,), (old, aggregator));
        Ok(())
    }

    pub fn withdraw_fees(
        env: Env,
        asset: FeeAsset,
        to: Address,
        amount: i128,
    ) -> Result<(), GatewayError> {
        Self::require_owner(&env)?;

        let total = Storage::get_accumulated_fees(&env, &asset);
        if amount > total {
            return Err(GatewayError::InsufficientAccumulatedFees);
        }
        Storage::set_accumulated_fees(&env, &asset, total - amount);

        if let FeeAsset::Token(token_address) = &asset {
            token::Client::new(&env, token_address).transfer(
                &env.current_contract_address(),
                &to,
                &amount,
            );
        }

        env.events().publish((WITHDRAWN, to), (asset, amount));
        Ok(())
    }

    pub fn transfer_ownership(env: Env, new_owner: Address) -> Result<(), GatewayError> {
        let old = Self::require_owner(&env)?;
        new_owner.require_auth();
        Storage::set_owner(&env, &new_owner);
        env.events().publish((OWNER_SET,), (old, new_owner));
        Ok(())
    }

    // Views

    pub fn get_owner(env: Env) -> Result<Address, GatewayError> {
        Storage::get_owner(&env)
    }

    pub fn get_coordinator(env: Env) -> Result<Address, GatewayError> {
        Storage::get_coordinator(&env)
    }

    pub fn get_aggregator(env: Env) -> Result<Address, GatewayError> {
        Storage::get_aggregator(&env)
    }

    pub fn get_config(env: Env) -> Result<ValidatorConfig, GatewayError> {
        Storage::get_config(&env)
    }

    pub fn get_fee_config(env: Env) -> Result<FeeConfig, GatewayError> {
        Storage::get_fee_config(&env)
    }

    pub fn is_operation_allowed(env: Env, op_type: u32) -> bool {
        Storage::is_operation_allowed(&env, op_type)
    }

    pub fn get_accumulated_fees(env: Env, asset: FeeAsset) -> i128 {
        Storage::get_accumulated_fees(&env, &asset)
    }

    // Helpers

    fn require_owner(env: &Env) -> Result<Address, GatewayError> {
        let owner = Storage::get_owner(env)?;
        owner.require_auth();
        Ok(owner)
    }

    fn auth_policy(config: &ValidatorConfig) -> AuthPolicy {
        if config.dev_mode {
            AuthPolicy::Bypassed
        } else {
            AuthPolicy::Enforced(config.authorized_signer.clone())
        }
    }

    /// First 4 payload bytes, big-endian.
    fn operation_type(payload: &Bytes) -> Result<u32, GatewayError> {
        if payload.len() < 4 {
            return Err(GatewayError::InvalidDataLength);
        }
        let mut op_type: u32 = 0;
        for i in 0..4 {
            op_type = (op_type << 8) | payload.get_unchecked(i) as u32;
        }
        Ok(op_type)
    }

    /// Expiry first, signature math last. A missing block is rejected as an
    /// unauthorized signer; a block of the wrong shape is a distinct
    /// malformed-data rejection. The signed message is
    /// `request_hash || expiry` and excludes the signature bytes by
    /// construction.
    fn check_authorization(
        env: &Env,
        policy: AuthPolicy,
        authorization: &Bytes,
        request_hash: &BytesN<32>,
    ) -> Result<(), GatewayError> {
        let signer = match policy {
            AuthPolicy::Bypassed => return Ok(()),
            AuthPolicy::Enforced(signer) => signer,
        };

        let len = authorization.len();
        if len == 0 {
            return Err(GatewayError::UnauthorizedSigner);
        }
        if len != AUTH_BLOCK_LEN {
            return Err(GatewayError::InvalidDataLength);
        }

        let mut expiry: u64 = 0;
        for i in 0..EXPIRY_LEN {
            expiry = (expiry << 8) | authorization.get_unchecked(i) as u64;
        }
        if env.ledger().timestamp() >= expiry {
            return Err(GatewayError::Expired);
        }

        let mut key = [0u8; 32];
        authorization.slice(6..38).copy_into_slice(&mut key);
        if BytesN::from_array(env, &key) != signer {
            return Err(GatewayError::UnauthorizedSigner);
        }

        let mut sig = [0u8; 64];
        authorization.slice(38..102).copy_into_slice(&mut sig);
        let signature = BytesN::from_array(env, &sig);

        let mut message = Bytes::from_array(env, &request_hash.to_array());
        message.append(&authorization.slice(0..EXPIRY_LEN));
        // Traps on an invalid signature; never mistaken for a different
        // legitimate signer.
        env.crypto().ed25519_verify(&signer, &message, &signature);
        Ok(())
    }

    /// Secondary-asset feasibility: re-validate the caller's off-chain
    /// price against on-chain consensus, then make sure the worst-case fee
    /// is actually collectible at settlement.
    fn check_fee_quote(
        env: &Env,
        caller: &Address,
        quote: &TokenFeeQuote,
        max_cost: i128,
    ) -> Result<FeeContext, GatewayError> {
        let aggregator = PriceAggregatorClient::new(env, &Storage::get_aggregator(env)?);
        let pair = AssetPair {
            base: Storage::get_native_asset(env)?,
            quote: quote.token.clone(),
        };
        let consensus = aggregator.consensus_price(&pair, &true);
        let bound = aggregator.get_deviation_bps() as i128;

        if quote.claimed_price <= 0
            || (quote.claimed_price - consensus).abs() * BPS_DENOMINATOR > bound * consensus
        {
            return Err(GatewayError::PriceDeviationTooHigh);
        }

        let fee_config = Storage::get_fee_config(env)?;
        let projected = Self::fee_with_markup(max_cost, consensus, &fee_config);

        let fee_token = token::Client::new(env, &quote.token);
        if fee_token.balance(caller) < projected {
            return Err(GatewayError::InsufficientBalance);
        }
        if fee_token.allowance(caller, &env.current_contract_address()) < projected {
            return Err(GatewayError::InsufficientAllowance);
        }

        Ok(FeeContext {
            token: quote.token.clone(),
            unit_price: consensus,
        })
    }

    fn fee_with_markup(cost: i128, unit_price: i128, fee_config: &FeeConfig) -> i128 {
        let fee =
            cost * unit_price * (BPS_DENOMINATOR + fee_config.markup_bps as i128) / BPS_DENOMINATOR;
        fee.max(fee_config.minimum_fee)
    }
}
