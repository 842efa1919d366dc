use soroban_sdk::{contracterror, contracttype, Address, Bytes, BytesN};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum GatewayError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Paused = 3,
    InvalidDataLength = 4,
    DisallowedFunction = 5,
    CostCeilingExceeded = 6,
    Expired = 7,
    UnauthorizedSigner = 8,
    PriceDeviationTooHigh = 9,
    InsufficientBalance = 10,
    InsufficientAllowance = 11,
    MarkupTooHigh = 12,
    InsufficientAccumulatedFees = 13,
}

/// One caller-submitted unit of work the gateway may choose to fund.
/// Ephemeral: it exists for a single validate/settle cycle.
///
/// The operation-type discriminator is the first 4 bytes of `payload`.
/// `authorization` is either empty (nothing attached) or the packed block
/// `expiry(6, big-endian seconds) || signer key(32) || signature(64)`.
/// `fee_quote` selects secondary-asset fee mode.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperationRequest {
    pub caller: Address,
    pub payload: Bytes,
    pub declared_cost_ceiling: i128,
    pub authorization: Bytes,
    pub fee_quote: Option<TokenFeeQuote>,
}

/// Caller-supplied off-chain unit price for the fee token, re-validated
/// against on-chain consensus during validation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenFeeQuote {
    pub token: Address,
    pub claimed_price: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatorConfig {
    pub paused: bool,
    pub cost_ceiling: i128,
    pub authorized_signer: BytesN<32>,
    pub dev_mode: bool,
}

/// How `validate` treats the attached authorization. The bypass is a
/// distinct mode chosen by configuration, not a conditional inside the
/// enforced path.
pub enum AuthPolicy {
    Enforced(BytesN<32>),
    Bypassed,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeConfig {
    pub minimum_fee: i128,
    pub markup_bps: u32,
}

/// Asset a fee was collected in. Native fees are recorded only; token fees
/// are actually held by the gateway.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeeAsset {
    Native,
    Token(Address),
}

/// Typed handoff from `validate` to `settle`. Passed through the
/// coordinator unchanged. Native-fee requests carry `fee: None`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationContext {
    pub caller: Address,
    pub request_hash: BytesN<32>,
    pub fee: Option<FeeContext>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeContext {
    pub token: Address,
    pub unit_price: i128,
}

/// Pair shape the aggregator keys its consensus groups by.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssetPair {
    pub base: Address,
    pub quote: Address,
}

#[contracttype]
pub enum DataKey {
    Owner,
    Coordinator,
    Aggregator,
    NativeAsset,
    Config,
    FeeConfig,
    AllowedOp(u32),
    Accumulated(FeeAsset),
}
