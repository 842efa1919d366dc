use soroban_sdk::{contracterror, contracttype, Address};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum AggregatorError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    IdenticalAssets = 3,
    ReversePairExists = 4,
    DuplicateFeed = 5,
    InvalidIndex = 6,
    NoData = 7,
    DeviationTooHigh = 8,
}

/// Ordered asset pair identifying one aggregation group. A pair and its
/// reverse are never both configured.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssetPair {
    pub base: Address,
    pub quote: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeedRegistration {
    pub adapter: Address,
    pub enabled: bool,
}

/// Quote shape returned by feed adapters.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PriceData {
    pub price: i128,
    pub timestamp: u64,
}

#[contracttype]
pub enum DataKey {
    Owner,
    DeviationBps,
    Feeds(AssetPair),
}
