use std::time::Duration;

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const FUTURENET_PASSPHRASE: &str = "Test SDF Future Network ; October 2022";

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://soroban-testnet.stellar.org";

/// Inclusion fee per operation, in stroops.
/// HTTP timeout for one RPC request.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_BASE_FEE: u32 = 100;

/// Transaction validity window used for time bounds, in seconds.
pub const DEFAULT_TX_TIMEOUT_SECS: u64 = 30;

/// Ledgers an authorization signature stays valid (~5 minutes at 5s/ledger).
pub const DEFAULT_SIGNATURE_EXPIRATION_WINDOW: u32 = 60;

/// Extra instructions for the custom authorizer's ed25519 verification, which
/// simulation cannot measure because no signature exists yet.
pub const DEFAULT_INSTRUCTION_MARGIN: u32 = 1_000_000;

/// Resource fee added alongside the instruction margin, in stroops.
pub const DEFAULT_RESOURCE_FEE_MARGIN: i64 = 10_000;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 20;

/// Remaining-ledger count under which a shared entry is bumped (~30 days).
pub const DEFAULT_BUMP_THRESHOLD: u32 = 518_400;

/// Largest single-step TTL extension (network max entry TTL minus one).
pub const DEFAULT_MAX_TTL_EXTENSION: u32 = 3_110_399;

/// Argument names of the native key authorizer's signature record.
pub const PUBLIC_KEY_FIELD: &str = "public_key";
pub const SIGNATURE_FIELD: &str = "signature";

pub const TRANSFER_FN: &str = "transfer";
pub const BALANCE_FN: &str = "balance";
pub const FACTORY_CREATE_FN: &str = "create";
