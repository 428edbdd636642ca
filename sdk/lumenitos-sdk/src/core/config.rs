//! SDK configuration.
//!
//! Loaded from TOML, then overridden from `LUMENITOS_*` environment variables.
//! Every field has a default so a partial file is valid.

use crate::core::constants::*;
use crate::error::{LumenitosSdkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_RPC_URL: &str = "LUMENITOS_RPC_URL";
pub const ENV_NETWORK_PASSPHRASE: &str = "LUMENITOS_NETWORK_PASSPHRASE";
pub const ENV_FACTORY_ADDRESS: &str = "LUMENITOS_FACTORY_ADDRESS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub rpc_url: String,
    /// Per-request HTTP timeout, independent of transaction time bounds.
    pub rpc_timeout_secs: u64,
    pub network_passphrase: String,
    pub contracts: ContractsConfig,
    pub transactions: TransactionConfig,
    pub lifecycle: LifecycleConfig,
}

/// Shared on-chain resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Hex sha256 of the simple-account wasm.
    pub simple_account_wasm_hash: Option<String>,
    /// Hex sha256 of the account-factory wasm.
    pub factory_wasm_hash: Option<String>,
    /// Classic account (`G...`) that deployed the factory.
    pub factory_deployer: Option<String>,
    /// Hex 32-byte salt the factory was deployed with.
    pub factory_salt: Option<String>,
    /// Explicit factory address; must match the derived one when both are set.
    pub factory_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub base_fee: u32,
    pub timeout_secs: u64,
    pub signature_expiration_window: u32,
    pub instruction_margin: u32,
    pub resource_fee_margin: i64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Overall confirmation deadline; unset means attempts are the only bound.
    pub confirmation_deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub bump_threshold: u32,
    pub max_ttl_extension: u32,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_TESTNET_RPC_URL.to_string(),
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            contracts: ContractsConfig::default(),
            transactions: TransactionConfig::default(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            base_fee: DEFAULT_BASE_FEE,
            timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
            signature_expiration_window: DEFAULT_SIGNATURE_EXPIRATION_WINDOW,
            instruction_margin: DEFAULT_INSTRUCTION_MARGIN,
            resource_fee_margin: DEFAULT_RESOURCE_FEE_MARGIN,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            confirmation_deadline_secs: None,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            bump_threshold: DEFAULT_BUMP_THRESHOLD,
            max_ttl_extension: DEFAULT_MAX_TTL_EXTENSION,
        }
    }
}

impl TransactionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_deadline(&self) -> Option<Duration> {
        self.confirmation_deadline_secs.map(Duration::from_secs)
    }
}

impl SdkConfig {
    pub fn testnet() -> Self {
        Self::default()
    }

    pub fn mainnet(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            network_passphrase: MAINNET_PASSPHRASE.to_string(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| LumenitosSdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LumenitosSdkError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(passphrase) = lookup(ENV_NETWORK_PASSPHRASE) {
            self.network_passphrase = passphrase;
        }
        if let Some(factory) = lookup(ENV_FACTORY_ADDRESS) {
            self.contracts.factory_address = Some(factory);
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(LumenitosSdkError::Config("rpc_url is empty".into()));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(LumenitosSdkError::Config(
                "rpc_timeout_secs must be at least 1".into(),
            ));
        }
        if self.network_passphrase.is_empty() {
            return Err(LumenitosSdkError::Config(
                "network_passphrase is empty".into(),
            ));
        }
        if self.transactions.max_poll_attempts == 0 {
            return Err(LumenitosSdkError::Config(
                "max_poll_attempts must be at least 1".into(),
            ));
        }
        if self.lifecycle.bump_threshold >= self.lifecycle.max_ttl_extension {
            return Err(LumenitosSdkError::Config(
                "bump_threshold must be below max_ttl_extension".into(),
            ));
        }
        Ok(())
    }
}
