use crate::basic::history::{self, TransferRecord};
use crate::basic::lifecycle::TtlLifecycleManager;
use crate::basic::wallet::{Deployer, LumenitosWallet};
use crate::core::config::SdkConfig;
use crate::core::connection::SorobanConnection;
use crate::core::rpc::RpcConnection;
use crate::error::{LumenitosSdkError, Result};
use crate::utils;
use std::sync::Arc;

/// Wires configuration and transport together. The only place a transport
/// is created; everything below it receives one.
pub struct LumenitosClient<C: SorobanConnection + ?Sized = RpcConnection> {
    connection: Arc<C>,
    config: SdkConfig,
}

impl LumenitosClient<RpcConnection> {
    pub fn from_config(config: SdkConfig) -> Result<Self> {
        config.validate()?;
        let connection = RpcConnection::with_timeout(config.rpc_url.clone(), config.rpc_timeout())
            .map_err(|e| LumenitosSdkError::Connection(e.to_string()))?;
        Ok(Self::with_connection(Arc::new(connection), config))
    }
}

impl<C: SorobanConnection + ?Sized> LumenitosClient<C> {
    pub fn with_connection(connection: Arc<C>, config: SdkConfig) -> Self {
        Self { connection, config }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Factory address from config: explicit, or derived from deployer and salt.
    pub fn factory_address(&self) -> Result<Option<String>> {
        let contracts = &self.config.contracts;
        if let Some(address) = &contracts.factory_address {
            return Ok(Some(address.clone()));
        }
        match (&contracts.factory_deployer, &contracts.factory_salt) {
            (Some(deployer), Some(salt)) => {
                let id = utils::derive_contract_id(
                    &utils::parse_hex32(salt)?,
                    &utils::parse_sc_address(deployer)?,
                    &self.config.network_passphrase,
                )?;
                Ok(Some(utils::encode_contract_address(&id)))
            },
            _ => Ok(None),
        }
    }

    /// Wallet for `owner_public_key`, deployed through the configured factory
    /// when there is one.
    pub fn wallet(&self, owner_public_key: &[u8]) -> Result<LumenitosWallet> {
        let deployer = match self.factory_address()? {
            Some(factory) => Deployer::Factory(factory),
            None => Deployer::Owner,
        };
        self.wallet_with_deployer(owner_public_key, deployer)
    }

    pub fn wallet_with_deployer(
        &self,
        owner_public_key: &[u8],
        deployer: Deployer,
    ) -> Result<LumenitosWallet> {
        LumenitosWallet::new(
            owner_public_key,
            deployer,
            self.config.network_passphrase.clone(),
            self.config.transactions.clone(),
        )
    }

    pub fn lifecycle(&self) -> Result<TtlLifecycleManager<'_, C>> {
        TtlLifecycleManager::from_config(self.connection.as_ref(), &self.config)
    }

    pub async fn transfers(
        &self,
        address: &str,
        start_ledger: u32,
        limit: Option<u32>,
    ) -> Result<Vec<TransferRecord>> {
        history::fetch_transfers(self.connection.as_ref(), address, start_ledger, limit).await
    }
}
