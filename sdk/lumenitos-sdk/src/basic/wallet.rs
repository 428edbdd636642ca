use crate::advanced::instructions;
use crate::advanced::submission::SubmissionOutcome;
use crate::basic::actions::{DeployAccountBuilder, TransactionPipeline, TransferBuilder};
use crate::core::config::TransactionConfig;
use crate::core::connection::SorobanConnection;
use crate::core::constants::BALANCE_FN;
use crate::core::signer::LumenitosSigner;
use crate::error::{LumenitosSdkError, Result};
use crate::utils;
use futures::future::join_all;
use stellar_xdr::curr::{HostFunction, ScAddress, ScVal};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Who deploys the programmable account, and therefore fixes its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployer {
    /// The owner's classic account deploys directly.
    Owner,
    /// A shared factory contract (`C...`) deploys on the owner's behalf.
    Factory(String),
}

/// The two accounts one owner key controls.
#[derive(Debug)]
pub struct LumenitosWallet {
    owner_public_key: [u8; 32],
    account_address: String,
    contract_address: String,
    deployer: Deployer,
    network_passphrase: String,
    config: TransactionConfig,
    pipeline: Mutex<()>,
}

impl LumenitosWallet {
    pub fn new(
        owner_public_key: &[u8],
        deployer: Deployer,
        network_passphrase: impl Into<String>,
        config: TransactionConfig,
    ) -> Result<Self> {
        let network_passphrase = network_passphrase.into();
        let owner = utils::validate_owner_key(owner_public_key)?;

        let deployer_address = match &deployer {
            Deployer::Owner => utils::account_sc_address(&owner),
            Deployer::Factory(factory) => match utils::parse_sc_address(factory)? {
                address @ ScAddress::Contract(_) => address,
                _ => {
                    return Err(LumenitosSdkError::InvalidAddress(format!(
                        "factory {factory} is not a contract address"
                    )))
                },
            },
        };
        let contract_address =
            utils::derive_contract_address(&owner, &deployer_address, &network_passphrase)?;
        let account_address = utils::encode_account_address(&owner);
        debug!(%account_address, %contract_address, "wallet derived");

        Ok(Self {
            owner_public_key: owner,
            account_address,
            contract_address,
            deployer,
            network_passphrase,
            config,
            pipeline: Mutex::new(()),
        })
    }

    pub fn owner_public_key(&self) -> &[u8; 32] {
        &self.owner_public_key
    }

    /// Classic account (`G...`).
    pub fn account_address(&self) -> &str {
        &self.account_address
    }

    /// Programmable account (`C...`).
    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    pub fn deployer(&self) -> &Deployer {
        &self.deployer
    }

    pub fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn transfer(&self) -> TransferBuilder<'_> {
        TransferBuilder::new(self)
    }

    pub fn deploy(&self) -> DeployAccountBuilder<'_> {
        DeployAccountBuilder::new(self)
    }

    /// Run one pipeline. Runs for the same wallet never interleave.
    pub async fn run_pipeline<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        host_function: HostFunction,
        source: &dyn LumenitosSigner,
        auth_signer: Option<&dyn LumenitosSigner>,
    ) -> Result<SubmissionOutcome> {
        self.run_pipeline_with_cancel(
            connection,
            host_function,
            source,
            auth_signer,
            CancellationToken::new(),
        )
        .await
    }

    pub async fn run_pipeline_with_cancel<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        host_function: HostFunction,
        source: &dyn LumenitosSigner,
        auth_signer: Option<&dyn LumenitosSigner>,
        cancel: CancellationToken,
    ) -> Result<SubmissionOutcome> {
        if let Some(signer) = auth_signer {
            if signer.public_key() != self.owner_public_key {
                return Err(LumenitosSdkError::KeyMissing(self.account_address.clone()));
            }
        }
        let _guard = self.pipeline.lock().await;
        TransactionPipeline::new(connection, &self.network_passphrase, &self.config)
            .with_cancellation(cancel)
            .execute(host_function, source, auth_signer)
            .await
    }

    /// Token balance of `holder` (either of this wallet's addresses, or any
    /// other), read by simulation.
    pub async fn balance<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        token: &str,
        holder: &str,
    ) -> Result<i128> {
        let host_function = instructions::invoke_contract(
            &utils::parse_sc_address(token)?,
            BALANCE_FN,
            vec![ScVal::Address(utils::parse_sc_address(holder)?)],
        )?;
        let result = TransactionPipeline::new(connection, &self.network_passphrase, &self.config)
            .read(host_function)
            .await?;
        match result {
            Some(ScVal::I128(parts)) => Ok(utils::i128_from_parts(&parts)),
            other => Err(LumenitosSdkError::Simulation(format!(
                "unexpected balance result {other:?}"
            ))),
        }
    }

    /// Balances of several tokens for `holder`, read concurrently.
    pub async fn balances<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        tokens: &[String],
        holder: &str,
    ) -> Vec<(String, Result<i128>)> {
        let reads = tokens
            .iter()
            .map(|token| self.balance(connection, token, holder));
        tokens.iter().cloned().zip(join_all(reads).await).collect()
    }

    pub async fn native_balance<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        holder: &str,
    ) -> Result<i128> {
        let token = utils::native_asset_contract_address(&self.network_passphrase)?;
        self.balance(connection, &token, holder).await
    }

    /// Whether the programmable account's instance exists on the ledger.
    pub async fn is_deployed<C: SorobanConnection + ?Sized>(&self, connection: &C) -> Result<bool> {
        let key = utils::contract_instance_key(&utils::parse_sc_address(&self.contract_address)?);
        let response = connection
            .get_ledger_entries(&[key])
            .await
            .map_err(|e| {
                warn!(address = %self.contract_address, error = %e, "instance lookup failed");
                LumenitosSdkError::Connection(e.to_string())
            })?;
        Ok(!response.entries.is_empty())
    }
}
