use crate::advanced::auth::{AuthEntrySigner, AuthorizerKind};
use crate::advanced::budget::ResourceBudgetAdjuster;
use crate::advanced::instructions;
use crate::advanced::simulation::{SimulationSource, TransactionSimulator};
use crate::advanced::submission::{SubmissionCoordinator, SubmissionOutcome};
use crate::basic::wallet::{Deployer, LumenitosWallet};
use crate::core::config::TransactionConfig;
use crate::core::connection::SorobanConnection;
use crate::core::constants::{FACTORY_CREATE_FN, TRANSFER_FN};
use crate::core::signer::LumenitosSigner;
use crate::error::{LumenitosSdkError, Result};
use crate::utils;
use stellar_xdr::curr::{HostFunction, LedgerFootprint, Operation, ScVal, TransactionEnvelope};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

//=============================================================================
// Pipeline
//=============================================================================

/// simulate → sign auth → assemble → adjust budget → sign envelope → submit.
///
/// One run is a single unit: nothing is retried in isolation and a failed
/// run must be restarted from simulation.
pub struct TransactionPipeline<'a, C: SorobanConnection + ?Sized> {
    connection: &'a C,
    network_passphrase: &'a str,
    config: &'a TransactionConfig,
    authorizer_kind: Option<AuthorizerKind>,
    cancel: CancellationToken,
}

impl<'a, C: SorobanConnection + ?Sized> TransactionPipeline<'a, C> {
    pub fn new(connection: &'a C, network_passphrase: &'a str, config: &'a TransactionConfig) -> Self {
        Self {
            connection,
            network_passphrase,
            config,
            authorizer_kind: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_authorizer_kind(mut self, kind: AuthorizerKind) -> Self {
        self.authorizer_kind = Some(kind);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Simulate against a throwaway source and return the call's result.
    pub async fn read(&self, host_function: HostFunction) -> Result<Option<ScVal>> {
        let simulation = TransactionSimulator::new(self.connection, self.config)
            .simulate(&SimulationSource::Throwaway, host_function)
            .await?;
        Ok(simulation.result)
    }

    /// Build a fully signed envelope. `source` pays and signs the envelope;
    /// `auth_signer` signs address-credential entries.
    pub async fn prepare(
        &self,
        host_function: HostFunction,
        source: &dyn LumenitosSigner,
        auth_signer: Option<&dyn LumenitosSigner>,
    ) -> Result<TransactionEnvelope> {
        let simulation = TransactionSimulator::new(self.connection, self.config)
            .simulate(
                &SimulationSource::Account(source.account_address()),
                host_function,
            )
            .await?;

        let current_ledger = if simulation.latest_ledger > 0 {
            simulation.latest_ledger
        } else {
            self.connection
                .get_latest_ledger()
                .await
                .map_err(|e| LumenitosSdkError::Connection(e.to_string()))?
        };
        let expiration_ledger =
            current_ledger.saturating_add(self.config.signature_expiration_window);

        let mut signer = AuthEntrySigner::new(self.network_passphrase, auth_signer);
        if let Some(kind) = self.authorizer_kind {
            signer = signer.with_authorizer_kind(kind);
        }
        let signed = signer.sign_all(simulation.auth.clone(), expiration_ledger).await?;
        debug!(entries = signed.len(), expiration_ledger, "auth entries signed");

        let mut prepared = simulation.assemble(signed)?;
        ResourceBudgetAdjuster::from_config(self.config).apply(&mut prepared)?;
        prepared.sign(source, self.network_passphrase).await
    }

    pub async fn execute(
        &self,
        host_function: HostFunction,
        source: &dyn LumenitosSigner,
        auth_signer: Option<&dyn LumenitosSigner>,
    ) -> Result<SubmissionOutcome> {
        let envelope = self.prepare(host_function, source, auth_signer).await?;
        self.submit(&envelope).await
    }

    /// Run an extend or restore operation over `footprint`.
    pub async fn execute_footprint_operation(
        &self,
        operation: Operation,
        footprint: LedgerFootprint,
        source: &dyn LumenitosSigner,
    ) -> Result<SubmissionOutcome> {
        let simulation = TransactionSimulator::new(self.connection, self.config)
            .simulate_with_footprint(
                &SimulationSource::Account(source.account_address()),
                operation,
                footprint,
            )
            .await?;
        let mut prepared = simulation.assemble(vec![])?;
        ResourceBudgetAdjuster::from_config(self.config).apply(&mut prepared)?;
        let envelope = prepared.sign(source, self.network_passphrase).await?;
        self.submit(&envelope).await
    }

    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<SubmissionOutcome> {
        SubmissionCoordinator::from_config(self.config, self.network_passphrase)
            .submit_with_cancel(self.connection, envelope, &self.cancel)
            .await
    }
}

//=============================================================================
// Transfer
//=============================================================================

/// Which of the wallet's two accounts sends funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferSource {
    /// The owner's classic account (`G...`).
    #[default]
    Classic,
    /// The owner's programmable account (`C...`).
    Programmable,
}

pub struct TransferBuilder<'w> {
    wallet: &'w LumenitosWallet,
    token: Option<String>,
    destination: Option<String>,
    amount: Option<i128>,
    source: TransferSource,
    fee_payer: Option<&'w dyn LumenitosSigner>,
}

impl<'w> TransferBuilder<'w> {
    pub fn new(wallet: &'w LumenitosWallet) -> Self {
        Self {
            wallet,
            token: None,
            destination: None,
            amount: None,
            source: TransferSource::Classic,
            fee_payer: None,
        }
    }

    /// Token contract; defaults to the native asset contract.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Amount in the token's base units (stroops for the native asset).
    pub fn with_amount(mut self, amount: i128) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn from_source(mut self, source: TransferSource) -> Self {
        self.source = source;
        self
    }

    /// Let another account pay fees; the classic sender then authorizes by
    /// signed address credential instead of the envelope signature.
    pub fn with_fee_payer(mut self, fee_payer: &'w dyn LumenitosSigner) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    pub fn sender(&self) -> &str {
        match self.source {
            TransferSource::Classic => self.wallet.account_address(),
            TransferSource::Programmable => self.wallet.contract_address(),
        }
    }

    pub fn build_host_function(&self) -> Result<HostFunction> {
        let destination = self
            .destination
            .as_deref()
            .ok_or_else(|| LumenitosSdkError::Other("destination required".into()))?;
        let amount = self
            .amount
            .ok_or_else(|| LumenitosSdkError::Other("amount required".into()))?;
        if amount <= 0 {
            return Err(LumenitosSdkError::Other(format!(
                "amount must be positive, got {amount}"
            )));
        }

        let token = match &self.token {
            Some(token) => token.clone(),
            None => utils::native_asset_contract_address(self.wallet.network_passphrase())?,
        };
        instructions::invoke_contract(
            &utils::parse_sc_address(&token)?,
            TRANSFER_FN,
            vec![
                ScVal::Address(utils::parse_sc_address(self.sender())?),
                ScVal::Address(utils::parse_sc_address(destination)?),
                utils::i128_val(amount),
            ],
        )
    }

    pub async fn execute<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        owner: &dyn LumenitosSigner,
    ) -> Result<SubmissionOutcome> {
        let host_function = self.build_host_function()?;
        let source = self.fee_payer.unwrap_or(owner);
        info!(
            from = self.sender(),
            to = self.destination.as_deref().unwrap_or_default(),
            amount = ?self.amount,
            "transfer"
        );
        self.wallet
            .run_pipeline(connection, host_function, source, Some(owner))
            .await
    }
}

//=============================================================================
// Deployment
//=============================================================================

pub struct DeployAccountBuilder<'w> {
    wallet: &'w LumenitosWallet,
    wasm_hash: Option<[u8; 32]>,
}

impl<'w> DeployAccountBuilder<'w> {
    pub fn new(wallet: &'w LumenitosWallet) -> Self {
        Self {
            wallet,
            wasm_hash: None,
        }
    }

    /// Simple-account wasm hash. Required when the owner deploys directly.
    pub fn with_wasm_hash(mut self, wasm_hash: [u8; 32]) -> Self {
        self.wasm_hash = Some(wasm_hash);
        self
    }

    pub fn build_host_function(&self) -> Result<HostFunction> {
        let owner = self.wallet.owner_public_key();
        match self.wallet.deployer() {
            Deployer::Owner => {
                let wasm_hash = self.wasm_hash.ok_or_else(|| {
                    LumenitosSdkError::Config("simple account wasm hash required".into())
                })?;
                instructions::create_contract(
                    &utils::account_sc_address(owner),
                    *owner,
                    wasm_hash,
                    vec![utils::bytes_val(owner)?],
                )
            },
            Deployer::Factory(factory) => instructions::invoke_contract(
                &utils::parse_sc_address(factory)?,
                FACTORY_CREATE_FN,
                vec![utils::bytes_val(owner)?],
            ),
        }
    }

    /// Deploy the wallet's programmable account. `payer` signs the envelope
    /// and must be the owner when the owner is the deployer.
    pub async fn execute<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        payer: &dyn LumenitosSigner,
    ) -> Result<SubmissionOutcome> {
        if *self.wallet.deployer() == Deployer::Owner
            && payer.public_key() != *self.wallet.owner_public_key()
        {
            return Err(LumenitosSdkError::KeyMissing(
                self.wallet.account_address().to_string(),
            ));
        }
        let host_function = self.build_host_function()?;
        info!(address = self.wallet.contract_address(), "deploying account");
        self.wallet
            .run_pipeline(connection, host_function, payer, None)
            .await
    }
}
