//! Transaction simulation and assembly.
//!
//! A [`Simulation`] is consumed by [`Simulation::assemble`]; once its auth
//! entries are signed there is no path back to a fresh simulation of the same
//! transaction.

use crate::advanced::auth::AuthEntry;
use crate::advanced::instructions;
use crate::advanced::submission::transaction_hash;
use crate::core::config::TransactionConfig;
use crate::core::connection::SorobanConnection;
use crate::core::signer::{signature_hint, LumenitosSigner};
use crate::error::{LumenitosSdkError, Result};
use crate::utils;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use stellar_xdr::curr::{
    DecoratedSignature, HostFunction, LedgerFootprint, Limits, MuxedAccount, Operation,
    OperationBody, ReadXdr, ScVal, Signature, SignatureHint, SorobanResources,
    SorobanTransactionData, SorobanTransactionDataExt, Transaction, TransactionEnvelope,
    TransactionExt, TransactionV1Envelope, Uint256, VecM,
};
use tracing::{debug, warn};

/// Account the simulated transaction is sourced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationSource {
    /// Random key with sequence 0. For read-only calls.
    Throwaway,
    /// Real classic account (`G...`); its sequence is fetched.
    Account(String),
}

/// Result of one successful simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub transaction: Transaction,
    pub transaction_data: SorobanTransactionData,
    pub auth: Vec<AuthEntry>,
    pub min_resource_fee: i64,
    pub result: Option<ScVal>,
    pub latest_ledger: u32,
}

/// Assembled transaction awaiting budget adjustment and envelope signing.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub(crate) transaction: Transaction,
    pub(crate) budget_adjusted: bool,
}

pub struct TransactionSimulator<'a, C: SorobanConnection + ?Sized> {
    connection: &'a C,
    base_fee: u32,
    timeout_secs: u64,
}

impl<'a, C: SorobanConnection + ?Sized> TransactionSimulator<'a, C> {
    pub fn new(connection: &'a C, config: &TransactionConfig) -> Self {
        Self {
            connection,
            base_fee: config.base_fee,
            timeout_secs: config.timeout_secs,
        }
    }

    /// Simulate a single host-function invocation.
    pub async fn simulate(
        &self,
        source: &SimulationSource,
        host_function: HostFunction,
    ) -> Result<Simulation> {
        let operation = instructions::invoke_host_function(host_function, vec![])?;
        let transaction = self.build(source, operation).await?;
        self.run(transaction).await
    }

    /// Simulate an extend or restore operation over an explicit footprint.
    pub async fn simulate_with_footprint(
        &self,
        source: &SimulationSource,
        operation: Operation,
        footprint: LedgerFootprint,
    ) -> Result<Simulation> {
        let mut transaction = self.build(source, operation).await?;
        transaction.ext = TransactionExt::V1(SorobanTransactionData {
            ext: SorobanTransactionDataExt::V0,
            resources: SorobanResources {
                footprint,
                instructions: 0,
                disk_read_bytes: 0,
                write_bytes: 0,
            },
            resource_fee: 0,
        });
        self.run(transaction).await
    }

    async fn build(&self, source: &SimulationSource, operation: Operation) -> Result<Transaction> {
        let (public_key, sequence) = match source {
            SimulationSource::Throwaway => {
                let key = SigningKey::generate(&mut OsRng);
                (key.verifying_key().to_bytes(), 0)
            },
            SimulationSource::Account(address) => {
                let account = self
                    .connection
                    .get_account(address)
                    .await
                    .map_err(|e| LumenitosSdkError::Connection(e.to_string()))?;
                let public_key = match stellar_strkey::Strkey::from_string(address) {
                    Ok(stellar_strkey::Strkey::PublicKeyEd25519(pk)) => pk.0,
                    _ => return Err(LumenitosSdkError::InvalidAddress(address.clone())),
                };
                (public_key, account.sequence)
            },
        };
        instructions::build_transaction(
            &public_key,
            sequence,
            self.base_fee,
            self.timeout_secs,
            operation,
        )
    }

    async fn run(&self, transaction: Transaction) -> Result<Simulation> {
        let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: transaction.clone(),
            signatures: VecM::default(),
        });
        let response = self
            .connection
            .simulate_transaction(&envelope)
            .await
            .map_err(|e| LumenitosSdkError::Connection(e.to_string()))?;

        if let Some(error) = response.error {
            warn!(%error, "simulation failed");
            return Err(LumenitosSdkError::Simulation(error));
        }
        if let Some(preamble) = response.restore_preamble {
            return Err(LumenitosSdkError::RestoreRequired {
                min_resource_fee: parse_fee(&preamble.min_resource_fee)?,
            });
        }

        let encoded = response.transaction_data.ok_or_else(|| {
            LumenitosSdkError::Simulation("simulation returned no transaction data".into())
        })?;
        let transaction_data = SorobanTransactionData::from_xdr_base64(&encoded, Limits::none())?;
        let min_resource_fee = match response.min_resource_fee.as_deref() {
            Some(fee) => parse_fee(fee)?,
            None => 0,
        };

        let (auth, result) = match response.results.into_iter().next() {
            Some(host_result) => {
                let auth = host_result
                    .auth
                    .iter()
                    .map(|entry| AuthEntry::try_from(entry.as_str()))
                    .collect::<Result<Vec<_>>>()?;
                let result = host_result
                    .xdr
                    .map(|xdr| ScVal::from_xdr_base64(&xdr, Limits::none()))
                    .transpose()?;
                (auth, result)
            },
            None => (Vec::new(), None),
        };

        debug!(
            instructions = transaction_data.resources.instructions,
            min_resource_fee,
            auth_entries = auth.len(),
            latest_ledger = response.latest_ledger,
            "simulated transaction"
        );

        Ok(Simulation {
            transaction,
            transaction_data,
            auth,
            min_resource_fee,
            result,
            latest_ledger: response.latest_ledger,
        })
    }
}

fn parse_fee(value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|_| LumenitosSdkError::Simulation(format!("invalid resource fee {value}")))
}

impl Simulation {
    /// Attach signed entries, resources and fee. `signed_auth` must be the
    /// simulated entries, in order, with their invocation trees untouched.
    pub fn assemble(self, signed_auth: Vec<AuthEntry>) -> Result<PreparedTransaction> {
        if signed_auth.len() != self.auth.len() {
            return Err(LumenitosSdkError::InvalidPipelineState(format!(
                "expected {} signed auth entries, got {}",
                self.auth.len(),
                signed_auth.len()
            )));
        }
        for (simulated, signed) in self.auth.iter().zip(&signed_auth) {
            if simulated.invocation() != signed.invocation() {
                return Err(LumenitosSdkError::InvalidPipelineState(
                    "signed auth entry changed the simulated invocation".into(),
                ));
            }
        }

        let mut transaction = self.transaction;
        let mut operations = transaction.operations.to_vec();
        if let Some(Operation {
            body: OperationBody::InvokeHostFunction(op),
            ..
        }) = operations.first_mut()
        {
            op.auth = signed_auth
                .into_iter()
                .map(AuthEntry::into_xdr)
                .collect::<Vec<_>>()
                .try_into()?;
        }
        transaction.operations = operations.try_into()?;

        let resource_fee = u32::try_from(self.min_resource_fee).map_err(|_| {
            LumenitosSdkError::Simulation(format!(
                "resource fee {} out of range",
                self.min_resource_fee
            ))
        })?;
        transaction.fee = transaction.fee.saturating_add(resource_fee);
        transaction.ext = TransactionExt::V1(self.transaction_data);

        Ok(PreparedTransaction {
            transaction,
            budget_adjusted: false,
        })
    }
}

impl PreparedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn is_budget_adjusted(&self) -> bool {
        self.budget_adjusted
    }

    pub fn has_address_credentials(&self) -> bool {
        self.transaction.operations.iter().any(|op| match &op.body {
            OperationBody::InvokeHostFunction(invoke) => invoke
                .auth
                .iter()
                .any(|entry| AuthEntry::from(entry.clone()).is_address()),
            _ => false,
        })
    }

    pub fn hash(&self, network_passphrase: &str) -> Result<[u8; 32]> {
        transaction_hash(&self.transaction, &utils::network_id(network_passphrase))
    }

    /// Sign the envelope as the transaction source. The budget must already
    /// have been adjusted.
    pub async fn sign(
        self,
        signer: &dyn LumenitosSigner,
        network_passphrase: &str,
    ) -> Result<TransactionEnvelope> {
        if !self.budget_adjusted {
            return Err(LumenitosSdkError::InvalidPipelineState(
                "resource budget must be adjusted before signing".into(),
            ));
        }
        let public_key = signer.public_key();
        let MuxedAccount::Ed25519(Uint256(source)) = &self.transaction.source_account else {
            return Err(LumenitosSdkError::InvalidPipelineState(
                "muxed transaction sources are not supported".into(),
            ));
        };
        if *source != public_key {
            return Err(LumenitosSdkError::KeyMissing(utils::encode_account_address(
                source,
            )));
        }

        let hash = self.hash(network_passphrase)?;
        let signature = signer
            .sign_message(&hash)
            .await
            .map_err(LumenitosSdkError::AuthSigning)?;

        Ok(TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: self.transaction,
            signatures: vec![DecoratedSignature {
                hint: SignatureHint(signature_hint(&public_key)),
                signature: Signature(signature.to_vec().try_into()?),
            }]
            .try_into()?,
        }))
    }
}
