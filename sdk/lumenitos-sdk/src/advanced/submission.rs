use crate::core::config::TransactionConfig;
use crate::core::connection::{GetTransactionStatus, SendTransactionStatus, SorobanConnection};
use crate::error::{LumenitosSdkError, Result};
use crate::utils;
use std::time::Duration;
use stellar_xdr::curr::{
    Hash, Limits, ReadXdr, ScVal, Transaction, TransactionEnvelope, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, WriteXdr,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Network hash of a transaction, as used by `getTransaction`.
pub fn transaction_hash(transaction: &Transaction, network_id: &[u8; 32]) -> Result<[u8; 32]> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(*network_id),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(transaction.clone()),
    };
    Ok(utils::sha256(&payload.to_xdr(Limits::none())?))
}

/// Hex network hash of a signed envelope, known before submission.
pub fn envelope_hash(envelope: &TransactionEnvelope, network_id: &[u8; 32]) -> Result<String> {
    let tagged = match envelope {
        TransactionEnvelope::Tx(v1) => TransactionSignaturePayloadTaggedTransaction::Tx(v1.tx.clone()),
        TransactionEnvelope::TxFeeBump(bump) => {
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(bump.tx.clone())
        },
        TransactionEnvelope::TxV0(_) => {
            return Err(LumenitosSdkError::InvalidPipelineState(
                "v0 envelopes are not submitted".into(),
            ))
        },
    };
    let payload = TransactionSignaturePayload {
        network_id: Hash(*network_id),
        tagged_transaction: tagged,
    };
    Ok(hex::encode(utils::sha256(&payload.to_xdr(Limits::none())?)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedTransaction {
    pub hash: String,
    pub ledger: Option<u32>,
    pub return_value: Option<ScVal>,
    pub result_meta_xdr: Option<String>,
}

/// Terminal view of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Success(ConfirmedTransaction),
    Failed { hash: String, detail: String },
    /// Not observed within the polling bounds. The transaction may still
    /// land; re-query `hash` before treating it as failed.
    TimedOut { hash: String, attempts: u32 },
}

impl SubmissionOutcome {
    pub fn hash(&self) -> &str {
        match self {
            Self::Success(confirmed) => &confirmed.hash,
            Self::Failed { hash, .. } | Self::TimedOut { hash, .. } => hash,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<ConfirmedTransaction> {
        match self {
            Self::Success(confirmed) => Ok(confirmed),
            Self::Failed { hash, detail } => {
                Err(LumenitosSdkError::TransactionFailed { hash, detail })
            },
            Self::TimedOut { hash, attempts } => {
                Err(LumenitosSdkError::SubmissionTimeout { hash, attempts })
            },
        }
    }
}

/// Submits signed envelopes and polls for a terminal status.
#[derive(Debug, Clone)]
pub struct SubmissionCoordinator {
    network_id: [u8; 32],
    poll_interval: Duration,
    max_attempts: u32,
    deadline: Option<Duration>,
}

impl SubmissionCoordinator {
    pub fn new(network_passphrase: &str, poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            network_id: utils::network_id(network_passphrase),
            poll_interval,
            max_attempts,
            deadline: None,
        }
    }

    pub fn from_config(config: &TransactionConfig, network_passphrase: &str) -> Self {
        Self {
            network_id: utils::network_id(network_passphrase),
            poll_interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
            deadline: config.confirmation_deadline(),
        }
    }

    /// Stop polling once `deadline` has elapsed since submission.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn submit<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        envelope: &TransactionEnvelope,
    ) -> Result<SubmissionOutcome> {
        self.submit_with_cancel(connection, envelope, &CancellationToken::new())
            .await
    }

    /// Submit once and poll. Rejections are errors; everything after the
    /// envelope may have reached the network is a [`SubmissionOutcome`].
    pub async fn submit_with_cancel<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        envelope: &TransactionEnvelope,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome> {
        let local_hash = envelope_hash(envelope, &self.network_id)?;
        let response = match connection.send_transaction(envelope).await {
            Ok(response) => response,
            Err(e) => {
                // The envelope may have been delivered; only the ledger can tell.
                warn!(hash = %local_hash, error = %e, "send failed, polling for the envelope");
                return self.poll(connection, local_hash, cancel).await;
            },
        };
        let hash = response.hash;
        info!(%hash, status = response.status.as_str(), "submitted transaction");

        match response.status {
            SendTransactionStatus::Error | SendTransactionStatus::TryAgainLater => {
                return Err(LumenitosSdkError::SubmissionRejected {
                    status: response.status.as_str().to_string(),
                    hash,
                    detail: response.error_result_xdr,
                });
            },
            SendTransactionStatus::Success => {
                return Ok(SubmissionOutcome::Success(ConfirmedTransaction {
                    hash,
                    ledger: None,
                    return_value: None,
                    result_meta_xdr: None,
                }));
            },
            SendTransactionStatus::Pending | SendTransactionStatus::Duplicate => {},
        }

        self.poll(connection, hash, cancel).await
    }

    async fn poll<C: SorobanConnection + ?Sized>(
        &self,
        connection: &C,
        hash: String,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome> {
        let deadline_at = self.deadline.map(|deadline| Instant::now() + deadline);
        let mut attempts = 0;

        while attempts < self.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(%hash, attempts, "confirmation polling cancelled");
                    break;
                }
                _ = until(deadline_at) => {
                    warn!(%hash, attempts, "confirmation deadline reached");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            attempts += 1;

            let response = match connection.get_transaction(&hash).await {
                Ok(response) => response,
                Err(e) => {
                    debug!(%hash, attempt = attempts, error = %e, "poll failed, treating as not found");
                    continue;
                },
            };
            debug!(%hash, attempt = attempts, status = ?response.status, "polled transaction");

            match response.status {
                GetTransactionStatus::NotFound => continue,
                GetTransactionStatus::Success => {
                    let return_value = response.return_value.and_then(|xdr| {
                        ScVal::from_xdr_base64(&xdr, Limits::none())
                            .map_err(|e| warn!(%hash, error = %e, "undecodable return value"))
                            .ok()
                    });
                    info!(%hash, ledger = ?response.ledger, "transaction confirmed");
                    return Ok(SubmissionOutcome::Success(ConfirmedTransaction {
                        hash,
                        ledger: response.ledger,
                        return_value,
                        result_meta_xdr: response.result_meta_xdr,
                    }));
                },
                GetTransactionStatus::Failed => {
                    let detail = response
                        .result_xdr
                        .unwrap_or_else(|| "transaction failed".to_string());
                    warn!(%hash, %detail, "transaction failed");
                    return Ok(SubmissionOutcome::Failed { hash, detail });
                },
            }
        }

        warn!(%hash, attempts, "transaction not confirmed");
        Ok(SubmissionOutcome::TimedOut { hash, attempts })
    }
}

/// Resolves at `at`, or never.
async fn until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
