//! JSON-RPC transport for Stellar RPC servers.
//!
//! Implements [`SorobanConnection`] over HTTP. Every method is one independent
//! round trip; no retries are performed here.

use crate::core::connection::{
    AccountInfo, BoxError, GetEventsRequest, GetEventsResponse, GetLedgerEntriesResponse,
    GetTransactionResponse, SendTransactionResponse, SimulateTransactionResponse,
    SorobanConnection,
};
use crate::utils;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use stellar_xdr::curr::{
    LedgerEntryData, LedgerKey, LedgerKeyAccount, Limits, ReadXdr, TransactionEnvelope, WriteXdr,
};
use tracing::{debug, trace};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct LatestLedgerResult {
    sequence: u32,
}

/// HTTP JSON-RPC client for a Stellar RPC endpoint.
#[derive(Debug)]
pub struct RpcConnection {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcConnection {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, BoxError> {
        Self::with_timeout(endpoint, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, BoxError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "rpc request");

        let response: RpcEnvelope<T> = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(format!("{method} failed ({}): {}", err.code, err.message).into());
        }
        response
            .result
            .ok_or_else(|| format!("{method} returned neither result nor error").into())
    }
}

#[async_trait]
impl SorobanConnection for RpcConnection {
    async fn get_account(&self, account_id: &str) -> Result<AccountInfo, BoxError> {
        let key = LedgerKey::Account(LedgerKeyAccount {
            account_id: utils::parse_account_id(account_id)?,
        });
        let response = self.get_ledger_entries(&[key]).await?;
        let entry = response
            .entries
            .first()
            .ok_or_else(|| format!("account {account_id} not found"))?;

        match LedgerEntryData::from_xdr_base64(&entry.xdr, Limits::none())? {
            LedgerEntryData::Account(account) => Ok(AccountInfo {
                account_id: account_id.to_string(),
                sequence: account.seq_num.0,
            }),
            _ => Err(format!("ledger entry for {account_id} is not an account").into()),
        }
    }

    async fn get_latest_ledger(&self) -> Result<u32, BoxError> {
        let result: LatestLedgerResult = self.call("getLatestLedger", json!({})).await?;
        Ok(result.sequence)
    }

    async fn simulate_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SimulateTransactionResponse, BoxError> {
        let transaction = envelope.to_xdr_base64(Limits::none())?;
        self.call("simulateTransaction", json!({ "transaction": transaction }))
            .await
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SendTransactionResponse, BoxError> {
        let transaction = envelope.to_xdr_base64(Limits::none())?;
        let response: SendTransactionResponse = self
            .call("sendTransaction", json!({ "transaction": transaction }))
            .await?;
        debug!(hash = %response.hash, status = response.status.as_str(), "sendTransaction");
        Ok(response)
    }

    async fn get_transaction(&self, hash: &str) -> Result<GetTransactionResponse, BoxError> {
        self.call("getTransaction", json!({ "hash": hash })).await
    }

    async fn get_ledger_entries(
        &self,
        keys: &[LedgerKey],
    ) -> Result<GetLedgerEntriesResponse, BoxError> {
        let keys = keys
            .iter()
            .map(|k| k.to_xdr_base64(Limits::none()))
            .collect::<Result<Vec<_>, _>>()?;
        self.call("getLedgerEntries", json!({ "keys": keys })).await
    }

    async fn get_events(&self, request: &GetEventsRequest) -> Result<GetEventsResponse, BoxError> {
        let mut params = json!({
            "startLedger": request.start_ledger,
            "filters": request.filters,
        });
        if let Some(limit) = request.limit {
            params["pagination"] = json!({ "limit": limit });
        }
        self.call("getEvents", params).await
    }
}
