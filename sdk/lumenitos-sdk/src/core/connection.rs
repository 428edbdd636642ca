use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use stellar_xdr::curr::{LedgerKey, TransactionEnvelope};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Ledger RPC transport consumed by every SDK operation.
///
/// Injected explicitly; the SDK never holds a global client. Tests substitute
/// a scripted implementation.
#[async_trait]
pub trait SorobanConnection: Send + Sync {
    /// Classic account sequence state for `account_id` (`G...`).
    async fn get_account(&self, account_id: &str) -> Result<AccountInfo, BoxError>;

    async fn get_latest_ledger(&self) -> Result<u32, BoxError>;

    async fn simulate_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SimulateTransactionResponse, BoxError>;

    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SendTransactionResponse, BoxError>;

    async fn get_transaction(&self, hash: &str) -> Result<GetTransactionResponse, BoxError>;

    async fn get_ledger_entries(
        &self,
        keys: &[LedgerKey],
    ) -> Result<GetLedgerEntriesResponse, BoxError>;

    async fn get_events(&self, request: &GetEventsRequest) -> Result<GetEventsResponse, BoxError>;
}

/// Account id and current sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    pub sequence: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateTransactionResponse {
    #[serde(default)]
    pub error: Option<String>,
    /// Base64 `SorobanTransactionData`.
    #[serde(default)]
    pub transaction_data: Option<String>,
    #[serde(default)]
    pub min_resource_fee: Option<String>,
    #[serde(default)]
    pub results: Vec<SimulateHostFunctionResult>,
    #[serde(default)]
    pub restore_preamble: Option<RestorePreamble>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateHostFunctionResult {
    /// Base64 `SorobanAuthorizationEntry` values.
    #[serde(default)]
    pub auth: Vec<String>,
    /// Base64 `ScVal` return value.
    #[serde(default)]
    pub xdr: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorePreamble {
    pub transaction_data: String,
    pub min_resource_fee: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendTransactionStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
    /// Returned by transports that confirm synchronously.
    Success,
}

impl SendTransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Duplicate => "DUPLICATE",
            Self::TryAgainLater => "TRY_AGAIN_LATER",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionResponse {
    pub status: SendTransactionStatus,
    pub hash: String,
    #[serde(default)]
    pub latest_ledger: u32,
    /// Base64 `TransactionResult` explaining an `ERROR` status.
    #[serde(default)]
    pub error_result_xdr: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GetTransactionStatus {
    Success,
    Failed,
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionResponse {
    pub status: GetTransactionStatus,
    #[serde(default)]
    pub latest_ledger: u32,
    #[serde(default)]
    pub ledger: Option<u32>,
    #[serde(default)]
    pub result_xdr: Option<String>,
    #[serde(default)]
    pub result_meta_xdr: Option<String>,
    /// Base64 `ScVal`, when the transport extracts it.
    #[serde(default)]
    pub return_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResult {
    /// Base64 `LedgerKey`.
    pub key: String,
    /// Base64 `LedgerEntryData`.
    pub xdr: String,
    #[serde(default, rename = "lastModifiedLedgerSeq")]
    pub last_modified_ledger: u32,
    #[serde(default, rename = "liveUntilLedgerSeq")]
    pub live_until_ledger: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLedgerEntriesResponse {
    #[serde(default)]
    pub entries: Vec<LedgerEntryResult>,
    #[serde(default)]
    pub latest_ledger: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contract_ids: Vec<String>,
    /// Base64 `ScVal` topic segments; `"*"` matches any segment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEventsRequest {
    pub start_ledger: u32,
    pub filters: Vec<EventFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    #[serde(rename = "type")]
    pub event_type: String,
    pub ledger: u32,
    pub contract_id: String,
    pub id: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    /// Base64 `ScVal` topics.
    pub topic: Vec<String>,
    /// Base64 `ScVal` value.
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEventsResponse {
    #[serde(default)]
    pub events: Vec<EventInfo>,
    #[serde(default)]
    pub latest_ledger: u32,
}
