#![allow(dead_code)]

use async_trait::async_trait;
use lumenitos_sdk::core::config::{LifecycleConfig, TransactionConfig};
use lumenitos_sdk::core::connection::{
    AccountInfo, BoxError, GetEventsRequest, GetEventsResponse, GetLedgerEntriesResponse,
    GetTransactionResponse, GetTransactionStatus, LedgerEntryResult, SendTransactionResponse,
    SendTransactionStatus, SimulateHostFunctionResult, SimulateTransactionResponse,
    SorobanConnection,
};
use lumenitos_sdk::utils;
use lumenitos_sdk::xdr::{
    InvokeContractArgs, LedgerFootprint, LedgerKey, Limits, OperationBody, ScAddress, ScVal,
    SorobanAddressCredentials, SorobanAuthorizationEntry, SorobanAuthorizedFunction,
    SorobanAuthorizedInvocation, SorobanCredentials, SorobanResources, SorobanTransactionData,
    SorobanTransactionDataExt, TransactionEnvelope, VecM, WriteXdr,
};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

pub const LATEST_LEDGER: u32 = 1_000;
pub const SIMULATED_INSTRUCTIONS: u32 = 2_000_000;
pub const MIN_RESOURCE_FEE: i64 = 50_000;

/// Scripted transport. Responses are queued per method and consumed in
/// order; every call is recorded.
#[derive(Default)]
pub struct MockConnection {
    pub latest_ledger: Mutex<u32>,
    pub simulations: Mutex<VecDeque<SimulateTransactionResponse>>,
    pub sends: Mutex<VecDeque<SendTransactionResponse>>,
    pub polls: Mutex<VecDeque<Result<GetTransactionResponse, String>>>,
    /// Base64 ledger key to live-until ledger.
    pub entries: Mutex<HashMap<String, u32>>,
    pub fail_ledger_reads: Mutex<bool>,
    pub events: Mutex<GetEventsResponse>,
    pub simulated: Mutex<Vec<TransactionEnvelope>>,
    pub sent: Mutex<Vec<TransactionEnvelope>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            latest_ledger: Mutex::new(LATEST_LEDGER),
            ..Self::default()
        }
    }

    pub async fn push_simulation(&self, response: SimulateTransactionResponse) {
        self.simulations.lock().await.push_back(response);
    }

    pub async fn push_send(&self, status: SendTransactionStatus, hash: &str) {
        self.sends.lock().await.push_back(SendTransactionResponse {
            status,
            hash: hash.to_string(),
            latest_ledger: LATEST_LEDGER,
            error_result_xdr: None,
        });
    }

    pub async fn push_poll(&self, status: GetTransactionStatus) {
        self.polls.lock().await.push_back(Ok(poll_response(status, None)));
    }

    pub async fn push_poll_response(&self, response: GetTransactionResponse) {
        self.polls.lock().await.push_back(Ok(response));
    }

    pub async fn push_poll_error(&self, message: &str) {
        self.polls.lock().await.push_back(Err(message.to_string()));
    }

    /// Queue a pending submission that confirms on the first poll.
    pub async fn push_confirmed(&self, hash: &str) {
        self.push_send(SendTransactionStatus::Pending, hash).await;
        self.push_poll(GetTransactionStatus::Success).await;
    }

    pub async fn set_entry(&self, key: &LedgerKey, live_until: u32) {
        let encoded = key.to_xdr_base64(Limits::none()).unwrap();
        self.entries.lock().await.insert(encoded, live_until);
    }

    pub async fn call_count(&self, method: &str) -> usize {
        self.calls.lock().await.iter().filter(|c| **c == method).count()
    }

    async fn record(&self, method: &'static str) {
        self.calls.lock().await.push(method);
    }
}

#[async_trait]
impl SorobanConnection for MockConnection {
    async fn get_account(&self, account_id: &str) -> Result<AccountInfo, BoxError> {
        self.record("get_account").await;
        Ok(AccountInfo {
            account_id: account_id.to_string(),
            sequence: 100,
        })
    }

    async fn get_latest_ledger(&self) -> Result<u32, BoxError> {
        self.record("get_latest_ledger").await;
        Ok(*self.latest_ledger.lock().await)
    }

    async fn simulate_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SimulateTransactionResponse, BoxError> {
        self.record("simulate_transaction").await;
        self.simulated.lock().await.push(envelope.clone());
        self.simulations
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| "no scripted simulation".into())
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SendTransactionResponse, BoxError> {
        self.record("send_transaction").await;
        self.sent.lock().await.push(envelope.clone());
        self.sends
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| "no scripted send".into())
    }

    async fn get_transaction(&self, _hash: &str) -> Result<GetTransactionResponse, BoxError> {
        self.record("get_transaction").await;
        match self.polls.lock().await.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(message.into()),
            None => Ok(poll_response(GetTransactionStatus::NotFound, None)),
        }
    }

    async fn get_ledger_entries(
        &self,
        keys: &[LedgerKey],
    ) -> Result<GetLedgerEntriesResponse, BoxError> {
        self.record("get_ledger_entries").await;
        if *self.fail_ledger_reads.lock().await {
            return Err("ledger unavailable".into());
        }
        let stored = self.entries.lock().await;
        let mut entries = Vec::new();
        for key in keys {
            let encoded = key.to_xdr_base64(Limits::none())?;
            if let Some(live_until) = stored.get(&encoded) {
                entries.push(LedgerEntryResult {
                    key: encoded,
                    xdr: String::new(),
                    last_modified_ledger: 1,
                    live_until_ledger: Some(*live_until),
                });
            }
        }
        Ok(GetLedgerEntriesResponse {
            entries,
            latest_ledger: *self.latest_ledger.lock().await,
        })
    }

    async fn get_events(&self, _request: &GetEventsRequest) -> Result<GetEventsResponse, BoxError> {
        self.record("get_events").await;
        Ok(self.events.lock().await.clone())
    }
}

//=============================================================================
// Fixtures
//=============================================================================

pub fn fast_config() -> TransactionConfig {
    TransactionConfig {
        poll_interval_ms: 1,
        max_poll_attempts: 5,
        ..TransactionConfig::default()
    }
}

pub fn lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        bump_threshold: 50_000,
        max_ttl_extension: 3_110_399,
    }
}

pub fn poll_response(
    status: GetTransactionStatus,
    return_value: Option<&ScVal>,
) -> GetTransactionResponse {
    GetTransactionResponse {
        status,
        latest_ledger: LATEST_LEDGER,
        ledger: Some(LATEST_LEDGER + 1),
        result_xdr: None,
        result_meta_xdr: None,
        return_value: return_value.map(|v| v.to_xdr_base64(Limits::none()).unwrap()),
    }
}

pub fn transaction_data() -> SorobanTransactionData {
    SorobanTransactionData {
        ext: SorobanTransactionDataExt::V0,
        resources: SorobanResources {
            footprint: LedgerFootprint {
                read_only: VecM::default(),
                read_write: VecM::default(),
            },
            instructions: SIMULATED_INSTRUCTIONS,
            disk_read_bytes: 0,
            write_bytes: 0,
        },
        resource_fee: MIN_RESOURCE_FEE,
    }
}

pub fn simulation_ok(
    auth: Vec<SorobanAuthorizationEntry>,
    result: Option<ScVal>,
) -> SimulateTransactionResponse {
    SimulateTransactionResponse {
        transaction_data: Some(transaction_data().to_xdr_base64(Limits::none()).unwrap()),
        min_resource_fee: Some(MIN_RESOURCE_FEE.to_string()),
        results: vec![SimulateHostFunctionResult {
            auth: auth
                .iter()
                .map(|e| e.to_xdr_base64(Limits::none()).unwrap())
                .collect(),
            xdr: result.map(|v| v.to_xdr_base64(Limits::none()).unwrap()),
        }],
        latest_ledger: LATEST_LEDGER,
        ..SimulateTransactionResponse::default()
    }
}

pub fn simulation_error(message: &str) -> SimulateTransactionResponse {
    SimulateTransactionResponse {
        error: Some(message.to_string()),
        latest_ledger: LATEST_LEDGER,
        ..SimulateTransactionResponse::default()
    }
}

pub fn transfer_invocation(
    token: &ScAddress,
    from: &ScAddress,
    to: &ScAddress,
    amount: i128,
) -> SorobanAuthorizedInvocation {
    SorobanAuthorizedInvocation {
        function: SorobanAuthorizedFunction::ContractFn(InvokeContractArgs {
            contract_address: token.clone(),
            function_name: utils::symbol("transfer").unwrap(),
            args: vec![
                ScVal::Address(from.clone()),
                ScVal::Address(to.clone()),
                utils::i128_val(amount),
            ]
            .try_into()
            .unwrap(),
        }),
        sub_invocations: VecM::default(),
    }
}

/// Entry as simulation returns it: placeholder expiration, no signature.
pub fn unsigned_entry(
    address: ScAddress,
    nonce: i64,
    invocation: SorobanAuthorizedInvocation,
) -> SorobanAuthorizationEntry {
    SorobanAuthorizationEntry {
        credentials: SorobanCredentials::Address(SorobanAddressCredentials {
            address,
            nonce,
            signature_expiration_ledger: 0,
            signature: ScVal::Void,
        }),
        root_invocation: invocation,
    }
}

/// Auth entries attached to the envelope's only operation.
pub fn envelope_auth(envelope: &TransactionEnvelope) -> Vec<SorobanAuthorizationEntry> {
    let TransactionEnvelope::Tx(v1) = envelope else {
        panic!("expected v1 envelope");
    };
    match &v1.tx.operations[0].body {
        OperationBody::InvokeHostFunction(op) => op.auth.to_vec(),
        other => panic!("expected invoke host function, got {other:?}"),
    }
}
