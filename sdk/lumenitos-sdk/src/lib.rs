pub mod advanced;
pub mod basic;
pub mod client;
pub mod core;
pub mod error;
pub mod types;
pub mod utils;

pub use crate::advanced::auth::{AuthEntry, AuthEntrySigner, AuthorizerKind};
pub use crate::advanced::submission::{ConfirmedTransaction, SubmissionOutcome};
pub use crate::basic::actions::{TransactionPipeline, TransferSource};
pub use crate::basic::lifecycle::TtlLifecycleManager;
pub use crate::basic::wallet::{Deployer, LumenitosWallet};
pub use crate::client::LumenitosClient;
pub use crate::core::config::SdkConfig;
pub use crate::core::connection::SorobanConnection;
pub use crate::core::rpc::RpcConnection;
pub use crate::core::signer::LumenitosSigner;
pub use crate::error::{LumenitosSdkError, Result};
pub use crate::types::{
    HealthStatus, MaintenanceReport, MaintenanceRequest, TtlClassification, TtlRecord, TtlReport,
};
pub use crate::utils::{derive_contract_address, native_asset_contract_address};

pub mod xdr {
    pub use stellar_xdr::curr::*;
}
