//! TTL upkeep for the shared on-chain resources every wallet depends on.
//!
//! Reads never change state. Maintenance runs only when asked for, and only
//! with a maintenance signer; without one the manager reports and stops.

use crate::advanced::instructions;
use crate::advanced::submission::SubmissionOutcome;
use crate::basic::actions::TransactionPipeline;
use crate::core::config::{LifecycleConfig, SdkConfig, TransactionConfig};
use crate::core::connection::SorobanConnection;
use crate::core::signer::LumenitosSigner;
use crate::error::{LumenitosSdkError, Result};
use crate::types::{
    ActionLogEntry, HealthStatus, MaintenanceAction, MaintenanceMode, MaintenanceReport,
    MaintenanceRequest, ResourceStatus, TtlClassification, TtlRecord, TtlReport,
};
use crate::utils;
use std::collections::BTreeMap;
use stellar_xdr::curr::{LedgerFootprint, LedgerKey, Limits, ScAddress, ScVal, VecM, WriteXdr};
use tracing::{debug, info, warn};

pub const SIMPLE_ACCOUNT_WASM: &str = "simple_account_wasm";
pub const FACTORY_WASM: &str = "factory_wasm";
pub const FACTORY_INSTANCE: &str = "factory_instance";

/// How to create a resource that cannot be restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    UploadWasm(Vec<u8>),
    CreateContract {
        deployer: ScAddress,
        salt: [u8; 32],
        wasm_hash: [u8; 32],
        constructor_args: Vec<ScVal>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    pub name: String,
    pub key: LedgerKey,
    pub install: Option<InstallPlan>,
}

impl TrackedResource {
    pub fn contract_code(name: impl Into<String>, wasm_hash: [u8; 32]) -> Self {
        Self {
            name: name.into(),
            key: utils::contract_code_key(&wasm_hash),
            install: None,
        }
    }

    pub fn contract_instance(name: impl Into<String>, contract: &ScAddress) -> Self {
        Self {
            name: name.into(),
            key: utils::contract_instance_key(contract),
            install: None,
        }
    }

    pub fn with_install(mut self, plan: InstallPlan) -> Self {
        self.install = Some(plan);
        self
    }
}

/// Ledger state of every tracked resource at one point in time.
struct Snapshot {
    current_ledger: u32,
    /// `None` when the ledger could not be read.
    records: Vec<Option<TtlRecord>>,
    error: Option<String>,
}

pub struct TtlLifecycleManager<'a, C: SorobanConnection + ?Sized> {
    connection: &'a C,
    network_passphrase: String,
    transactions: TransactionConfig,
    lifecycle: LifecycleConfig,
    resources: Vec<TrackedResource>,
}

impl<'a, C: SorobanConnection + ?Sized> TtlLifecycleManager<'a, C> {
    pub fn new(
        connection: &'a C,
        network_passphrase: impl Into<String>,
        transactions: TransactionConfig,
        lifecycle: LifecycleConfig,
        resources: Vec<TrackedResource>,
    ) -> Self {
        Self {
            connection,
            network_passphrase: network_passphrase.into(),
            transactions,
            lifecycle,
            resources,
        }
    }

    /// Track the simple-account wasm, the factory wasm and the factory
    /// instance, as far as `config.contracts` describes them.
    pub fn from_config(connection: &'a C, config: &SdkConfig) -> Result<Self> {
        let contracts = &config.contracts;
        let account_hash = contracts
            .simple_account_wasm_hash
            .as_deref()
            .map(utils::parse_hex32)
            .transpose()?;
        let factory_hash = contracts
            .factory_wasm_hash
            .as_deref()
            .map(utils::parse_hex32)
            .transpose()?;

        let mut resources = Vec::new();
        if let Some(hash) = account_hash {
            resources.push(TrackedResource::contract_code(SIMPLE_ACCOUNT_WASM, hash));
        }
        if let Some(hash) = factory_hash {
            resources.push(TrackedResource::contract_code(FACTORY_WASM, hash));
        }

        let origin = match (&contracts.factory_deployer, &contracts.factory_salt) {
            (Some(deployer), Some(salt)) => {
                Some((utils::parse_sc_address(deployer)?, utils::parse_hex32(salt)?))
            },
            _ => None,
        };
        let derived = origin
            .as_ref()
            .map(|(deployer, salt)| {
                utils::derive_contract_id(salt, deployer, &config.network_passphrase)
                    .map(|id| utils::contract_sc_address(&id))
            })
            .transpose()?;
        let configured = contracts
            .factory_address
            .as_deref()
            .map(utils::parse_sc_address)
            .transpose()?;

        let factory = match (derived, configured) {
            (Some(derived), Some(configured)) if derived != configured => {
                return Err(LumenitosSdkError::Config(format!(
                    "factory_address {} does not match the address derived from deployer and salt {}",
                    utils::sc_address_to_string(&configured)?,
                    utils::sc_address_to_string(&derived)?,
                )))
            },
            (Some(address), _) | (None, Some(address)) => Some(address),
            (None, None) => None,
        };

        if let Some(factory) = factory {
            let mut instance = TrackedResource::contract_instance(FACTORY_INSTANCE, &factory);
            if let (Some((deployer, salt)), Some(factory_hash), Some(account_hash)) =
                (origin, factory_hash, account_hash)
            {
                instance = instance.with_install(InstallPlan::CreateContract {
                    deployer,
                    salt,
                    wasm_hash: factory_hash,
                    constructor_args: vec![utils::bytes_val(&account_hash)?],
                });
            }
            resources.push(instance);
        }

        Ok(Self::new(
            connection,
            config.network_passphrase.clone(),
            config.transactions.clone(),
            config.lifecycle.clone(),
            resources,
        ))
    }

    /// Attach the wasm bytes for a tracked code resource so it can be
    /// installed. The bytes must hash to the tracked code hash.
    pub fn with_wasm(mut self, name: &str, wasm: Vec<u8>) -> Result<Self> {
        let resource = self
            .resources
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| LumenitosSdkError::Config(format!("unknown resource {name}")))?;
        let LedgerKey::ContractCode(code) = &resource.key else {
            return Err(LumenitosSdkError::Config(format!(
                "{name} is not a contract code resource"
            )));
        };
        if utils::sha256(&wasm) != code.hash.0 {
            return Err(LumenitosSdkError::Config(format!(
                "wasm for {name} does not match its configured hash"
            )));
        }
        resource.install = Some(InstallPlan::UploadWasm(wasm));
        Ok(self)
    }

    pub fn resources(&self) -> &[TrackedResource] {
        &self.resources
    }

    async fn snapshot(&self) -> Snapshot {
        match self.read_records().await {
            Ok((current_ledger, records)) => Snapshot {
                current_ledger,
                records: records.into_iter().map(Some).collect(),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "ttl query failed");
                Snapshot {
                    current_ledger: 0,
                    records: vec![None; self.resources.len()],
                    error: Some(e.to_string()),
                }
            },
        }
    }

    async fn read_records(&self) -> Result<(u32, Vec<TtlRecord>)> {
        let keys: Vec<LedgerKey> = self.resources.iter().map(|r| r.key.clone()).collect();
        let response = self
            .connection
            .get_ledger_entries(&keys)
            .await
            .map_err(|e| LumenitosSdkError::TtlQuery(e.to_string()))?;

        let current_ledger = if response.latest_ledger > 0 {
            response.latest_ledger
        } else {
            self.connection
                .get_latest_ledger()
                .await
                .map_err(|e| LumenitosSdkError::TtlQuery(e.to_string()))?
        };

        let mut records = Vec::with_capacity(keys.len());
        for (resource, key) in self.resources.iter().zip(&keys) {
            let encoded = key.to_xdr_base64(Limits::none())?;
            let live_until = response
                .entries
                .iter()
                .find(|entry| entry.key == encoded)
                .map(|entry| entry.live_until_ledger.unwrap_or(u32::MAX));
            let record = TtlRecord::new(current_ledger, live_until, self.lifecycle.bump_threshold);
            debug!(
                resource = %resource.name,
                current_ledger,
                live_until = ?live_until,
                classification = ?record.classification,
                "classified resource"
            );
            records.push(record);
        }
        Ok((current_ledger, records))
    }

    /// Fresh TTL reading for one tracked resource.
    pub async fn check(&self, name: &str) -> Result<TtlRecord> {
        let index = self
            .resources
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| LumenitosSdkError::Config(format!("unknown resource {name}")))?;
        let (_, records) = self.read_records().await?;
        Ok(records[index])
    }

    pub async fn report(&self) -> TtlReport {
        let snapshot = self.snapshot().await;
        self.build_report(&snapshot)
    }

    fn build_report(&self, snapshot: &Snapshot) -> TtlReport {
        let resources: BTreeMap<String, ResourceStatus> = self
            .resources
            .iter()
            .zip(&snapshot.records)
            .map(|(resource, record)| {
                let status = match record {
                    Some(record) => ResourceStatus::from_record(record),
                    None => ResourceStatus::unknown(),
                };
                (resource.name.clone(), status)
            })
            .collect();

        let health = if snapshot.error.is_some() {
            HealthStatus::Unhealthy
        } else if resources.values().any(ResourceStatus::needs_maintenance) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        TtlReport {
            current_ledger: snapshot.current_ledger,
            health,
            resources,
            error: snapshot.error.clone(),
        }
    }

    /// Read every resource and, with a maintenance signer, bring the ones the
    /// request allows back to Live. Nothing is changed when the read fails.
    pub async fn maintain(
        &self,
        request: MaintenanceRequest,
        signer: Option<&dyn LumenitosSigner>,
    ) -> MaintenanceReport {
        let snapshot = self.snapshot().await;
        let report = self.build_report(&snapshot);

        let Some(signer) = signer else {
            info!(health = ?report.health, "no maintenance key, report only");
            return MaintenanceReport {
                mode: MaintenanceMode::ReportOnly,
                report,
                actions: Vec::new(),
            };
        };

        let mut actions = Vec::new();
        if snapshot.error.is_some() {
            // Unknown state is never treated as missing.
            warn!(health = ?report.health, "ledger state unreadable, no maintenance performed");
            return MaintenanceReport {
                mode: MaintenanceMode::Execute,
                report,
                actions,
            };
        }

        for (resource, record) in self.resources.iter().zip(&snapshot.records) {
            let Some(record) = record else { continue };
            match record.classification {
                TtlClassification::Live => {},
                TtlClassification::NearExpiry => {
                    if request.bump {
                        actions.push(self.extend(resource, signer).await);
                    }
                },
                TtlClassification::Archived | TtlClassification::Missing => {
                    self.revive(resource, request, signer, &mut actions).await;
                },
            }
        }

        info!(
            health = ?report.health,
            actions = actions.len(),
            failed = actions.iter().filter(|a| !a.success).count(),
            "maintenance finished"
        );
        MaintenanceReport {
            mode: MaintenanceMode::Execute,
            report,
            actions,
        }
    }

    /// Restore, falling back to install when restore fails, then extend.
    async fn revive(
        &self,
        resource: &TrackedResource,
        request: MaintenanceRequest,
        signer: &dyn LumenitosSigner,
        actions: &mut Vec<ActionLogEntry>,
    ) {
        let mut live = false;
        if request.bump {
            let restore = self.restore(resource, signer).await;
            live = restore.success;
            actions.push(restore);
        }
        if !live && request.install {
            let install = self.install(resource, signer).await;
            live = install.success;
            actions.push(install);
        }
        if live {
            actions.push(self.extend(resource, signer).await);
        }
    }

    async fn extend(&self, resource: &TrackedResource, signer: &dyn LumenitosSigner) -> ActionLogEntry {
        let footprint = LedgerFootprint {
            read_only: vec![resource.key.clone()].try_into().unwrap_or_default(),
            read_write: VecM::default(),
        };
        let result = self
            .pipeline()
            .execute_footprint_operation(
                instructions::extend_ttl(self.lifecycle.max_ttl_extension),
                footprint,
                signer,
            )
            .await;
        log_action(resource, MaintenanceAction::Bump, result)
    }

    async fn restore(&self, resource: &TrackedResource, signer: &dyn LumenitosSigner) -> ActionLogEntry {
        let footprint = LedgerFootprint {
            read_only: VecM::default(),
            read_write: vec![resource.key.clone()].try_into().unwrap_or_default(),
        };
        let result = self
            .pipeline()
            .execute_footprint_operation(instructions::restore_footprint(), footprint, signer)
            .await;
        log_action(resource, MaintenanceAction::Restore, result)
    }

    async fn install(&self, resource: &TrackedResource, signer: &dyn LumenitosSigner) -> ActionLogEntry {
        let host_function = match &resource.install {
            Some(InstallPlan::UploadWasm(wasm)) => instructions::upload_wasm(wasm),
            Some(InstallPlan::CreateContract {
                deployer,
                salt,
                wasm_hash,
                constructor_args,
            }) => instructions::create_contract(deployer, *salt, *wasm_hash, constructor_args.clone()),
            None => Err(LumenitosSdkError::Config(format!(
                "no install plan for {}",
                resource.name
            ))),
        };
        let result = match host_function {
            Ok(host_function) => {
                self.pipeline()
                    .execute(host_function, signer, Some(signer))
                    .await
            },
            Err(e) => Err(e),
        };
        log_action(resource, MaintenanceAction::Install, result)
    }

    fn pipeline(&self) -> TransactionPipeline<'_, C> {
        TransactionPipeline::new(self.connection, &self.network_passphrase, &self.transactions)
    }
}

fn log_action(
    resource: &TrackedResource,
    action: MaintenanceAction,
    result: Result<SubmissionOutcome>,
) -> ActionLogEntry {
    let entry = match result {
        Ok(SubmissionOutcome::Success(confirmed)) => ActionLogEntry {
            resource: resource.name.clone(),
            action,
            success: true,
            hash: Some(confirmed.hash),
            error: None,
        },
        Ok(SubmissionOutcome::Failed { hash, detail }) => ActionLogEntry {
            resource: resource.name.clone(),
            action,
            success: false,
            hash: Some(hash),
            error: Some(detail),
        },
        Ok(SubmissionOutcome::TimedOut { hash, attempts }) => ActionLogEntry {
            resource: resource.name.clone(),
            action,
            success: false,
            hash: Some(hash),
            error: Some(format!("not confirmed after {attempts} polls; outcome unknown")),
        },
        Err(e) => ActionLogEntry {
            resource: resource.name.clone(),
            action,
            success: false,
            hash: None,
            error: Some(e.to_string()),
        },
    };

    if entry.success {
        info!(resource = %entry.resource, ?action, hash = ?entry.hash, "maintenance action succeeded");
    } else {
        warn!(resource = %entry.resource, ?action, error = ?entry.error, "maintenance action failed");
    }
    entry
}
