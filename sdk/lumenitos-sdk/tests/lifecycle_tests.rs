use ed25519_dalek::SigningKey;
use lumenitos_sdk::basic::lifecycle::{
    InstallPlan, TrackedResource, FACTORY_INSTANCE, FACTORY_WASM,
};
use lumenitos_sdk::core::constants::TESTNET_PASSPHRASE;
use lumenitos_sdk::types::{
    HealthStatus, MaintenanceAction, MaintenanceMode, MaintenanceRequest, TtlClassification,
};
use lumenitos_sdk::xdr::{
    ContractExecutable, ContractIdPreimage, Hash, HostFunction, OperationBody,
    TransactionEnvelope, Uint256,
};
use lumenitos_sdk::LumenitosSigner;
use lumenitos_sdk::{utils, TtlLifecycleManager};

mod common;
use common::*;

const WASM: &[u8] = b"\0asm factory bytes";

fn factory_resource() -> TrackedResource {
    TrackedResource::contract_code(FACTORY_WASM, utils::sha256(WASM))
        .with_install(InstallPlan::UploadWasm(WASM.to_vec()))
}

fn manager(connection: &MockConnection) -> TtlLifecycleManager<'_, MockConnection> {
    manager_with(connection, vec![factory_resource()])
}

fn manager_with(
    connection: &MockConnection,
    resources: Vec<TrackedResource>,
) -> TtlLifecycleManager<'_, MockConnection> {
    TtlLifecycleManager::new(
        connection,
        TESTNET_PASSPHRASE,
        fast_config(),
        lifecycle_config(),
        resources,
    )
}

fn full_request() -> MaintenanceRequest {
    MaintenanceRequest {
        bump: true,
        install: true,
    }
}

fn summary(outcome: &lumenitos_sdk::MaintenanceReport) -> Vec<(MaintenanceAction, bool)> {
    outcome
        .actions
        .iter()
        .map(|a| (a.action, a.success))
        .collect()
}

fn maintainer() -> SigningKey {
    SigningKey::from_bytes(&[21u8; 32])
}

fn operation_body(envelope: &TransactionEnvelope) -> OperationBody {
    let TransactionEnvelope::Tx(v1) = envelope else {
        panic!("expected v1 envelope");
    };
    v1.tx.operations[0].body.clone()
}

#[tokio::test]
async fn test_near_expiry_entry_needs_bump() {
    let connection = MockConnection::new();
    connection
        .set_entry(&factory_resource().key, LATEST_LEDGER + 10)
        .await;

    let manager = manager(&connection);
    let record = manager.check(FACTORY_WASM).await.unwrap();
    assert_eq!(record.classification, TtlClassification::NearExpiry);
    assert_eq!(record.remaining(), Some(10));

    let report = manager.report().await;
    assert_eq!(report.health, HealthStatus::Degraded);
    let status = &report.resources[FACTORY_WASM];
    assert!(status.installed);
    assert!(status.needs_bump);
    assert!(!status.needs_restore);
    assert_eq!(status.ttl_remaining, Some(10));
}

#[tokio::test]
async fn test_classification_boundaries() {
    let connection = MockConnection::new();
    let manager = manager(&connection);
    let key = factory_resource().key;

    connection
        .set_entry(&key, LATEST_LEDGER + lifecycle_config().bump_threshold)
        .await;
    let record = manager.check(FACTORY_WASM).await.unwrap();
    assert_eq!(record.classification, TtlClassification::Live);

    connection.set_entry(&key, LATEST_LEDGER).await;
    let record = manager.check(FACTORY_WASM).await.unwrap();
    assert_eq!(record.classification, TtlClassification::Archived);
    assert_eq!(record.remaining(), Some(0));
}

#[tokio::test]
async fn test_missing_entry_restore_fails_then_installs_and_bumps() {
    let connection = MockConnection::new();
    // restore is refused, upload lands, extension lands
    connection
        .push_simulation(simulation_error("entry is not archived"))
        .await;
    connection.push_simulation(simulation_ok(vec![], None)).await;
    connection.push_confirmed("upload-hash").await;
    connection.push_simulation(simulation_ok(vec![], None)).await;
    connection.push_confirmed("bump-hash").await;

    let signer = maintainer();
    let outcome = manager(&connection)
        .maintain(
            MaintenanceRequest {
                bump: true,
                install: true,
            },
            Some(&signer),
        )
        .await;

    assert_eq!(outcome.mode, MaintenanceMode::Execute);
    let status = &outcome.report.resources[FACTORY_WASM];
    assert!(!status.installed);
    assert!(status.needs_restore);

    let summary: Vec<(MaintenanceAction, bool)> = outcome
        .actions
        .iter()
        .map(|a| (a.action, a.success))
        .collect();
    assert_eq!(
        summary,
        vec![
            (MaintenanceAction::Restore, false),
            (MaintenanceAction::Install, true),
            (MaintenanceAction::Bump, true),
        ]
    );
    assert!(outcome.actions[0]
        .error
        .as_deref()
        .unwrap()
        .contains("entry is not archived"));
    assert_eq!(outcome.actions[1].hash.as_deref(), Some("upload-hash"));
    assert_eq!(outcome.actions[2].hash.as_deref(), Some("bump-hash"));

    let sent = connection.sent.lock().await;
    assert_eq!(sent.len(), 2);
    match operation_body(&sent[0]) {
        OperationBody::InvokeHostFunction(op) => match op.host_function {
            HostFunction::UploadContractWasm(bytes) => assert_eq!(bytes.as_slice(), WASM),
            other => panic!("expected wasm upload, got {other:?}"),
        },
        other => panic!("expected host function, got {other:?}"),
    }
    match operation_body(&sent[1]) {
        OperationBody::ExtendFootprintTtl(op) => {
            assert_eq!(op.extend_to, lifecycle_config().max_ttl_extension)
        },
        other => panic!("expected ttl extension, got {other:?}"),
    }
}

#[tokio::test]
async fn test_live_entry_is_left_alone() {
    let connection = MockConnection::new();
    connection
        .set_entry(&factory_resource().key, LATEST_LEDGER + 1_000_000)
        .await;

    let signer = maintainer();
    let manager = manager(&connection);
    let request = MaintenanceRequest {
        bump: true,
        install: true,
    };
    for _ in 0..2 {
        let outcome = manager.maintain(request, Some(&signer)).await;
        assert_eq!(outcome.report.health, HealthStatus::Healthy);
        assert!(outcome.actions.is_empty());
    }
    assert_eq!(connection.call_count("simulate_transaction").await, 0);
    assert_eq!(connection.call_count("send_transaction").await, 0);
}

#[tokio::test]
async fn test_near_expiry_without_bump_permission_is_untouched() {
    let connection = MockConnection::new();
    connection
        .set_entry(&factory_resource().key, LATEST_LEDGER + 10)
        .await;

    let signer = maintainer();
    let outcome = manager(&connection)
        .maintain(MaintenanceRequest::default(), Some(&signer))
        .await;
    assert!(outcome.actions.is_empty());
    assert_eq!(connection.call_count("send_transaction").await, 0);
}

#[tokio::test]
async fn test_without_signer_only_reports() {
    let connection = MockConnection::new();

    let outcome = manager(&connection)
        .maintain(
            MaintenanceRequest {
                bump: true,
                install: true,
            },
            None,
        )
        .await;

    assert_eq!(outcome.mode, MaintenanceMode::ReportOnly);
    assert_eq!(outcome.report.health, HealthStatus::Degraded);
    assert!(outcome.actions.is_empty());
    assert_eq!(connection.call_count("simulate_transaction").await, 0);
}

#[tokio::test]
async fn test_unreadable_ledger_is_unhealthy() {
    let connection = MockConnection::new();
    *connection.fail_ledger_reads.lock().await = true;

    let manager = manager(&connection);
    let report = manager.report().await;
    assert_eq!(report.health, HealthStatus::Unhealthy);
    assert!(report.error.as_deref().unwrap().contains("ledger unavailable"));
    assert!(report.resources[FACTORY_WASM].needs_restore);

    assert!(manager.check(FACTORY_WASM).await.is_err());
}

#[tokio::test]
async fn test_unreadable_ledger_performs_no_maintenance() {
    let connection = MockConnection::new();
    connection
        .set_entry(&factory_resource().key, LATEST_LEDGER + 1_000_000)
        .await;
    *connection.fail_ledger_reads.lock().await = true;

    let signer = maintainer();
    let outcome = manager(&connection)
        .maintain(full_request(), Some(&signer))
        .await;

    assert_eq!(outcome.report.health, HealthStatus::Unhealthy);
    assert!(outcome.actions.is_empty());
    assert_eq!(connection.call_count("simulate_transaction").await, 0);
    assert_eq!(connection.call_count("send_transaction").await, 0);
}

#[tokio::test]
async fn test_near_expiry_entry_is_extended() {
    let connection = MockConnection::new();
    connection
        .set_entry(&factory_resource().key, LATEST_LEDGER + 10)
        .await;
    connection.push_simulation(simulation_ok(vec![], None)).await;
    connection.push_confirmed("bump-hash").await;

    let signer = maintainer();
    let outcome = manager(&connection)
        .maintain(
            MaintenanceRequest {
                bump: true,
                install: false,
            },
            Some(&signer),
        )
        .await;

    assert_eq!(summary(&outcome), vec![(MaintenanceAction::Bump, true)]);
    assert_eq!(outcome.actions[0].hash.as_deref(), Some("bump-hash"));

    let sent = connection.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        operation_body(&sent[0]),
        OperationBody::ExtendFootprintTtl(_)
    ));
}

#[tokio::test]
async fn test_archived_entry_is_restored_then_extended() {
    let connection = MockConnection::new();
    connection
        .set_entry(&factory_resource().key, LATEST_LEDGER)
        .await;
    connection.push_simulation(simulation_ok(vec![], None)).await;
    connection.push_confirmed("restore-hash").await;
    connection.push_simulation(simulation_ok(vec![], None)).await;
    connection.push_confirmed("bump-hash").await;

    let signer = maintainer();
    let outcome = manager(&connection)
        .maintain(
            MaintenanceRequest {
                bump: true,
                install: false,
            },
            Some(&signer),
        )
        .await;

    assert!(outcome.report.resources[FACTORY_WASM].archived);
    assert_eq!(
        summary(&outcome),
        vec![
            (MaintenanceAction::Restore, true),
            (MaintenanceAction::Bump, true),
        ]
    );

    let sent = connection.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert!(matches!(
        operation_body(&sent[0]),
        OperationBody::RestoreFootprint(_)
    ));
    assert!(matches!(
        operation_body(&sent[1]),
        OperationBody::ExtendFootprintTtl(_)
    ));
}

#[tokio::test]
async fn test_missing_instance_is_created_from_plan() {
    let signer = maintainer();
    let deployer = utils::account_sc_address(&LumenitosSigner::public_key(&signer));
    let salt = [4u8; 32];
    let wasm_hash = utils::sha256(WASM);
    let account_hash = [6u8; 32];
    let factory = utils::contract_sc_address(
        &utils::derive_contract_id(&salt, &deployer, TESTNET_PASSPHRASE).unwrap(),
    );
    let instance = TrackedResource::contract_instance(FACTORY_INSTANCE, &factory).with_install(
        InstallPlan::CreateContract {
            deployer: deployer.clone(),
            salt,
            wasm_hash,
            constructor_args: vec![utils::bytes_val(&account_hash).unwrap()],
        },
    );

    let connection = MockConnection::new();
    connection.push_simulation(simulation_ok(vec![], None)).await;
    connection.push_confirmed("create-hash").await;
    connection.push_simulation(simulation_ok(vec![], None)).await;
    connection.push_confirmed("bump-hash").await;

    let outcome = manager_with(&connection, vec![instance])
        .maintain(
            MaintenanceRequest {
                bump: false,
                install: true,
            },
            Some(&signer),
        )
        .await;

    assert_eq!(
        summary(&outcome),
        vec![
            (MaintenanceAction::Install, true),
            (MaintenanceAction::Bump, true),
        ]
    );

    let sent = connection.sent.lock().await;
    let OperationBody::InvokeHostFunction(op) = operation_body(&sent[0]) else {
        panic!("expected host function");
    };
    let HostFunction::CreateContractV2(args) = op.host_function else {
        panic!("expected contract creation");
    };
    let ContractIdPreimage::Address(preimage) = args.contract_id_preimage else {
        panic!("expected address preimage");
    };
    assert_eq!(preimage.address, deployer);
    assert_eq!(preimage.salt, Uint256(salt));
    assert_eq!(args.executable, ContractExecutable::Wasm(Hash(wasm_hash)));
    assert_eq!(
        args.constructor_args.to_vec(),
        vec![utils::bytes_val(&account_hash).unwrap()]
    );
    assert!(matches!(
        operation_body(&sent[1]),
        OperationBody::ExtendFootprintTtl(_)
    ));
}
