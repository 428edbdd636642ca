use crate::error::Result;
use crate::utils;
use stellar_xdr::curr::{
    ContractExecutable, ContractIdPreimage, ContractIdPreimageFromAddress, CreateContractArgsV2,
    ExtendFootprintTtlOp, ExtensionPoint, Hash, HostFunction, InvokeContractArgs,
    InvokeHostFunctionOp, Memo, MuxedAccount, Operation, OperationBody, Preconditions,
    RestoreFootprintOp, ScAddress, ScVal, SequenceNumber, SorobanAuthorizationEntry, TimeBounds,
    TimePoint, Transaction, TransactionExt, Uint256, VecM,
};

pub fn invoke_contract(
    contract: &ScAddress,
    function_name: &str,
    args: Vec<ScVal>,
) -> Result<HostFunction> {
    Ok(HostFunction::InvokeContract(InvokeContractArgs {
        contract_address: contract.clone(),
        function_name: utils::symbol(function_name)?,
        args: args.try_into()?,
    }))
}

pub fn upload_wasm(wasm: &[u8]) -> Result<HostFunction> {
    Ok(HostFunction::UploadContractWasm(wasm.to_vec().try_into()?))
}

/// Deploy an instance of `wasm_hash` from `deployer` with `salt`.
pub fn create_contract(
    deployer: &ScAddress,
    salt: [u8; 32],
    wasm_hash: [u8; 32],
    constructor_args: Vec<ScVal>,
) -> Result<HostFunction> {
    Ok(HostFunction::CreateContractV2(CreateContractArgsV2 {
        contract_id_preimage: ContractIdPreimage::Address(ContractIdPreimageFromAddress {
            address: deployer.clone(),
            salt: Uint256(salt),
        }),
        executable: ContractExecutable::Wasm(Hash(wasm_hash)),
        constructor_args: constructor_args.try_into()?,
    }))
}

pub fn invoke_host_function(
    host_function: HostFunction,
    auth: Vec<SorobanAuthorizationEntry>,
) -> Result<Operation> {
    Ok(Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function,
            auth: auth.try_into()?,
        }),
    })
}

/// Extend every footprint entry of the enclosing transaction to `extend_to`
/// ledgers from now.
pub fn extend_ttl(extend_to: u32) -> Operation {
    Operation {
        source_account: None,
        body: OperationBody::ExtendFootprintTtl(ExtendFootprintTtlOp {
            ext: ExtensionPoint::V0,
            extend_to,
        }),
    }
}

/// Restore every archived read-write footprint entry of the enclosing
/// transaction.
pub fn restore_footprint() -> Operation {
    Operation {
        source_account: None,
        body: OperationBody::RestoreFootprint(RestoreFootprintOp {
            ext: ExtensionPoint::V0,
        }),
    }
}

/// Unsigned single-operation transaction. `sequence` is the source account's
/// current sequence; the transaction uses the next one.
pub fn build_transaction(
    source: &[u8; 32],
    sequence: i64,
    fee: u32,
    timeout_secs: u64,
    operation: Operation,
) -> Result<Transaction> {
    let max_time = if timeout_secs == 0 {
        0
    } else {
        unix_now().saturating_add(timeout_secs)
    };

    Ok(Transaction {
        source_account: MuxedAccount::Ed25519(Uint256(*source)),
        fee,
        seq_num: SequenceNumber(sequence + 1),
        cond: Preconditions::Time(TimeBounds {
            min_time: TimePoint(0),
            max_time: TimePoint(max_time),
        }),
        memo: Memo::None,
        operations: vec![operation].try_into()?,
        ext: TransactionExt::V0,
    })
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_transaction_uses_next_sequence() {
        let op = extend_ttl(1_000);
        let tx = build_transaction(&[1u8; 32], 41, 100, 30, op).unwrap();
        assert_eq!(tx.seq_num, SequenceNumber(42));
        assert_eq!(tx.fee, 100);
        assert_eq!(tx.operations.len(), 1);
        match tx.cond {
            Preconditions::Time(bounds) => assert!(bounds.max_time.0 > 0),
            other => panic!("unexpected preconditions {other:?}"),
        }
    }

    #[test]
    fn test_create_contract_preimage() {
        let deployer = utils::contract_sc_address(&[2u8; 32]);
        let hf = create_contract(&deployer, [3u8; 32], [4u8; 32], vec![]).unwrap();
        match hf {
            HostFunction::CreateContractV2(args) => {
                assert_eq!(
                    args.executable,
                    ContractExecutable::Wasm(Hash([4u8; 32]))
                );
                match args.contract_id_preimage {
                    ContractIdPreimage::Address(from) => {
                        assert_eq!(from.address, deployer);
                        assert_eq!(from.salt, Uint256([3u8; 32]));
                    },
                    other => panic!("unexpected preimage {other:?}"),
                }
            },
            other => panic!("unexpected host function {other:?}"),
        }
    }

    #[test]
    fn test_invoke_contract_rejects_long_symbol() {
        let contract = utils::contract_sc_address(&[2u8; 32]);
        let name = "x".repeat(40);
        assert!(invoke_contract(&contract, &name, vec![]).is_err());
    }
}
