use crate::error::{LumenitosSdkError, Result};
use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use stellar_strkey::Strkey;
use stellar_xdr::curr::{
    AccountId, Asset, ContractDataDurability, ContractId, ContractIdPreimage,
    ContractIdPreimageFromAddress, Hash, HashIdPreimage, HashIdPreimageContractId, Int128Parts,
    LedgerKey, LedgerKeyContractCode, LedgerKeyContractData, Limits, PublicKey, ScAddress,
    ScBytes, ScSymbol, ScVal, Uint256, WriteXdr,
};

//=============================================================================
// Hashing
//=============================================================================

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Network id: SHA-256 of the network passphrase.
pub fn network_id(passphrase: &str) -> [u8; 32] {
    sha256(passphrase.as_bytes())
}

//=============================================================================
// Contract Address Derivation
//=============================================================================

/// Check that `bytes` is a 32-byte ed25519 public key on the curve.
pub fn validate_owner_key(bytes: &[u8]) -> Result<[u8; 32]> {
    let key: [u8; 32] = bytes.try_into().map_err(|_| {
        LumenitosSdkError::AddressDerivation(format!(
            "owner key must be 32 bytes, got {}",
            bytes.len()
        ))
    })?;
    VerifyingKey::from_bytes(&key).map_err(|_| {
        LumenitosSdkError::AddressDerivation("owner key is not a valid ed25519 point".into())
    })?;
    Ok(key)
}

/// Contract id for an arbitrary preimage on the given network.
pub fn contract_id_from_preimage(
    network_id: &[u8; 32],
    preimage: ContractIdPreimage,
) -> Result<[u8; 32]> {
    let hash_preimage = HashIdPreimage::ContractId(HashIdPreimageContractId {
        network_id: Hash(*network_id),
        contract_id_preimage: preimage,
    });
    Ok(sha256(&hash_preimage.to_xdr(Limits::none())?))
}

/// Raw contract id deployed by `deployer` with `salt`.
pub fn derive_contract_id(
    salt: &[u8; 32],
    deployer: &ScAddress,
    network_passphrase: &str,
) -> Result<[u8; 32]> {
    let preimage = ContractIdPreimage::Address(ContractIdPreimageFromAddress {
        address: deployer.clone(),
        salt: Uint256(*salt),
    });
    contract_id_from_preimage(&network_id(network_passphrase), preimage)
}

/// Deterministic programmable-account address for an owner key.
///
/// The raw owner key is the salt; `deployer` is either the owner's own account
/// or the shared factory contract.
pub fn derive_contract_address(
    owner_public_key: &[u8],
    deployer: &ScAddress,
    network_passphrase: &str,
) -> Result<String> {
    let salt = validate_owner_key(owner_public_key)?;
    let id = derive_contract_id(&salt, deployer, network_passphrase)?;
    Ok(encode_contract_address(&id))
}

/// Stellar Asset Contract address of the native asset.
pub fn native_asset_contract_address(network_passphrase: &str) -> Result<String> {
    let id = contract_id_from_preimage(
        &network_id(network_passphrase),
        ContractIdPreimage::Asset(Asset::Native),
    )?;
    Ok(encode_contract_address(&id))
}

//=============================================================================
// Address Encoding
//=============================================================================

pub fn encode_contract_address(id: &[u8; 32]) -> String {
    stellar_strkey::Contract(*id).to_string()
}

pub fn encode_account_address(public_key: &[u8; 32]) -> String {
    stellar_strkey::ed25519::PublicKey(*public_key).to_string()
}

pub fn account_id_from_key(public_key: &[u8; 32]) -> AccountId {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(*public_key)))
}

pub fn account_sc_address(public_key: &[u8; 32]) -> ScAddress {
    ScAddress::Account(account_id_from_key(public_key))
}

pub fn contract_sc_address(id: &[u8; 32]) -> ScAddress {
    ScAddress::Contract(ContractId(Hash(*id)))
}

pub fn parse_account_id(address: &str) -> Result<AccountId> {
    match Strkey::from_string(address) {
        Ok(Strkey::PublicKeyEd25519(pk)) => Ok(account_id_from_key(&pk.0)),
        _ => Err(LumenitosSdkError::InvalidAddress(format!(
            "{address} is not an account address"
        ))),
    }
}

/// Parse a `G...` account or `C...` contract strkey.
pub fn parse_sc_address(address: &str) -> Result<ScAddress> {
    match Strkey::from_string(address) {
        Ok(Strkey::PublicKeyEd25519(pk)) => Ok(account_sc_address(&pk.0)),
        Ok(Strkey::Contract(c)) => Ok(contract_sc_address(&c.0)),
        _ => Err(LumenitosSdkError::InvalidAddress(address.to_string())),
    }
}

pub fn sc_address_to_string(address: &ScAddress) -> Result<String> {
    match address {
        ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(pk)))) => {
            Ok(encode_account_address(pk))
        },
        ScAddress::Contract(ContractId(Hash(id))) => Ok(encode_contract_address(id)),
        other => Err(LumenitosSdkError::InvalidAddress(format!(
            "unsupported address kind: {other:?}"
        ))),
    }
}

pub fn parse_hex32(value: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value)
        .map_err(|e| LumenitosSdkError::Config(format!("invalid hex {value}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| LumenitosSdkError::Config(format!("{value} is not 32 bytes")))
}

//=============================================================================
// Ledger Keys
//=============================================================================

pub fn contract_code_key(wasm_hash: &[u8; 32]) -> LedgerKey {
    LedgerKey::ContractCode(LedgerKeyContractCode {
        hash: Hash(*wasm_hash),
    })
}

pub fn contract_instance_key(contract: &ScAddress) -> LedgerKey {
    LedgerKey::ContractData(LedgerKeyContractData {
        contract: contract.clone(),
        key: ScVal::LedgerKeyContractInstance,
        durability: ContractDataDurability::Persistent,
    })
}

//=============================================================================
// ScVal Helpers
//=============================================================================

pub fn symbol(name: &str) -> Result<ScSymbol> {
    Ok(ScSymbol(name.try_into()?))
}

pub fn bytes_val(bytes: &[u8]) -> Result<ScVal> {
    Ok(ScVal::Bytes(ScBytes(bytes.to_vec().try_into()?)))
}

pub fn i128_val(value: i128) -> ScVal {
    ScVal::I128(Int128Parts {
        hi: (value >> 64) as i64,
        lo: value as u64,
    })
}

pub fn i128_from_parts(parts: &Int128Parts) -> i128 {
    ((parts.hi as i128) << 64) | parts.lo as i128
}
