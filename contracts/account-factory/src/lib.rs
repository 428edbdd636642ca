//! Lumenitos Account Factory
//!
//! Deploys simple-account instances at addresses derived from the factory
//! address and the owner's ed25519 public key (used as salt).
#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, panic_with_error, symbol_short, Address, BytesN, Env,
    Symbol,
};

const WASM_HASH: Symbol = symbol_short!("wasm");

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum FactoryError {
    WasmHashNotSet = 1,
}

#[contract]
pub struct AccountFactory;

#[contractimpl]
impl AccountFactory {
    /// Records the simple-account wasm hash used for every deployment.
    pub fn __constructor(env: Env, wasm_hash: BytesN<32>) {
        env.storage().instance().set(&WASM_HASH, &wasm_hash);
    }

    /// Deploys a simple account owned by `owner_bytes` and returns its address.
    ///
    /// Requires no authorization: the address is fixed by (factory, owner key)
    /// and only the owner's private key can authorize the deployed account, so
    /// anyone may pay for the deployment. Panics if the account already exists.
    pub fn create(env: Env, owner_bytes: BytesN<32>) -> Address {
        let wasm_hash = load_wasm_hash(&env);
        env.deployer()
            .with_current_contract(owner_bytes.clone())
            .deploy_v2(wasm_hash, (owner_bytes,))
    }

    pub fn wasm_hash(env: Env) -> BytesN<32> {
        load_wasm_hash(&env)
    }

    /// Address `create` would deploy to for this key, without deploying.
    pub fn get_address(env: Env, owner_bytes: BytesN<32>) -> Address {
        env.deployer()
            .with_current_contract(owner_bytes)
            .deployed_address()
    }
}

fn load_wasm_hash(env: &Env) -> BytesN<32> {
    env.storage()
        .instance()
        .get(&WASM_HASH)
        .unwrap_or_else(|| panic_with_error!(env, FactoryError::WasmHashNotSet))
}
