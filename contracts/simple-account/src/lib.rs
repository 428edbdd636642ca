//! Lumenitos Simple Account
//!
//! Programmable account owned by a single ed25519 public key. The same key
//! controls the owner's classic account, so one keypair drives both.
#![no_std]

use soroban_sdk::{
    auth::Context, contract, contracterror, contractimpl, contracttype, panic_with_error, BytesN,
    Env, Vec,
};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum AccountError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
}

#[derive(Clone)]
#[contracttype]
pub enum DataKey {
    Owner,
}

#[contract]
pub struct SimpleAccount;

#[contractimpl]
impl SimpleAccount {
    /// Stores the owner key. Runs once, at deployment.
    pub fn __constructor(env: Env, public_key: BytesN<32>) {
        if env.storage().instance().has(&DataKey::Owner) {
            panic_with_error!(&env, AccountError::AlreadyInitialized);
        }
        env.storage().instance().set(&DataKey::Owner, &public_key);
    }

    /// Returns the ed25519 public key that owns this account.
    pub fn owner(env: Env) -> BytesN<32> {
        load_owner(&env)
    }

    /// Custom authorizer invoked by the host for every `require_auth` on this
    /// address. The signature is the raw 64-byte ed25519 signature over the
    /// 32-byte authorization payload hash.
    #[allow(non_snake_case)]
    pub fn __check_auth(
        env: Env,
        signature_payload: BytesN<32>,
        signature: BytesN<64>,
        _auth_context: Vec<Context>,
    ) {
        let public_key = load_owner(&env);
        env.crypto()
            .ed25519_verify(&public_key, &signature_payload.into(), &signature);
    }
}

fn load_owner(env: &Env) -> BytesN<32> {
    env.storage()
        .instance()
        .get::<_, BytesN<32>>(&DataKey::Owner)
        .unwrap_or_else(|| panic_with_error!(env, AccountError::NotInitialized))
}
