// Example: deriving a Lumenitos wallet's addresses offline
//
// Both the classic account and the programmable account address are pure
// functions of the owner key, the deployer and the network.

use ed25519_dalek::SigningKey;
use lumenitos_sdk::{Deployer, LumenitosWallet, SdkConfig};
use rand::rngs::OsRng;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SdkConfig::testnet();
    let owner = SigningKey::generate(&mut OsRng);
    let owner_key = owner.verifying_key().to_bytes();

    let direct = LumenitosWallet::new(
        &owner_key,
        Deployer::Owner,
        config.network_passphrase.clone(),
        config.transactions.clone(),
    )?;

    println!("Lumenitos wallet:");
    println!("  Owner key:          {}", hex::encode(owner_key));
    println!("  Classic account:    {}", direct.account_address());
    println!("  Programmable (own): {}", direct.contract_address());

    if let Ok(factory) = std::env::var("LUMENITOS_FACTORY_ADDRESS") {
        let via_factory = LumenitosWallet::new(
            &owner_key,
            Deployer::Factory(factory),
            config.network_passphrase.clone(),
            config.transactions.clone(),
        )?;
        println!("  Programmable (factory): {}", via_factory.contract_address());
    }

    Ok(())
}
