// Example: sending native XLM from a wallet's classic account
//
// Usage:
//   LUMENITOS_SECRET=<hex ed25519 seed> cargo run --example transfer -- <destination> <stroops>

use anyhow::Context;
use ed25519_dalek::SigningKey;
use lumenitos_sdk::{LumenitosClient, SdkConfig, SubmissionOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let destination = args.next().context("destination address required")?;
    let amount: i128 = args.next().context("amount required")?.parse()?;

    let seed = hex::decode(std::env::var("LUMENITOS_SECRET").context("LUMENITOS_SECRET unset")?)?;
    let seed: [u8; 32] = seed
        .try_into()
        .map_err(|_| anyhow::anyhow!("LUMENITOS_SECRET must be 32 bytes"))?;
    let owner = SigningKey::from_bytes(&seed);

    let mut config = SdkConfig::testnet();
    config.apply_env_overrides();
    let client = LumenitosClient::from_config(config)?;
    let wallet = client.wallet(&owner.verifying_key().to_bytes())?;

    let before = wallet
        .native_balance(client.connection(), wallet.account_address())
        .await?;
    println!("{} holds {before} stroops", wallet.account_address());

    let outcome = wallet
        .transfer()
        .with_destination(destination)
        .with_amount(amount)
        .execute(client.connection(), &owner)
        .await?;

    match outcome {
        SubmissionOutcome::Success(confirmed) => {
            println!("confirmed {} in ledger {:?}", confirmed.hash, confirmed.ledger)
        },
        SubmissionOutcome::Failed { hash, detail } => println!("{hash} failed: {detail}"),
        SubmissionOutcome::TimedOut { hash, attempts } => {
            println!("{hash} unconfirmed after {attempts} polls; query it again later")
        },
    }
    Ok(())
}
