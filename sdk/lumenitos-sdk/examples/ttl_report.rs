// Example: reporting and maintaining TTLs of the shared contracts
//
// Usage:
//   cargo run --example ttl_report -- lumenitos.toml
//
// Set LUMENITOS_MAINTENANCE_SECRET (hex seed) to bump or restore entries;
// without it the run only reports.

use anyhow::Context;
use ed25519_dalek::SigningKey;
use lumenitos_sdk::{LumenitosClient, LumenitosSigner, MaintenanceRequest, SdkConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lumenitos.toml".into());
    let config = SdkConfig::load(&path).with_context(|| format!("loading {path}"))?;
    let client = LumenitosClient::from_config(config)?;
    let lifecycle = client.lifecycle()?;

    let maintainer = match std::env::var("LUMENITOS_MAINTENANCE_SECRET") {
        Ok(secret) => {
            let seed: [u8; 32] = hex::decode(secret)?
                .try_into()
                .map_err(|_| anyhow::anyhow!("maintenance secret must be 32 bytes"))?;
            Some(SigningKey::from_bytes(&seed))
        },
        Err(_) => None,
    };

    let outcome = lifecycle
        .maintain(
            MaintenanceRequest {
                bump: true,
                install: false,
            },
            maintainer.as_ref().map(|k| k as &dyn LumenitosSigner),
        )
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
