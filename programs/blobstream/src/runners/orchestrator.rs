//! `orchestrator start`.

use std::sync::Arc;

use anyhow::Context;
use blobstream_orchestrator::Orchestrator;
use blobstream_signature::SigningIdentity;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Runs an orchestrator until `token` is cancelled or it fails fatally.
///
/// # Errors
/// Fails if the key cannot be unlocked, a client cannot be built, or the
/// orchestrator loses the source chain.
pub async fn run(config: &Config, password: &str, token: CancellationToken) -> anyhow::Result<()> {
    let keystore = config.keystore.orchestrator_path();
    let identity = SigningIdentity::from_keystore(&keystore, password)
        .with_context(|| format!("failed to unlock keystore {}", keystore.display()))?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(super::attestation_source(config)?),
        super::confirm_store(config)?,
        Arc::new(identity),
        config.retry.into(),
        config.orchestrator.clone(),
    ));
    orchestrator.start(token).await?;
    Ok(())
}
