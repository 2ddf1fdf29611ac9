//! `relayer start`.

use std::sync::Arc;

use alloy::{network::EthereumWallet, providers::ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use blobstream_relayer::{EvmChainSubmitter, Relayer};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Runs the relayer until `token` is cancelled.
///
/// # Errors
/// Fails if the relayer key cannot be unlocked or a client cannot be built.
pub async fn run(config: &Config, password: &str, token: CancellationToken) -> anyhow::Result<()> {
    let target = config.target()?;

    let keystore = config.keystore.relayer_path();
    let signer = PrivateKeySigner::decrypt_keystore(&keystore, password)
        .with_context(|| format!("failed to unlock keystore {}", keystore.display()))?;
    tracing::info!(
        address = %signer.address(),
        contract = %target.contract_address,
        "Unlocked relayer key"
    );

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect(&target.rpc_url)
        .await
        .with_context(|| format!("failed to connect to {}", target.rpc_url))?;
    let submitter =
        EvmChainSubmitter::new(target.contract_address, provider, target.receipt_timeout);

    let relayer = Arc::new(Relayer::new(
        Arc::new(super::attestation_source(config)?),
        super::confirm_store(config)?,
        Arc::new(submitter),
        config.relayer.clone(),
    ));
    relayer.start(token).await;
    Ok(())
}
