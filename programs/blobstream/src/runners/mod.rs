//! Entry points of the subcommands.

pub mod keys;
pub mod orchestrator;
pub mod relayer;
pub mod store;

use anyhow::Context;
use blobstream_confirm_store::{ConfirmStore, GrpcOverlay};
use blobstream_source_client::GrpcAttestationSource;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, KEYSTORE_PASSWORD_ENV};

/// Reads the keystore password from the environment.
///
/// # Errors
/// Fails if the variable is unset.
pub fn keystore_password() -> anyhow::Result<String> {
    std::env::var(KEYSTORE_PASSWORD_ENV)
        .with_context(|| format!("{KEYSTORE_PASSWORD_ENV} must be set to unlock the keystore"))
}

/// A token cancelled on ctrl-c.
#[must_use]
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received ctrl-c, shutting down");
                on_signal.cancel();
            }
            Err(err) => tracing::error!(error = %err, "Cannot listen for ctrl-c"),
        }
    });
    token
}

fn attestation_source(config: &Config) -> anyhow::Result<GrpcAttestationSource> {
    GrpcAttestationSource::connect_lazy(&config.source)
        .with_context(|| format!("invalid source endpoint {}", config.source.endpoint))
}

fn confirm_store(config: &Config) -> anyhow::Result<ConfirmStore<GrpcOverlay>> {
    anyhow::ensure!(
        !config.store.peers.is_empty(),
        "store.peers must list at least one replica"
    );
    let overlay =
        GrpcOverlay::connect_lazy(&config.store.peers, config.store.client.request_timeout)?;
    Ok(ConfirmStore::new(overlay, &config.store.client))
}
