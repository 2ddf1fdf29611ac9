//! Command line interface of the `blobstream` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::KEYSTORE_PASSWORD_ENV;

/// The command line interface.
#[derive(Clone, Debug, Parser)]
#[command(
    name = "blobstream",
    version,
    about = "Blobstream orchestrator and relayer",
    long_about = "Signs source chain attestations as an orchestrator, relays them with a quorum \
                  of signatures to the bridge contract, and serves the confirm store that connects \
                  the two."
)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The top level subcommands.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Sign attestations and publish confirms.
    #[command(subcommand)]
    Orchestrator(OrchestratorCommands),
    /// Relay attestations to the bridge contract.
    #[command(subcommand)]
    Relayer(RelayerCommands),
    /// Run a confirm store replica.
    #[command(subcommand)]
    Store(StoreCommands),
    /// Manage signing keys.
    #[command(subcommand)]
    Keys(KeysCommands),
}

/// Orchestrator subcommands.
#[derive(Clone, Debug, Subcommand)]
pub enum OrchestratorCommands {
    /// Start the orchestrator.
    Start(ConfigArgs),
}

/// Relayer subcommands.
#[derive(Clone, Debug, Subcommand)]
pub enum RelayerCommands {
    /// Start the relayer.
    Start(ConfigArgs),
}

/// Store subcommands.
#[derive(Clone, Debug, Subcommand)]
pub enum StoreCommands {
    /// Serve a replica.
    Serve(ConfigArgs),
}

/// Key management subcommands.
#[derive(Clone, Debug, Subcommand)]
pub enum KeysCommands {
    /// Generate a key into a new encrypted keystore.
    Add(KeyArgs),
    /// Print the address of a keystore.
    Show(KeyArgs),
}

/// Arguments of the long running subcommands.
#[derive(Clone, Debug, Args)]
pub struct ConfigArgs {
    /// Path to the JSON configuration file.
    #[arg(long)]
    pub config: PathBuf,
}

/// Arguments of the key subcommands.
#[derive(Clone, Debug, Args)]
pub struct KeyArgs {
    /// Directory holding the keystores.
    #[arg(long, default_value = "keys")]
    pub dir: PathBuf,
    /// Keystore file name.
    #[arg(long, default_value = "orchestrator")]
    pub name: String,
    /// Keystore password.
    #[arg(long, env = KEYSTORE_PASSWORD_ENV, hide_env_values = true)]
    pub password: String,
}
