//! `keys add` and `keys show`.

use alloy_primitives::Address;
use anyhow::Context;
use blobstream_signature::{identity::create_keystore, SigningIdentity};

use crate::cli::KeyArgs;

/// Generates a key into a new keystore and returns its address.
///
/// # Errors
/// Fails if the keystore already exists or cannot be written.
pub fn add(args: &KeyArgs) -> anyhow::Result<Address> {
    let path = args.dir.join(&args.name);
    anyhow::ensure!(!path.exists(), "keystore {} already exists", path.display());

    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("failed to create {}", args.dir.display()))?;
    let address = create_keystore(&args.dir, &args.name, &args.password)?;
    tracing::info!(%address, path = %path.display(), "Created keystore");
    Ok(address)
}

/// Unlocks a keystore and returns its address.
///
/// # Errors
/// Fails if the keystore cannot be read or the password is wrong.
pub fn show(args: &KeyArgs) -> anyhow::Result<Address> {
    let path = args.dir.join(&args.name);
    let identity = SigningIdentity::from_keystore(&path, &args.password)
        .with_context(|| format!("failed to unlock keystore {}", path.display()))?;
    Ok(identity.address())
}
