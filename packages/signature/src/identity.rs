//! The orchestrator's signing key.

use std::{
    fmt,
    path::Path,
    sync::{Mutex, PoisonError},
};

use alloy_primitives::{Address, Signature, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::{LocalSigner, PrivateKeySigner};
use rand::thread_rng;

use crate::SignatureError;

/// An EVM key that is unlocked for the lifetime of an orchestrator and wiped
/// by [`SigningIdentity::lock`] on shutdown.
pub struct SigningIdentity {
    address: Address,
    signer: Mutex<Option<PrivateKeySigner>>,
}

impl SigningIdentity {
    /// Wraps an already unlocked signer.
    #[must_use]
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self {
            address: signer.address(),
            signer: Mutex::new(Some(signer)),
        }
    }

    /// Decrypts the keystore at `path`.
    ///
    /// # Errors
    /// Fails if the keystore cannot be read or the password is wrong.
    pub fn from_keystore<P: AsRef<Path>>(path: P, password: &str) -> Result<Self, SignatureError> {
        let signer = LocalSigner::decrypt_keystore(path, password)?;
        tracing::info!(address = %signer.address(), "Unlocked signing key");
        Ok(Self::new(signer))
    }

    /// The address this identity signs as. Available even once locked.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Whether the key is still available for signing.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.signer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drops the key. Any later signing attempt fails with
    /// [`SignatureError::InvalidKey`].
    pub fn lock(&self) {
        let previous = self
            .signer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            tracing::info!(address = %self.address, "Locked signing key");
        }
    }

    pub(crate) fn sign_hash(&self, hash: &B256) -> Result<Signature, SignatureError> {
        let guard = self.signer.lock().unwrap_or_else(PoisonError::into_inner);
        let signer = guard.as_ref().ok_or(SignatureError::InvalidKey)?;
        Ok(signer.sign_hash_sync(hash)?)
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address)
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}

/// Generates a new key and writes it to `dir/name` as an encrypted keystore.
///
/// # Errors
/// Fails if the keystore cannot be written.
pub fn create_keystore<P: AsRef<Path>>(
    dir: P,
    name: &str,
    password: &str,
) -> Result<Address, SignatureError> {
    let mut rng = thread_rng();
    let (signer, _) = LocalSigner::new_keystore(dir, &mut rng, password, Some(name))?;
    Ok(signer.address())
}

/// Encrypts an existing key into `dir/name`.
///
/// # Errors
/// Fails if the keystore cannot be written.
pub fn write_keystore<P: AsRef<Path>>(
    dir: P,
    name: &str,
    signer: &PrivateKeySigner,
    password: &str,
) -> Result<(), SignatureError> {
    let key = signer.credential().to_bytes();
    let mut rng = thread_rng();
    LocalSigner::encrypt_keystore(dir, &mut rng, key, password, Some(name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    mod keystore {
        use super::*;

        #[test]
        fn write_then_unlock() {
            let dir = tempdir().unwrap();
            let signer = PrivateKeySigner::random();

            write_keystore(dir.path(), "orchestrator", &signer, "hunter2").unwrap();
            let identity =
                SigningIdentity::from_keystore(dir.path().join("orchestrator"), "hunter2").unwrap();

            assert_eq!(identity.address(), signer.address());
            assert!(identity.is_unlocked());
        }

        #[test]
        fn create_then_unlock() {
            let dir = tempdir().unwrap();
            let address = create_keystore(dir.path(), "fresh", "").unwrap();
            let identity = SigningIdentity::from_keystore(dir.path().join("fresh"), "").unwrap();

            assert_eq!(identity.address(), address);
        }

        #[test]
        fn wrong_password_fails() {
            let dir = tempdir().unwrap();
            write_keystore(dir.path(), "key", &PrivateKeySigner::random(), "right").unwrap();

            assert!(matches!(
                SigningIdentity::from_keystore(dir.path().join("key"), "wrong"),
                Err(SignatureError::Keystore(_))
            ));
        }
    }

    mod lock {
        use super::*;

        #[test]
        fn keeps_address_after_lock() {
            let signer = PrivateKeySigner::random();
            let identity = SigningIdentity::new(signer.clone());
            identity.lock();

            assert!(!identity.is_unlocked());
            assert_eq!(identity.address(), signer.address());
            assert!(matches!(
                identity.sign_hash(&B256::ZERO),
                Err(SignatureError::InvalidKey)
            ));
        }

        #[test]
        fn debug_does_not_leak_key() {
            let identity = SigningIdentity::new(PrivateKeySigner::random());
            let debug = format!("{identity:?}");

            assert!(debug.contains("SigningIdentity"));
            assert!(debug.contains("unlocked: true"));
        }
    }
}
