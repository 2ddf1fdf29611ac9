//! Record keys.
//!
//! Confirms live under `/<namespace>/<hex nonce>:0x<lowercase address>`, the
//! latest valset under the single key [`LATEST_VALSET_KEY`].

use std::{fmt, str::FromStr};

use alloy_primitives::Address;

use crate::KeyError;

/// Key holding the latest valset.
pub const LATEST_VALSET_KEY: &str = "/lv/latest";

/// Namespaces of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Valset confirms.
    ValsetConfirm,
    /// Data commitment confirms.
    DataCommitmentConfirm,
    /// The latest valset.
    LatestValset,
}

impl Namespace {
    /// The namespace segment used in keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValsetConfirm => "vc",
            Self::DataCommitmentConfirm => "dcc",
            Self::LatestValset => "lv",
        }
    }

    /// Whether records in this namespace are immutable once written.
    #[must_use]
    pub const fn is_confirm(self) -> bool {
        matches!(self, Self::ValsetConfirm | Self::DataCommitmentConfirm)
    }

    /// Extracts the namespace of any record key.
    ///
    /// # Errors
    /// Fails if the key has no leading `/`, an empty or an unknown namespace.
    pub fn of_key(key: &str) -> Result<Self, KeyError> {
        let mut segments = key.split('/');
        if segments.next() != Some("") {
            return Err(KeyError::Malformed(key.to_string()));
        }
        match segments.next() {
            None => Err(KeyError::Malformed(key.to_string())),
            Some("") => Err(KeyError::EmptyNamespace(key.to_string())),
            Some(namespace) => namespace.parse(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vc" => Ok(Self::ValsetConfirm),
            "dcc" => Ok(Self::DataCommitmentConfirm),
            "lv" => Ok(Self::LatestValset),
            other => Err(KeyError::UnknownNamespace(other.to_string())),
        }
    }
}

/// Key of a single confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfirmKey {
    /// Confirm namespace.
    pub namespace: Namespace,
    /// Attestation nonce.
    pub nonce: u64,
    /// Signer address.
    pub address: Address,
}

impl ConfirmKey {
    /// Creates a new confirm key.
    #[must_use]
    pub const fn new(namespace: Namespace, nonce: u64, address: Address) -> Self {
        Self {
            namespace,
            nonce,
            address,
        }
    }
}

impl fmt::Display for ConfirmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{:x}:0x{}",
            self.namespace,
            self.nonce,
            hex::encode(self.address.as_slice())
        )
    }
}

impl FromStr for ConfirmKey {
    type Err = KeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = key.split('/').collect();
        let ["", namespace, id] = segments.as_slice() else {
            return Err(KeyError::Malformed(key.to_string()));
        };
        if namespace.is_empty() {
            return Err(KeyError::EmptyNamespace(key.to_string()));
        }

        let fields: Vec<&str> = id.split(':').collect();
        let [nonce, address] = fields.as_slice() else {
            return Err(KeyError::Malformed(key.to_string()));
        };
        if address.is_empty() {
            return Err(KeyError::EmptyAddress(key.to_string()));
        }

        let namespace: Namespace = namespace.parse()?;
        if !namespace.is_confirm() {
            return Err(KeyError::Malformed(key.to_string()));
        }

        let nonce = u64::from_str_radix(nonce, 16)
            .map_err(|_| KeyError::InvalidNonce((*nonce).to_string()))?;
        let address = address
            .strip_prefix("0x")
            .and_then(|hex| Address::from_str(hex).ok())
            .ok_or_else(|| KeyError::InvalidAddress((*address).to_string()))?;

        Ok(Self::new(namespace, nonce, address))
    }
}
