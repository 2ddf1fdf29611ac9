//! Namespace validators and selectors.

use std::marker::PhantomData;

use blobstream_types::{DataCommitmentConfirm, LatestValset, ValsetConfirm};
use blobstream_utils::ensure;

use crate::{Confirm, ConfirmKey, Namespace, ValidationError, LATEST_VALSET_KEY};

/// Validation and conflict resolution for one namespace.
pub trait RecordValidator: Send + Sync {
    /// Accepts or rejects a record.
    ///
    /// # Errors
    /// Returns why the record is invalid.
    fn validate(&self, key: &str, value: &[u8]) -> Result<(), ValidationError>;

    /// Picks the authoritative value among conflicting candidates for `key`.
    ///
    /// # Errors
    /// Returns [`ValidationError::NoValidCandidate`] if no candidate validates.
    fn select(&self, key: &str, values: &[Vec<u8>]) -> Result<usize, ValidationError> {
        values
            .iter()
            .position(|value| self.validate(key, value).is_ok())
            .ok_or_else(|| ValidationError::NoValidCandidate(key.to_string()))
    }
}

/// Validator for a confirm namespace. The first valid candidate wins.
#[derive(Debug)]
pub struct ConfirmValidator<C> {
    _confirm: PhantomData<fn() -> C>,
}

impl<C> Default for ConfirmValidator<C> {
    fn default() -> Self {
        Self {
            _confirm: PhantomData,
        }
    }
}

impl<C: Confirm> ConfirmValidator<C> {
    /// Parses and validates a record, returning its key and decoded confirm.
    ///
    /// # Errors
    /// Returns why the record is invalid.
    pub fn decode(&self, key: &str, value: &[u8]) -> Result<(ConfirmKey, C), ValidationError> {
        let key: ConfirmKey = key.parse()?;
        ensure!(
            key.namespace == C::NAMESPACE,
            ValidationError::WrongNamespace {
                expected: C::NAMESPACE,
                found: key.namespace,
            }
        );

        let confirm: C = serde_json::from_slice(value)?;
        ensure!(
            confirm.signer() == key.address,
            ValidationError::AddressMismatch {
                key: key.address,
                value: confirm.signer(),
            }
        );

        confirm.check_signature(key.nonce)?;
        Ok((key, confirm))
    }
}

impl<C: Confirm> RecordValidator for ConfirmValidator<C> {
    fn validate(&self, key: &str, value: &[u8]) -> Result<(), ValidationError> {
        self.decode(key, value).map(|_| ())
    }
}

/// Validator for the latest valset. The candidate with the highest nonce wins.
#[derive(Debug, Default)]
pub struct LatestValsetValidator;

impl LatestValsetValidator {
    fn decode(key: &str, value: &[u8]) -> Result<LatestValset, ValidationError> {
        let namespace = Namespace::of_key(key)?;
        ensure!(
            namespace == Namespace::LatestValset,
            ValidationError::WrongNamespace {
                expected: Namespace::LatestValset,
                found: namespace,
            }
        );
        if key != LATEST_VALSET_KEY {
            return Err(crate::KeyError::Malformed(key.to_string()).into());
        }

        let latest: LatestValset = serde_json::from_slice(value)?;
        ensure!(!latest.0.is_empty(), ValidationError::EmptyValset);
        Ok(latest)
    }
}

impl RecordValidator for LatestValsetValidator {
    fn validate(&self, key: &str, value: &[u8]) -> Result<(), ValidationError> {
        Self::decode(key, value).map(|_| ())
    }

    fn select(&self, key: &str, values: &[Vec<u8>]) -> Result<usize, ValidationError> {
        values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                Self::decode(key, value)
                    .ok()
                    .map(|latest| (index, latest.0.nonce))
            })
            // Ties keep the earliest candidate.
            .fold(None, |best: Option<(usize, u64)>, (index, nonce)| match best {
                Some((_, best_nonce)) if best_nonce >= nonce => best,
                _ => Some((index, nonce)),
            })
            .map(|(index, _)| index)
            .ok_or_else(|| ValidationError::NoValidCandidate(key.to_string()))
    }
}

/// Dispatches to the validator of the namespace encoded in each key.
#[derive(Debug, Default)]
pub struct NamespacedValidator {
    valset_confirms: ConfirmValidator<ValsetConfirm>,
    data_commitment_confirms: ConfirmValidator<DataCommitmentConfirm>,
    latest_valset: LatestValsetValidator,
}

impl NamespacedValidator {
    fn validator_for(&self, key: &str) -> Result<&dyn RecordValidator, ValidationError> {
        let validator: &dyn RecordValidator = match Namespace::of_key(key)? {
            Namespace::ValsetConfirm => &self.valset_confirms,
            Namespace::DataCommitmentConfirm => &self.data_commitment_confirms,
            Namespace::LatestValset => &self.latest_valset,
        };
        Ok(validator)
    }
}

impl RecordValidator for NamespacedValidator {
    fn validate(&self, key: &str, value: &[u8]) -> Result<(), ValidationError> {
        self.validator_for(key)?.validate(key, value)
    }

    fn select(&self, key: &str, values: &[Vec<u8>]) -> Result<usize, ValidationError> {
        self.validator_for(key)?.select(key, values)
    }
}
