//! Attestations produced by the source chain.

use std::{collections::HashSet, fmt, str::FromStr};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The first nonce is the valset the bridge contract was deployed with. It is
/// trusted on deployment and never signed.
pub const BOOTSTRAP_NONCE: u64 = 1;

/// Errors raised while building or decoding attestations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttestationError {
    /// A data commitment must cover a non-empty block range.
    #[error("invalid data commitment range: begin block {begin} is not before end block {end}")]
    InvalidBlockRange {
        /// First block of the range.
        begin: u64,
        /// Last block of the range.
        end: u64,
    },
    /// The attestation type tag is not one we know how to sign.
    #[error("unknown attestation type: {0}")]
    UnknownAttestationType(String),
    /// The threshold of a non-bootstrap attestation needs the preceding valset.
    #[error("no preceding valset supplied for nonce {0}")]
    MissingPriorValset(u64),
}

/// A validator as the bridge contract sees it: an EVM address and its
/// normalized voting power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeValidator {
    /// Normalized voting power.
    pub power: u64,
    /// EVM address the validator signs with.
    pub evm_address: Address,
}

impl BridgeValidator {
    /// Creates a new bridge validator.
    #[must_use]
    pub const fn new(evm_address: Address, power: u64) -> Self {
        Self { power, evm_address }
    }
}

/// A snapshot of the validator set at a given nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valset {
    /// Attestation nonce.
    pub nonce: u64,
    /// Members, ordered as the source chain ordered them.
    pub members: Vec<BridgeValidator>,
    /// Source chain height the valset was created at.
    pub height: u64,
    /// Source chain block time the valset was created at.
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

impl Valset {
    /// Builds a valset, keeping the first occurrence of each address.
    #[must_use]
    pub fn new(
        nonce: u64,
        members: impl IntoIterator<Item = BridgeValidator>,
        height: u64,
        time: OffsetDateTime,
    ) -> Self {
        let mut seen = HashSet::new();
        let members = members
            .into_iter()
            .filter(|member| seen.insert(member.evm_address))
            .collect();

        Self {
            nonce,
            members,
            height,
            time,
        }
    }

    /// The all-zero valset used as the "nothing stored" sentinel.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            nonce: 0,
            members: Vec::new(),
            height: 0,
            time: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Whether this is the empty sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nonce == 0
            && self.members.is_empty()
            && self.height == 0
            && self.time == OffsetDateTime::UNIX_EPOCH
    }

    /// Sum of all members' power.
    #[must_use]
    pub fn total_power(&self) -> u64 {
        self.members
            .iter()
            .fold(0_u64, |total, member| total.saturating_add(member.power))
    }

    /// `ceil(2 * total_power / 3)`. An empty or zero-power valset yields 0.
    #[must_use]
    pub fn two_thirds_threshold(&self) -> u64 {
        let total = u128::from(self.total_power());
        let threshold = (2 * total).div_ceil(3);
        u64::try_from(threshold).unwrap_or(u64::MAX)
    }

    /// Power of the given address, 0 for non-members.
    #[must_use]
    pub fn power_of(&self, address: &Address) -> u64 {
        self.members
            .iter()
            .find(|member| &member.evm_address == address)
            .map_or(0, |member| member.power)
    }

    /// Whether the given address is a member.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.members
            .iter()
            .any(|member| &member.evm_address == address)
    }
}

/// A commitment over the data roots of the blocks in `[begin_block, end_block)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCommitment {
    /// Attestation nonce.
    pub nonce: u64,
    /// First block covered.
    pub begin_block: u64,
    /// End of the covered range.
    pub end_block: u64,
}

impl DataCommitment {
    /// Builds a data commitment, rejecting empty or inverted ranges.
    ///
    /// # Errors
    /// Returns [`AttestationError::InvalidBlockRange`] unless `begin_block < end_block`.
    pub const fn new(
        nonce: u64,
        begin_block: u64,
        end_block: u64,
    ) -> Result<Self, AttestationError> {
        if begin_block >= end_block {
            return Err(AttestationError::InvalidBlockRange {
                begin: begin_block,
                end: end_block,
            });
        }

        Ok(Self {
            nonce,
            begin_block,
            end_block,
        })
    }
}

/// Discriminant of an [`Attestation`], used in logs, metrics and wire decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationType {
    /// Validator set update.
    Valset,
    /// Data commitment.
    DataCommitment,
}

impl AttestationType {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valset => "valset",
            Self::DataCommitment => "data_commitment",
        }
    }
}

impl fmt::Display for AttestationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttestationType {
    type Err = AttestationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valset" => Ok(Self::Valset),
            "data_commitment" => Ok(Self::DataCommitment),
            other => Err(AttestationError::UnknownAttestationType(other.to_string())),
        }
    }
}

/// An attestation produced by the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attestation {
    /// Validator set update.
    Valset(Valset),
    /// Data commitment.
    DataCommitment(DataCommitment),
}

impl Attestation {
    /// The attestation nonce.
    #[must_use]
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::Valset(valset) => valset.nonce,
            Self::DataCommitment(commitment) => commitment.nonce,
        }
    }

    /// The attestation type.
    #[must_use]
    pub const fn kind(&self) -> AttestationType {
        match self {
            Self::Valset(_) => AttestationType::Valset,
            Self::DataCommitment(_) => AttestationType::DataCommitment,
        }
    }

    /// Power needed to sign this attestation.
    ///
    /// Computed over `prior`, the valset preceding this nonce. The bootstrap
    /// valset has no predecessor and uses its own members instead.
    ///
    /// # Errors
    /// Returns [`AttestationError::MissingPriorValset`] if `prior` is needed but absent.
    pub fn two_thirds_threshold(&self, prior: Option<&Valset>) -> Result<u64, AttestationError> {
        match (self, prior) {
            (Self::Valset(valset), _) if valset.nonce == BOOTSTRAP_NONCE => {
                Ok(valset.two_thirds_threshold())
            }
            (_, Some(prior)) => Ok(prior.two_thirds_threshold()),
            (_, None) => Err(AttestationError::MissingPriorValset(self.nonce())),
        }
    }
}

impl From<Valset> for Attestation {
    fn from(valset: Valset) -> Self {
        Self::Valset(valset)
    }
}

impl From<DataCommitment> for Attestation {
    fn from(commitment: DataCommitment) -> Self {
        Self::DataCommitment(commitment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn member(byte: u8, power: u64) -> BridgeValidator {
        BridgeValidator::new(Address::repeat_byte(byte), power)
    }

    fn valset(nonce: u64, members: Vec<BridgeValidator>) -> Valset {
        Valset::new(nonce, members, 10, OffsetDateTime::UNIX_EPOCH)
    }

    mod threshold {
        use super::*;

        #[rstest]
        #[case::typical(vec![10, 15, 10], 24)]
        #[case::exact_multiple(vec![30], 20)]
        #[case::rounds_up(vec![1], 1)]
        #[case::two_members(vec![5, 5], 7)]
        #[case::zero_power(vec![0, 0], 0)]
        #[case::no_members(vec![], 0)]
        fn two_thirds_of_total(#[case] powers: Vec<u64>, #[case] expected: u64) {
            let members = powers
                .into_iter()
                .enumerate()
                .map(|(i, power)| member(u8::try_from(i + 1).unwrap(), power))
                .collect();
            assert_eq!(valset(2, members).two_thirds_threshold(), expected);
        }

        #[test]
        fn does_not_overflow_near_u64_max() {
            let vs = valset(2, vec![member(1, u64::MAX)]);
            assert_eq!(vs.two_thirds_threshold(), u64::MAX / 3 * 2);
        }

        #[test]
        fn uses_prior_valset() {
            let prior = valset(1, vec![member(1, 10), member(2, 15), member(3, 10)]);
            let next = Attestation::Valset(valset(2, vec![member(4, 100)]));
            assert_eq!(next.two_thirds_threshold(Some(&prior)).unwrap(), 24);

            let commitment = Attestation::DataCommitment(DataCommitment::new(3, 0, 10).unwrap());
            assert_eq!(commitment.two_thirds_threshold(Some(&prior)).unwrap(), 24);
        }

        #[test]
        fn bootstrap_uses_own_members() {
            let bootstrap = Attestation::Valset(valset(BOOTSTRAP_NONCE, vec![member(1, 30)]));
            assert_eq!(bootstrap.two_thirds_threshold(None).unwrap(), 20);
        }

        #[test]
        fn bootstrap_with_zero_power_is_zero() {
            let bootstrap = Attestation::Valset(valset(BOOTSTRAP_NONCE, vec![]));
            assert_eq!(bootstrap.two_thirds_threshold(None).unwrap(), 0);
        }

        #[test]
        fn missing_prior_is_an_error() {
            let commitment = Attestation::DataCommitment(DataCommitment::new(5, 0, 10).unwrap());
            assert_eq!(
                commitment.two_thirds_threshold(None),
                Err(AttestationError::MissingPriorValset(5))
            );
        }
    }

    mod valset {
        use super::*;

        #[test]
        fn deduplicates_by_address() {
            let vs = valset(2, vec![member(1, 10), member(2, 15), member(1, 99)]);
            assert_eq!(vs.members, vec![member(1, 10), member(2, 15)]);
            assert_eq!(vs.total_power(), 25);
        }

        #[test]
        fn power_of_non_member_is_zero() {
            let vs = valset(2, vec![member(1, 10)]);
            assert_eq!(vs.power_of(&Address::repeat_byte(1)), 10);
            assert_eq!(vs.power_of(&Address::repeat_byte(9)), 0);
            assert!(!vs.contains(&Address::repeat_byte(9)));
        }

        #[test]
        fn empty_sentinel() {
            assert!(Valset::empty().is_empty());
            assert!(!valset(1, vec![]).is_empty());
        }

        #[test]
        fn json_shape() {
            let vs = valset(3, vec![member(0xab, 7)]);
            let json = serde_json::to_value(&vs).unwrap();
            assert_eq!(json["nonce"], 3);
            assert_eq!(json["height"], 10);
            assert_eq!(json["time"], "1970-01-01T00:00:00Z");
            assert_eq!(json["members"][0]["power"], 7);
            assert_eq!(
                json["members"][0]["evm_address"]
                    .as_str()
                    .unwrap()
                    .to_lowercase(),
                format!("0x{}", "ab".repeat(20))
            );

            let decoded: Valset = serde_json::from_value(json).unwrap();
            assert_eq!(decoded, vs);
        }
    }

    mod data_commitment {
        use super::*;

        #[rstest]
        #[case::equal(5, 5)]
        #[case::inverted(6, 5)]
        fn rejects_empty_range(#[case] begin: u64, #[case] end: u64) {
            assert_eq!(
                DataCommitment::new(2, begin, end),
                Err(AttestationError::InvalidBlockRange { begin, end })
            );
        }

        #[test]
        fn accepts_range() {
            let commitment = DataCommitment::new(2, 0, 400).unwrap();
            assert_eq!(Attestation::from(commitment).nonce(), 2);
        }
    }

    mod attestation_type {
        use super::*;

        #[test]
        fn parses_known_types() {
            assert_eq!("valset".parse::<AttestationType>(), Ok(AttestationType::Valset));
            assert_eq!(
                "data_commitment".parse::<AttestationType>(),
                Ok(AttestationType::DataCommitment)
            );
        }

        #[test]
        fn rejects_unknown_type() {
            assert_eq!(
                "checkpoint".parse::<AttestationType>(),
                Err(AttestationError::UnknownAttestationType("checkpoint".to_string()))
            );
        }

        #[test]
        fn unknown_tag_fails_to_decode() {
            let json = serde_json::json!({"type": "checkpoint", "nonce": 1});
            assert!(serde_json::from_value::<Attestation>(json).is_err());
        }
    }
}
