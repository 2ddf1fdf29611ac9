//! Conversions between the wire types and the domain model.

use alloy_primitives::{Address, B256};
use blobstream_types::{
    Attestation, AttestationError, BridgeValidator, DataCommitment, SourceError, Valset,
};
use time::OffsetDateTime;

use crate::rpc::{self, attestation::Attestation as WireAttestation};

impl TryFrom<rpc::BridgeValidator> for BridgeValidator {
    type Error = SourceError;

    fn try_from(validator: rpc::BridgeValidator) -> Result<Self, Self::Error> {
        let address: Address = validator.evm_address.parse().map_err(|e| {
            SourceError::Malformed(format!("evm address {:?}: {e}", validator.evm_address))
        })?;
        Ok(Self::new(address, validator.power))
    }
}

impl TryFrom<rpc::Valset> for Valset {
    type Error = SourceError;

    fn try_from(valset: rpc::Valset) -> Result<Self, Self::Error> {
        let time = OffsetDateTime::from_unix_timestamp(valset.time)
            .map_err(|e| SourceError::Malformed(format!("valset time {}: {e}", valset.time)))?;
        let members = valset
            .members
            .into_iter()
            .map(BridgeValidator::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(valset.nonce, members, valset.height, time))
    }
}

impl TryFrom<rpc::DataCommitment> for DataCommitment {
    type Error = SourceError;

    fn try_from(commitment: rpc::DataCommitment) -> Result<Self, Self::Error> {
        Ok(Self::new(
            commitment.nonce,
            commitment.begin_block,
            commitment.end_block,
        )?)
    }
}

impl TryFrom<rpc::Attestation> for Attestation {
    type Error = SourceError;

    fn try_from(attestation: rpc::Attestation) -> Result<Self, Self::Error> {
        match attestation.attestation {
            Some(WireAttestation::Valset(valset)) => Ok(Self::Valset(valset.try_into()?)),
            Some(WireAttestation::DataCommitment(commitment)) => {
                Ok(Self::DataCommitment(commitment.try_into()?))
            }
            None => Err(AttestationError::UnknownAttestationType("unset".to_string()).into()),
        }
    }
}

/// Decodes a 32 byte data root tuple root.
pub fn data_root(bytes: &[u8]) -> Result<B256, SourceError> {
    B256::try_from(bytes).map_err(|_| {
        SourceError::Malformed(format!(
            "data root tuple root must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}

impl From<&Valset> for rpc::Valset {
    fn from(valset: &Valset) -> Self {
        Self {
            nonce: valset.nonce,
            members: valset
                .members
                .iter()
                .map(|member| rpc::BridgeValidator {
                    power: member.power,
                    evm_address: member.evm_address.to_string(),
                })
                .collect(),
            height: valset.height,
            time: valset.time.unix_timestamp(),
        }
    }
}

impl From<&Attestation> for rpc::Attestation {
    fn from(attestation: &Attestation) -> Self {
        let inner = match attestation {
            Attestation::Valset(valset) => WireAttestation::Valset(valset.into()),
            Attestation::DataCommitment(commitment) => {
                WireAttestation::DataCommitment(rpc::DataCommitment {
                    nonce: commitment.nonce,
                    begin_block: commitment.begin_block,
                    end_block: commitment.end_block,
                })
            }
        };
        Self {
            attestation: Some(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_valset() -> rpc::Valset {
        rpc::Valset {
            nonce: 3,
            members: vec![
                rpc::BridgeValidator {
                    power: 10,
                    evm_address: "0x9c2B12b5a07FC6D719Ed7646e5041A7E85758329".to_string(),
                },
                rpc::BridgeValidator {
                    power: 5,
                    evm_address: "0xe650b084f05c6194f6e552e3b9f08718bc8a9d56".to_string(),
                },
            ],
            height: 1_200,
            time: 1_700_000_000,
        }
    }

    mod valset {
        use super::*;

        #[test]
        fn decodes_members_in_order() {
            let valset = Valset::try_from(wire_valset()).unwrap();

            assert_eq!(valset.nonce, 3);
            assert_eq!(valset.height, 1_200);
            assert_eq!(valset.total_power(), 15);
            assert_eq!(valset.members[0].power, 10);
            assert_eq!(valset.time.unix_timestamp(), 1_700_000_000);
            assert_eq!(Valset::try_from(rpc::Valset::from(&valset)).unwrap(), valset);
        }

        #[test]
        fn rejects_bad_address() {
            let mut wire = wire_valset();
            wire.members[1].evm_address = "0x1234".to_string();

            assert!(matches!(Valset::try_from(wire), Err(SourceError::Malformed(_))));
        }
    }

    mod attestation {
        use super::*;

        #[test]
        fn missing_variant_is_unknown_type() {
            assert!(matches!(
                Attestation::try_from(rpc::Attestation { attestation: None }),
                Err(SourceError::Attestation(AttestationError::UnknownAttestationType(_)))
            ));
        }

        #[test]
        fn inverted_range_is_rejected() {
            let wire = rpc::Attestation {
                attestation: Some(WireAttestation::DataCommitment(rpc::DataCommitment {
                    nonce: 4,
                    begin_block: 20,
                    end_block: 10,
                })),
            };

            assert!(matches!(
                Attestation::try_from(wire),
                Err(SourceError::Attestation(
                    AttestationError::InvalidBlockRange { begin: 20, end: 10 }
                ))
            ));
        }

        #[test]
        fn data_commitment() {
            let commitment = DataCommitment::new(4, 10, 20).unwrap();
            let wire = rpc::Attestation::from(&Attestation::DataCommitment(commitment));

            assert_eq!(
                Attestation::try_from(wire).unwrap(),
                Attestation::DataCommitment(commitment)
            );
        }
    }

    #[test]
    fn data_root_must_be_32_bytes() {
        assert_eq!(data_root(&[7; 32]).unwrap(), B256::repeat_byte(7));
        assert!(matches!(data_root(&[7; 31]), Err(SourceError::Malformed(_))));
    }
}
