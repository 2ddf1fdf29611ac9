//! ABI of the Blobstream bridge contract.
//!
//! The `domainSeparate*` and `computeValidatorSetHash` declarations are not
//! contract entry points. They describe the argument layout the contract
//! hashes, so their call encodings (minus the selector) are the signed
//! payloads.

use alloy_primitives::U256;
use blobstream_types::{BridgeValidator, Valset};

alloy_sol_types::sol! {
    /// A member of the validator set the contract checks signatures against.
    #[derive(Debug, PartialEq, Eq)]
    struct Validator {
        address addr;
        uint256 power;
    }

    /// An ECDSA signature split into its components. Missing signers are
    /// passed as all-zero entries.
    #[derive(Debug, PartialEq, Eq, Default)]
    struct Signature {
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    function domainSeparateValidatorSetHash(
        bytes32 _domainSeparator,
        uint256 _nonce,
        uint256 _powerThreshold,
        bytes32 _validatorSetHash
    );

    function domainSeparateDataRootTupleRoot(
        bytes32 _domainSeparator,
        uint256 _nonce,
        bytes32 _dataRootTupleRoot
    );

    function computeValidatorSetHash(Validator[] _validators);

    #[sol(rpc)]
    #[allow(clippy::too_many_arguments)]
    contract Blobstream {
        function state_eventNonce() external view returns (uint256);

        function state_powerThreshold() external view returns (uint256);

        function state_lastValidatorSetCheckpoint() external view returns (bytes32);

        function updateValidatorSet(
            uint256 _newNonce,
            uint256 _oldNonce,
            uint256 _newPowerThreshold,
            bytes32 _newValidatorSetHash,
            Validator[] calldata _currentValidatorSet,
            Signature[] calldata _sigs
        ) external;

        function submitDataRootTupleRoot(
            uint256 _newNonce,
            uint256 _validatorSetNonce,
            bytes32 _dataRootTupleRoot,
            Validator[] calldata _currentValidatorSet,
            Signature[] calldata _sigs
        ) external;

        event ValidatorSetUpdatedEvent(
            uint256 indexed nonce,
            uint256 powerThreshold,
            bytes32 validatorSetHash
        );

        event DataCommitmentRootEvent(
            uint256 indexed nonce,
            bytes32 dataRootTupleRoot
        );
    }
}

impl From<&BridgeValidator> for Validator {
    fn from(validator: &BridgeValidator) -> Self {
        Self {
            addr: validator.evm_address,
            power: U256::from(validator.power),
        }
    }
}

impl Validator {
    /// The contract's view of a valset's members, in valset order.
    #[must_use]
    pub fn from_valset(valset: &Valset) -> Vec<Self> {
        valset.members.iter().map(Self::from).collect()
    }
}
