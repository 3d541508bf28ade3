use alloy_sol_types::{sol, SolValue};

use crate::error::JournalError;
use crate::keys::Fingerprint;

// SOLIDITY-COMPATIBLE OUTPUT STRUCT

sol! {
    // Journal fields first, then the echoed public inputs
    struct PublicValuesStruct {
        bool valid;
        bytes32 authority_key_fingerprint;
        string shipment_id;
        bytes32 conflict_zone_commitment;
        bool has_verification_epoch;
        int64 verification_epoch;
    }
}

/// The journal of a proof run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Journal {
    pub valid: bool,
    pub authority_key_fingerprint: Fingerprint,
    pub shipment_id: String,
}

/// Everything the program commits: the journal plus the public inputs it
/// was evaluated against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicOutputs {
    pub journal: Journal,
    pub conflict_zone_commitment: [u8; 32],
    pub verification_epoch: Option<i64>,
}

impl PublicOutputs {
    pub fn abi_encode(&self) -> Vec<u8> {
        let output = PublicValuesStruct {
            valid: self.journal.valid,
            authority_key_fingerprint: (*self.journal.authority_key_fingerprint.as_bytes()).into(),
            shipment_id: self.journal.shipment_id.clone(),
            conflict_zone_commitment: self.conflict_zone_commitment.into(),
            has_verification_epoch: self.verification_epoch.is_some(),
            verification_epoch: self.verification_epoch.unwrap_or_default(),
        };
        output.abi_encode()
    }

    /// Decodes committed bytes, accepting only the exact encoding
    /// `abi_encode` would produce.
    pub fn abi_decode(bytes: &[u8]) -> Result<Self, JournalError> {
        let output = PublicValuesStruct::abi_decode(bytes)
            .map_err(|e| JournalError::Decode(e.to_string()))?;
        if !output.has_verification_epoch && output.verification_epoch != 0 {
            return Err(JournalError::NonCanonical);
        }

        let outputs = Self {
            journal: Journal {
                valid: output.valid,
                authority_key_fingerprint: Fingerprint::from_bytes(
                    output.authority_key_fingerprint.0,
                ),
                shipment_id: output.shipment_id,
            },
            conflict_zone_commitment: output.conflict_zone_commitment.0,
            verification_epoch: output
                .has_verification_epoch
                .then_some(output.verification_epoch),
        };
        if outputs.abi_encode() != bytes {
            return Err(JournalError::NonCanonical);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(epoch: Option<i64>) -> PublicOutputs {
        PublicOutputs {
            journal: Journal {
                valid: true,
                authority_key_fingerprint: Fingerprint::digest(b"authority"),
                shipment_id: "42".to_string(),
            },
            conflict_zone_commitment: [7u8; 32],
            verification_epoch: epoch,
        }
    }

    #[test]
    fn decodes_what_it_encodes() {
        for epoch in [None, Some(0), Some(1_750_000_000), Some(-1)] {
            let bytes = outputs(epoch).abi_encode();
            assert_eq!(PublicOutputs::abi_decode(&bytes).unwrap(), outputs(epoch));
        }
    }

    #[test]
    fn rejects_truncated_bytes() {
        let bytes = outputs(None).abi_encode();
        assert!(PublicOutputs::abi_decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(matches!(
            PublicOutputs::abi_decode(&bytes[..16]),
            Err(JournalError::Decode(_))
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = outputs(None).abi_encode();
        bytes.extend_from_slice(&[0u8; 32]);
        assert!(PublicOutputs::abi_decode(&bytes).is_err());
    }

    #[test]
    fn rejects_epoch_without_flag() {
        let output = PublicValuesStruct {
            valid: false,
            authority_key_fingerprint: [0u8; 32].into(),
            shipment_id: String::new(),
            conflict_zone_commitment: [0u8; 32].into(),
            has_verification_epoch: false,
            verification_epoch: 5,
        };
        assert_eq!(
            PublicOutputs::abi_decode(&output.abi_encode()),
            Err(JournalError::NonCanonical)
        );
    }
}
