use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use product_passport_lib::{Journal, PublicOutputs};
use tracing::{debug, info, warn};

use crate::backend::backend_for_receipt;
use crate::config::{ProofMode, VerifierConfig};
use crate::error::VerifyError;
use crate::receipt::{BackendKind, Receipt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The proof holds and the chain is valid.
    Accepted,
    /// The proof holds but the program found the chain invalid.
    RejectedInvalidChain,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted",
            Verdict::RejectedInvalidChain => "rejected_invalid_chain",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    pub verdict: Verdict,
    pub backend: BackendKind,
    pub outputs: PublicOutputs,
}

impl Verification {
    pub fn journal(&self) -> &Journal {
        &self.outputs.journal
    }
}

#[derive(Clone, Debug, Default)]
pub struct Verifier {
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn verify(&self, receipt: &Receipt) -> Result<Verification, VerifyError> {
        if receipt.backend() == BackendKind::Development && self.config.mode == ProofMode::Secure {
            return Err(VerifyError::ProofCheckFailed(
                "development receipts are not accepted in secure mode".to_string(),
            ));
        }
        let backend = backend_for_receipt(receipt.backend())
            .ok_or(VerifyError::BackendUnavailable(receipt.backend().as_str()))?;
        backend.verify(receipt)?;
        debug!(backend = receipt.backend().as_str(), "proof checks out");

        let outputs = receipt.outputs();
        if let Some(expected) = &self.config.expected_authority {
            if outputs.journal.authority_key_fingerprint != *expected {
                return Err(VerifyError::AuthorityMismatch);
            }
        }
        if let Some(zones) = &self.config.conflict_zones {
            if outputs.conflict_zone_commitment != zones.commitment() {
                return Err(VerifyError::ZoneListMismatch);
            }
        }

        let verdict = if outputs.journal.valid {
            Verdict::Accepted
        } else {
            Verdict::RejectedInvalidChain
        };
        info!(verdict = verdict.as_str(), "receipt verified");
        Ok(Verification {
            verdict,
            backend: receipt.backend(),
            outputs: outputs.clone(),
        })
    }

    /// Decodes and verifies a serialized receipt under the configured
    /// timeout.
    pub fn verify_bytes(&self, bytes: Vec<u8>) -> Result<Verification, VerifyError> {
        let (tx, rx) = mpsc::channel();
        let verifier = self.clone();
        thread::Builder::new()
            .name("verifier".to_string())
            .spawn(move || {
                let result = Receipt::from_bytes(&bytes).and_then(|r| verifier.verify(&r));
                let _ = tx.send(result);
            })
            .map_err(|e| VerifyError::ProofCheckFailed(e.to_string()))?;

        match rx.recv_timeout(self.config.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.config.timeout, "verification timed out");
                Err(VerifyError::TimedOut(self.config.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(VerifyError::ProofCheckFailed(
                "verifier stopped without a result".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DevBackend, ProofBackend};
    use crate::cancel::CancellationToken;
    use product_passport_lib::{ConflictZoneList, Fingerprint, PublicInputs, Witness};

    fn dev_receipt(zones: &ConflictZoneList) -> Receipt {
        let witness = Witness {
            licence: "x".to_string(),
            passport: "y".to_string(),
            authority_public_key: "z".to_string(),
        };
        let public = PublicInputs {
            conflict_zones: zones.clone(),
            verification_epoch: None,
        };
        let proved = DevBackend
            .prove(&witness, &public, &CancellationToken::new())
            .unwrap();
        Receipt::new(BackendKind::Development, proved.public_values, proved.proof).unwrap()
    }

    fn dev_verifier() -> Verifier {
        Verifier::new(VerifierConfig::new(ProofMode::Development))
    }

    #[test]
    fn secure_mode_refuses_development_seals() {
        let receipt = dev_receipt(&ConflictZoneList::default());
        let err = Verifier::default().verify(&receipt).unwrap_err();
        assert_eq!(err.kind(), "ProofCheckFailed");
    }

    #[test]
    fn invalid_journal_is_a_rejection_not_an_error() {
        let receipt = dev_receipt(&ConflictZoneList::default());
        let verification = dev_verifier().verify(&receipt).unwrap();
        assert_eq!(verification.verdict, Verdict::RejectedInvalidChain);
    }

    #[test]
    fn cross_checks_zone_list_and_authority() {
        let zones = ConflictZoneList::from_regions(["Darfur"]);
        let receipt = dev_receipt(&zones);

        let matching = VerifierConfig::new(ProofMode::Development).with_conflict_zones(zones);
        assert!(Verifier::new(matching).verify(&receipt).is_ok());

        let other = VerifierConfig::new(ProofMode::Development)
            .with_conflict_zones(ConflictZoneList::from_regions(["Donetsk"]));
        assert_eq!(
            Verifier::new(other).verify(&receipt),
            Err(VerifyError::ZoneListMismatch)
        );

        let authority = VerifierConfig::new(ProofMode::Development)
            .with_expected_authority(Fingerprint::digest(b"someone else"));
        assert_eq!(
            Verifier::new(authority).verify(&receipt),
            Err(VerifyError::AuthorityMismatch)
        );
    }

    #[test]
    fn verify_bytes_reports_malformed_input() {
        let err = dev_verifier().verify_bytes(b"garbage".to_vec()).unwrap_err();
        assert_eq!(err.kind(), "MalformedReceipt");
    }

    #[test]
    fn verify_bytes_round_trips() {
        let receipt = dev_receipt(&ConflictZoneList::default());
        let verification = dev_verifier().verify_bytes(receipt.to_bytes()).unwrap();
        assert_eq!(verification.outputs, *receipt.outputs());
    }
}
