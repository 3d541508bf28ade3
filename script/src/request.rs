use std::fs;
use std::path::{Path, PathBuf};

use product_passport_lib::keys::fingerprint_of_raw;
use product_passport_lib::{ConflictZoneList, PublicInputs};
use tracing::info;

use crate::cancel::CancellationToken;
use crate::config::VerifierConfig;
use crate::error::RequestError;
use crate::prover::{encode_witness, ProofOutcome, Prover};
use crate::verifier::{Verification, Verifier};

/// Inputs and output location of one proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProveRequest {
    pub passport_path: PathBuf,
    pub licence_path: PathBuf,
    pub authority_key_path: PathBuf,
    pub conflict_zones_path: PathBuf,
    pub receipt_path: PathBuf,
    pub verification_epoch: Option<i64>,
}

impl ProveRequest {
    /// Reads the documents, proves, and writes the receipt. Nothing is
    /// written unless proving succeeds.
    pub fn execute(
        &self,
        prover: &Prover,
        cancel: &CancellationToken,
    ) -> Result<ProofOutcome, RequestError> {
        let witness = encode_witness(
            read(&self.licence_path)?,
            read(&self.passport_path)?,
            read(&self.authority_key_path)?,
        )?;
        let public = PublicInputs {
            conflict_zones: read_zones(&self.conflict_zones_path)?,
            verification_epoch: self.verification_epoch,
        };

        let outcome = prover.prove_with_cancellation(&witness, &public, cancel)?;
        write(&self.receipt_path, &outcome.receipt.to_bytes())?;
        info!(path = %self.receipt_path.display(), "receipt written");
        Ok(outcome)
    }
}

/// A receipt to check, with optional public inputs to cross-check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyRequest {
    pub receipt_path: PathBuf,
    pub conflict_zones_path: Option<PathBuf>,
    pub authority_key_path: Option<PathBuf>,
}

impl VerifyRequest {
    pub fn execute(&self, config: VerifierConfig) -> Result<Verification, RequestError> {
        let mut config = config;
        if let Some(path) = &self.conflict_zones_path {
            config = config.with_conflict_zones(read_zones(path)?);
        }
        if let Some(path) = &self.authority_key_path {
            let key = read_text(path)?;
            config = config.with_expected_authority(fingerprint_of_raw(&key));
        }

        let bytes = read(&self.receipt_path)?;
        Ok(Verifier::new(config).verify_bytes(bytes)?)
    }
}

pub fn read(path: &Path) -> Result<Vec<u8>, RequestError> {
    fs::read(path).map_err(|e| RequestError::io(path, e))
}

pub fn read_text(path: &Path) -> Result<String, RequestError> {
    String::from_utf8(read(path)?).map_err(|_| RequestError::InvalidInput {
        path: path.to_path_buf(),
        reason: "not UTF-8".to_string(),
    })
}

pub fn read_zones(path: &Path) -> Result<ConflictZoneList, RequestError> {
    ConflictZoneList::from_json(&read_text(path)?).map_err(|e| RequestError::InvalidInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn write(path: &Path, bytes: &[u8]) -> Result<(), RequestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RequestError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| RequestError::io(path, e))
}
