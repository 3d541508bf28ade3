use std::sync::Arc;

use product_passport_lib::{evaluate, PublicInputs, Witness};
use sha2::{Digest, Sha256};

use crate::cancel::CancellationToken;
use crate::config::ProofMode;
use crate::error::{ProveError, VerifyError};
use crate::receipt::{BackendKind, Receipt};

/// Identifies the program a development seal vouches for.
pub const DEV_PROGRAM_ID: &[u8] = b"product-passport-program/v1";
const DEV_SEAL_DOMAIN: &[u8] = b"product-passport/dev-seal/v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvedOutputs {
    pub public_values: Vec<u8>,
    pub proof: Vec<u8>,
}

pub trait ProofBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Runs the program over the inputs. Blocks until done, or returns
    /// `Cancelled` at the first point it can stop once `cancel` fires.
    fn prove(
        &self,
        witness: &Witness,
        public: &PublicInputs,
        cancel: &CancellationToken,
    ) -> Result<ProvedOutputs, ProveError>;

    fn verify(&self, receipt: &Receipt) -> Result<(), VerifyError>;
}

/// Backend producing receipts of the requested mode. Never falls back to
/// a weaker one.
pub fn backend_for_mode(mode: ProofMode) -> Result<Arc<dyn ProofBackend>, ProveError> {
    match mode {
        ProofMode::Development => Ok(Arc::new(DevBackend)),
        ProofMode::Secure => secure_backend()
            .ok_or_else(|| ProveError::ProverBackend("built without the zkVM backend".to_string())),
    }
}

pub fn backend_for_receipt(kind: BackendKind) -> Option<Arc<dyn ProofBackend>> {
    match kind {
        BackendKind::Development => Some(Arc::new(DevBackend)),
        BackendKind::Sp1 => secure_backend(),
    }
}

#[cfg(feature = "sp1")]
fn secure_backend() -> Option<Arc<dyn ProofBackend>> {
    Some(Arc::new(sp1::Sp1Backend))
}

#[cfg(not(feature = "sp1"))]
fn secure_backend() -> Option<Arc<dyn ProofBackend>> {
    None
}

/// Executes the program natively and seals the outputs with a digest.
///
/// Anyone can forge these seals. They only catch accidental corruption.
#[derive(Clone, Copy, Debug, Default)]
pub struct DevBackend;

impl DevBackend {
    pub fn seal(public_values: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(DEV_SEAL_DOMAIN);
        hasher.update(DEV_PROGRAM_ID);
        hasher.update(Sha256::digest(public_values));
        hasher.finalize().into()
    }
}

impl ProofBackend for DevBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Development
    }

    fn prove(
        &self,
        witness: &Witness,
        public: &PublicInputs,
        cancel: &CancellationToken,
    ) -> Result<ProvedOutputs, ProveError> {
        cancel.check()?;
        let public_values = evaluate(witness, public).outputs.abi_encode();
        let proof = Self::seal(&public_values).to_vec();
        Ok(ProvedOutputs {
            public_values,
            proof,
        })
    }

    fn verify(&self, receipt: &Receipt) -> Result<(), VerifyError> {
        if receipt.proof() != Self::seal(receipt.public_values()).as_slice() {
            return Err(VerifyError::ProofCheckFailed(
                "development seal does not match public values".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "sp1")]
pub mod sp1 {
    use product_passport_lib::{PublicInputs, Witness};
    use sp1_sdk::{include_elf, HashableKey, ProverClient, SP1ProofWithPublicValues, SP1Stdin};

    use super::{ProofBackend, ProvedOutputs};
    use crate::cancel::CancellationToken;
    use crate::error::{ProveError, VerifyError};
    use crate::receipt::{BackendKind, Receipt};

    pub const PRODUCT_PASSPORT_ELF: &[u8] = include_elf!("product-passport-program");

    /// Compressed SP1 proofs, configured by the `SP1_PROVER` environment.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Sp1Backend;

    pub fn program_vkey_hash() -> String {
        let client = ProverClient::from_env();
        let (_, vk) = client.setup(PRODUCT_PASSPORT_ELF);
        vk.bytes32()
    }

    impl ProofBackend for Sp1Backend {
        fn kind(&self) -> BackendKind {
            BackendKind::Sp1
        }

        fn prove(
            &self,
            witness: &Witness,
            public: &PublicInputs,
            cancel: &CancellationToken,
        ) -> Result<ProvedOutputs, ProveError> {
            cancel.check()?;
            let client = ProverClient::from_env();
            let (pk, _vk) = client.setup(PRODUCT_PASSPORT_ELF);

            let mut stdin = SP1Stdin::new();
            stdin.write(witness);
            stdin.write(public);

            // Proving itself cannot be interrupted, so stop before it starts.
            cancel.check()?;

            let proof = client
                .prove(&pk, &stdin)
                .compressed()
                .run()
                .map_err(|e| ProveError::ProverBackend(e.to_string()))?;
            let public_values = proof.public_values.to_vec();
            let proof = serde_json::to_vec(&proof)
                .map_err(|e| ProveError::ProverBackend(e.to_string()))?;
            Ok(ProvedOutputs {
                public_values,
                proof,
            })
        }

        fn verify(&self, receipt: &Receipt) -> Result<(), VerifyError> {
            let proof: SP1ProofWithPublicValues = serde_json::from_slice(receipt.proof())
                .map_err(|e| VerifyError::ProofCheckFailed(e.to_string()))?;
            if proof.public_values.as_slice() != receipt.public_values() {
                return Err(VerifyError::ProofCheckFailed(
                    "proof commits to different public values".to_string(),
                ));
            }

            let client = ProverClient::from_env();
            let (_, vk) = client.setup(PRODUCT_PASSPORT_ELF);
            client
                .verify(&proof, &vk)
                .map_err(|e| VerifyError::ProofCheckFailed(e.to_string()))
        }
    }
}
