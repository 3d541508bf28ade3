use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use product_passport_lib::keys::has_private_members;
use product_passport_lib::{evaluate, Evaluation, PublicInputs, Witness};
use tracing::{debug, info, warn};

use crate::backend::{backend_for_mode, ProofBackend, ProvedOutputs};
use crate::cancel::CancellationToken;
use crate::config::ProverConfig;
use crate::error::ProveError;
use crate::receipt::Receipt;

pub const MAX_TOKEN_LEN: usize = 64 * 1024;
pub const MAX_KEY_LEN: usize = 16 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Debug)]
pub struct ProofOutcome {
    pub receipt: Receipt,
    /// Host-only diagnostics. The failure reason is never committed.
    pub preflight: Evaluation,
}

pub fn encode_witness(
    licence: Vec<u8>,
    passport: Vec<u8>,
    authority_public_key: Vec<u8>,
) -> Result<Witness, ProveError> {
    let witness = Witness {
        licence: utf8("licence", licence)?,
        passport: utf8("passport", passport)?,
        authority_public_key: utf8("authority key", authority_public_key)?,
    };
    validate_witness(&witness)?;
    Ok(witness)
}

pub fn validate_witness(witness: &Witness) -> Result<(), ProveError> {
    check_len("licence", &witness.licence, MAX_TOKEN_LEN)?;
    check_len("passport", &witness.passport, MAX_TOKEN_LEN)?;
    check_len("authority key", &witness.authority_public_key, MAX_KEY_LEN)?;
    if has_private_members(&witness.authority_public_key) {
        return Err(ProveError::WitnessEncoding(
            "authority key contains private material".to_string(),
        ));
    }
    Ok(())
}

pub struct Prover {
    config: ProverConfig,
    backend: Arc<dyn ProofBackend>,
}

impl Prover {
    /// Prover for the configured mode. A secure mode without a zkVM
    /// backend is an error.
    pub fn new(config: ProverConfig) -> Result<Self, ProveError> {
        let backend = backend_for_mode(config.mode)?;
        Ok(Self { config, backend })
    }

    pub fn with_backend(config: ProverConfig, backend: Arc<dyn ProofBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    pub fn prove(&self, witness: &Witness, public: &PublicInputs) -> Result<ProofOutcome, ProveError> {
        self.prove_with_cancellation(witness, public, &CancellationToken::new())
    }

    /// Proves, giving up when `cancel` fires or the configured timeout
    /// passes. The backend is told to stop, and whatever it still returns
    /// is discarded.
    pub fn prove_with_cancellation(
        &self,
        witness: &Witness,
        public: &PublicInputs,
        cancel: &CancellationToken,
    ) -> Result<ProofOutcome, ProveError> {
        validate_witness(witness)?;
        if cancel.is_cancelled() {
            return Err(ProveError::Cancelled);
        }

        let preflight = evaluate(witness, public);
        match &preflight.failure {
            None => debug!("preflight: chain holds"),
            Some(failure) => warn!(
                kind = failure.kind(),
                "preflight: chain does not hold, proving the failed attempt"
            ),
        }
        if self.config.mode.is_insecure() {
            warn!("development mode: the receipt will not be a zero-knowledge proof");
        }

        let start = Instant::now();
        info!(backend = self.backend.kind().as_str(), "proving");
        let proved = self.run_backend(witness, public, cancel, start)?;

        if proved.public_values != preflight.outputs.abi_encode() {
            return Err(ProveError::ProverBackend(
                "backend outputs differ from native execution".to_string(),
            ));
        }
        let receipt = Receipt::new(self.backend.kind(), proved.public_values, proved.proof)
            .map_err(|e| ProveError::ProverBackend(e.to_string()))?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            proof_len = receipt.proof().len(),
            "proof generated"
        );
        Ok(ProofOutcome { receipt, preflight })
    }

    fn run_backend(
        &self,
        witness: &Witness,
        public: &PublicInputs,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<ProvedOutputs, ProveError> {
        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        let witness = witness.clone();
        let public = public.clone();
        // Owned by this run, so a timeout never fires the caller's token.
        let run = CancellationToken::new();
        let worker_run = run.clone();
        thread::Builder::new()
            .name("prover".to_string())
            .spawn(move || {
                // The receiver is gone if the caller gave up.
                let _ = tx.send(backend.prove(&witness, &public, &worker_run));
            })
            .map_err(|e| ProveError::ProverBackend(e.to_string()))?;

        loop {
            if cancel.is_cancelled() {
                warn!("proving cancelled");
                run.cancel();
                return Err(ProveError::Cancelled);
            }
            if let Some(timeout) = self.config.timeout {
                if start.elapsed() >= timeout {
                    warn!(?timeout, "proving timed out");
                    run.cancel();
                    return Err(ProveError::TimedOut(timeout));
                }
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ProveError::ProverBackend(
                        "prover worker stopped without a result".to_string(),
                    ))
                }
            }
        }
    }
}

fn utf8(name: &str, bytes: Vec<u8>) -> Result<String, ProveError> {
    String::from_utf8(bytes).map_err(|_| ProveError::WitnessEncoding(format!("{name} is not UTF-8")))
}

fn check_len(name: &str, value: &str, max: usize) -> Result<(), ProveError> {
    if value.trim().is_empty() {
        return Err(ProveError::WitnessEncoding(format!("{name} is empty")));
    }
    if value.len() > max {
        return Err(ProveError::WitnessEncoding(format!(
            "{name} exceeds {max} bytes"
        )));
    }
    Ok(())
}
