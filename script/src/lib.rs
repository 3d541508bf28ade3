pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod prover;
pub mod receipt;
pub mod request;
pub mod utils;
pub mod verifier;

pub use backend::{DevBackend, ProofBackend};
pub use cancel::CancellationToken;
pub use config::{ProofMode, ProverConfig, VerifierConfig};
pub use error::{ProveError, RequestError, VerifyError};
pub use prover::{ProofOutcome, Prover};
pub use receipt::{BackendKind, Receipt};
pub use request::{ProveRequest, VerifyRequest};
pub use verifier::{Verdict, Verification, Verifier};
