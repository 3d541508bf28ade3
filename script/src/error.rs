use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProveError {
    #[error("witness cannot be encoded: {0}")]
    WitnessEncoding(String),

    #[error("proof backend failed: {0}")]
    ProverBackend(String),

    #[error("proving was cancelled")]
    Cancelled,

    #[error("proving timed out after {0:?}")]
    TimedOut(Duration),
}

impl ProveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProveError::WitnessEncoding(_) => "WitnessEncodingError",
            ProveError::ProverBackend(_) => "ProverBackendError",
            ProveError::Cancelled => "Cancelled",
            ProveError::TimedOut(_) => "TimedOut",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed receipt: {0}")]
    MalformedReceipt(String),

    #[error("proof check failed: {0}")]
    ProofCheckFailed(String),

    #[error("receipt was produced with a different authority key")]
    AuthorityMismatch,

    #[error("receipt was produced against a different conflict-zone list")]
    ZoneListMismatch,

    #[error("no backend in this build can check {0} receipts")]
    BackendUnavailable(&'static str),

    #[error("verification timed out after {0:?}")]
    TimedOut(Duration),
}

impl VerifyError {
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::MalformedReceipt(_) => "MalformedReceipt",
            VerifyError::ProofCheckFailed(_) => "ProofCheckFailed",
            VerifyError::AuthorityMismatch => "AuthorityMismatch",
            VerifyError::ZoneListMismatch => "ZoneListMismatch",
            VerifyError::BackendUnavailable(_) => "BackendUnavailable",
            VerifyError::TimedOut(_) => "TimedOut",
        }
    }
}

/// Failure of a file-addressed request.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input {}: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error(transparent)]
    Prove(#[from] ProveError),

    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Io { .. } => "Io",
            RequestError::InvalidInput { .. } => "InvalidInput",
            RequestError::Prove(err) => err.kind(),
            RequestError::Verify(err) => err.kind(),
        }
    }

    /// 1 for prover or verifier errors, 2 for I/O and input problems.
    pub fn exit_code(&self) -> i32 {
        match self {
            RequestError::Io { .. } | RequestError::InvalidInput { .. } => 2,
            RequestError::Prove(_) | RequestError::Verify(_) => 1,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RequestError::Io {
            path: path.into(),
            source,
        }
    }
}
