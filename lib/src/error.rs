use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("key is not a JSON object: {0}")]
    InvalidJson(String),

    #[error("key is missing required member `{0}`")]
    MissingMember(&'static str),

    #[error("invalid key material in `{member}`: {reason}")]
    InvalidMaterial {
        member: &'static str,
        reason: String,
    },

    #[error("private key does not match the public key")]
    KeyPairMismatch,

    #[error("invalid PEM key: {0}")]
    InvalidPem(String),

    #[error("operation requires a private key")]
    NotPrivate,

    #[error("unsupported key algorithm: {0}")]
    Unsupported(String),
}

/// Structural problems with a signed claim set (`MalformedClaimSet`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimSetError {
    #[error("not a compact JWS: {0}")]
    Encoding(String),

    #[error("invalid header: {0}")]
    Header(String),

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("expected a {expected} claim set, found {found}")]
    WrongKind {
        expected: &'static str,
        found: String,
    },

    #[error("missing claim `{0}`")]
    MissingClaim(&'static str),

    #[error("unexpected claim `{0}`")]
    UnexpectedClaim(String),

    #[error("claim `{claim}` is ill-formed: {reason}")]
    InvalidClaim {
        claim: &'static str,
        reason: String,
    },

    #[error("claims are not in canonical order")]
    OutOfOrder,

    #[error("encoding is not canonical")]
    NonCanonical,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed claim set: {0}")]
    MalformedClaimSet(#[from] ClaimSetError),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature does not verify")]
    SignatureMismatch,

    #[error("invalid key: {0}")]
    InvalidKey(KeyError),
}

impl SignatureError {
    /// Stable, machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            SignatureError::MalformedClaimSet(_) => "MalformedClaimSet",
            SignatureError::UnsupportedAlgorithm(_) => "UnsupportedAlgorithm",
            SignatureError::SignatureMismatch => "SignatureMismatch",
            SignatureError::InvalidKey(_) => "InvalidKey",
        }
    }
}

impl From<KeyError> for SignatureError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::Unsupported(tag) => SignatureError::UnsupportedAlgorithm(tag),
            other => SignatureError::InvalidKey(other),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    #[error("public outputs do not decode: {0}")]
    Decode(String),

    #[error("public outputs are not canonically encoded")]
    NonCanonical,
}
