use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use product_passport_lib::{ConflictZoneList, Fingerprint};

pub const PROOF_MODE_ENV: &str = "PASSPORT_PROOF_MODE";
pub const PROVE_TIMEOUT_ENV: &str = "PASSPORT_PROVE_TIMEOUT_SECS";

const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ProofMode {
    #[default]
    Secure,
    /// Native execution sealed with a digest. Not a zero-knowledge proof.
    Development,
}

impl ProofMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofMode::Secure => "secure",
            ProofMode::Development => "development",
        }
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, ProofMode::Development)
    }
}

impl fmt::Display for ProofMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secure" => Ok(ProofMode::Secure),
            "development" | "dev" => Ok(ProofMode::Development),
            other => Err(format!(
                "unknown proof mode `{other}` (expected `secure` or `development`)"
            )),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProverConfig {
    pub mode: ProofMode,
    /// Abandon the proof after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ProverConfig {
    pub fn new(mode: ProofMode) -> Self {
        Self {
            mode,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierConfig {
    /// `Secure` accepts only zkVM receipts; `Development` also accepts
    /// development seals.
    pub mode: ProofMode,
    pub expected_authority: Option<Fingerprint>,
    pub conflict_zones: Option<ConflictZoneList>,
    pub timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            mode: ProofMode::Secure,
            expected_authority: None,
            conflict_zones: None,
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}

impl VerifierConfig {
    pub fn new(mode: ProofMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_expected_authority(mut self, fingerprint: Fingerprint) -> Self {
        self.expected_authority = Some(fingerprint);
        self
    }

    pub fn with_conflict_zones(mut self, zones: ConflictZoneList) -> Self {
        self.conflict_zones = Some(zones);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_is_the_default() {
        assert_eq!(ProofMode::default(), ProofMode::Secure);
        assert_eq!(ProverConfig::default().mode, ProofMode::Secure);
        assert_eq!(VerifierConfig::default().mode, ProofMode::Secure);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("Development".parse(), Ok(ProofMode::Development));
        assert_eq!(" dev ".parse(), Ok(ProofMode::Development));
        assert_eq!("secure".parse(), Ok(ProofMode::Secure));
        assert!("fast".parse::<ProofMode>().is_err());
    }
}
