use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::claims::{MiningLicence, ProductPassport};
use crate::keys::Fingerprint;
use crate::signature::Verified;

/// Which link of the chain failed. Carries no claim text.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainBroken {
    #[error("passport was not signed by the licensed company's key")]
    SignerMismatch,

    #[error("passport issuer is not the licence subject")]
    IssuerMismatch,

    #[error("passport was issued before the licence became valid")]
    IssuedBeforeValidity,

    #[error("passport was issued on or after licence expiry")]
    IssuedAfterExpiry,

    #[error("passport is dated after the verification epoch")]
    PostDated,
}

impl ChainBroken {
    pub fn kind(&self) -> &'static str {
        "ChainBroken"
    }

    pub fn condition(&self) -> &'static str {
        match self {
            ChainBroken::SignerMismatch => "signer",
            ChainBroken::IssuerMismatch => "issuer",
            ChainBroken::IssuedBeforeValidity => "not-yet-valid",
            ChainBroken::IssuedAfterExpiry => "expired",
            ChainBroken::PostDated => "post-dated",
        }
    }
}

/// Links a verified passport to a verified licence.
///
/// The passport must be signed by the licence's subject key, name the
/// licence subject as issuer when it names one, and be issued within
/// `[issue_date, expiry_date)`. With an epoch, it must also not be
/// issued after that instant.
pub fn link(
    licence: &MiningLicence,
    passport: &Verified<ProductPassport>,
    epoch: Option<DateTime<Utc>>,
) -> Result<(), ChainBroken> {
    if passport.signer != company_fingerprint(licence) {
        return Err(ChainBroken::SignerMismatch);
    }
    if let Some(issuer_id) = &passport.claims.issuer_id {
        if *issuer_id != licence.subject_id {
            return Err(ChainBroken::IssuerMismatch);
        }
    }

    let issued = passport.claims.issue_date;
    if issued < licence.issue_date {
        return Err(ChainBroken::IssuedBeforeValidity);
    }
    if issued >= licence.expiry_date {
        return Err(ChainBroken::IssuedAfterExpiry);
    }
    if let Some(epoch) = epoch {
        if issued > epoch {
            return Err(ChainBroken::PostDated);
        }
    }
    Ok(())
}

fn company_fingerprint(licence: &MiningLicence) -> Fingerprint {
    licence.subject_public_key().fingerprint()
}
