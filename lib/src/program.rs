use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::{self, ChainBroken};
use crate::claims::{self, ClaimSetKind};
use crate::error::SignatureError;
use crate::journal::{Journal, PublicOutputs};
use crate::keys::{fingerprint_of_raw, Key};
use crate::signature::{verify_licence, verify_passport};
use crate::zones::{ConflictZoneList, ZoneStatus};

/// Private inputs. Never committed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    pub licence: String,
    pub passport: String,
    pub authority_public_key: String,
}

/// Public inputs, echoed in the committed outputs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PublicInputs {
    pub conflict_zones: ConflictZoneList,
    /// Unix seconds.
    pub verification_epoch: Option<i64>,
}

/// The first check that failed. Stays on the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    #[error("authority key: {0}")]
    AuthorityKey(SignatureError),

    #[error("licence: {0}")]
    Licence(SignatureError),

    #[error("passport: {0}")]
    Passport(SignatureError),

    #[error("chain broken: {0}")]
    Chain(#[from] ChainBroken),

    #[error("region of operation is a listed conflict zone")]
    ConflictZone,

    #[error("verification epoch is out of range")]
    InvalidEpoch,
}

impl CheckFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckFailure::AuthorityKey(err)
            | CheckFailure::Licence(err)
            | CheckFailure::Passport(err) => err.kind(),
            CheckFailure::Chain(err) => err.kind(),
            CheckFailure::ConflictZone => "ConflictZone",
            CheckFailure::InvalidEpoch => "InvalidEpoch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub outputs: PublicOutputs,
    pub failure: Option<CheckFailure>,
}

impl Evaluation {
    pub fn is_valid(&self) -> bool {
        self.outputs.journal.valid
    }
}

/// Runs every check and always produces public outputs.
pub fn evaluate(witness: &Witness, public: &PublicInputs) -> Evaluation {
    let failure = run_checks(witness, public).err();
    match &failure {
        None => tracing::debug!("credential chain holds"),
        Some(failure) => tracing::debug!(kind = failure.kind(), "credential chain rejected"),
    }

    let journal = Journal {
        valid: failure.is_none(),
        authority_key_fingerprint: fingerprint_of_raw(&witness.authority_public_key),
        shipment_id: claims::peek_claim(
            &witness.passport,
            ClaimSetKind::ProductPassport,
            claims::SHIPMENT_ID,
        )
        .unwrap_or_default(),
    };
    Evaluation {
        outputs: PublicOutputs {
            journal,
            conflict_zone_commitment: public.conflict_zones.commitment(),
            verification_epoch: public.verification_epoch,
        },
        failure,
    }
}

fn run_checks(witness: &Witness, public: &PublicInputs) -> Result<(), CheckFailure> {
    let epoch = public
        .verification_epoch
        .map(|secs| DateTime::<Utc>::from_timestamp(secs, 0).ok_or(CheckFailure::InvalidEpoch))
        .transpose()?;

    let authority_key = Key::from_jwk(witness.authority_public_key.trim())
        .map_err(|e| CheckFailure::AuthorityKey(e.into()))?;

    // 1. Licence against the authority key
    let licence = verify_licence(&witness.licence, &authority_key)
        .map_err(CheckFailure::Licence)?
        .claims;
    tracing::debug!("licence signature verified");

    // 2. Passport against the licence's subject key
    let passport = verify_passport(&witness.passport, licence.subject_public_key())
        .map_err(CheckFailure::Passport)?;
    tracing::debug!("passport signature verified");

    // 3. Chain linkage
    chain::link(&licence, &passport, epoch)?;

    // 4. Conflict zones
    match public.conflict_zones.check(&licence.region_of_operation) {
        ZoneStatus::Clear => Ok(()),
        ZoneStatus::Flagged => Err(CheckFailure::ConflictZone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Credential, EmbeddedKey, MiningLicence, ProductPassport};
    use chrono::TimeZone;

    struct Fixture {
        authority: Key,
        company: Key,
        licence: MiningLicence,
        passport: ProductPassport,
    }

    impl Fixture {
        fn new() -> Self {
            let authority = Key::ed25519_from_secret(&[1u8; 32]);
            let company = Key::ed25519_from_secret(&[2u8; 32]);
            let licence = MiningLicence {
                issuer_id: "National_Mining_Authority".to_string(),
                subject_id: "Acme".to_string(),
                issue_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                expiry_date: Utc.with_ymd_and_hms(2035, 1, 1, 0, 0, 0).unwrap(),
                country_of_operation: "GB".to_string(),
                region_of_operation: "Cornwall".to_string(),
                subject_public_key: EmbeddedKey::new(&company),
            };
            let passport = ProductPassport {
                shipment_id: "42".to_string(),
                issue_date: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
                product: "Lithium".to_string(),
                issuer_id: None,
            };
            Self {
                authority,
                company,
                licence,
                passport,
            }
        }

        fn witness(&self) -> Witness {
            self.witness_signed_by(&self.authority)
        }

        fn witness_signed_by(&self, licence_signer: &Key) -> Witness {
            Witness {
                licence: Credential::Licence(self.licence.clone())
                    .issue(licence_signer)
                    .unwrap()
                    .to_token(),
                passport: Credential::Passport(self.passport.clone())
                    .issue(&self.company)
                    .unwrap()
                    .to_token(),
                authority_public_key: self.authority.to_public_jwk(),
            }
        }
    }

    fn zones(regions: &[&str]) -> PublicInputs {
        PublicInputs {
            conflict_zones: ConflictZoneList::from_regions(regions.iter().copied()),
            verification_epoch: None,
        }
    }

    #[test]
    fn valid_chain_produces_valid_journal() {
        let fixture = Fixture::new();
        let public = zones(&["Donetsk", "Darfur"]);
        let evaluation = evaluate(&fixture.witness(), &public);

        assert_eq!(evaluation.failure, None);
        let journal = &evaluation.outputs.journal;
        assert!(journal.valid);
        assert_eq!(journal.shipment_id, "42");
        assert_eq!(
            journal.authority_key_fingerprint,
            fixture.authority.fingerprint()
        );
        assert_eq!(
            evaluation.outputs.conflict_zone_commitment,
            public.conflict_zones.commitment()
        );
    }

    #[test]
    fn listed_region_is_invalid_not_an_error() {
        let fixture = Fixture::new();
        let evaluation = evaluate(&fixture.witness(), &zones(&["Cornwall"]));
        assert!(!evaluation.is_valid());
        assert_eq!(evaluation.failure, Some(CheckFailure::ConflictZone));
        assert_eq!(evaluation.outputs.journal.shipment_id, "42");
    }

    #[test]
    fn licence_signed_by_other_key_is_invalid() {
        let fixture = Fixture::new();
        let impostor = Key::ed25519_from_secret(&[9u8; 32]);
        let evaluation = evaluate(&fixture.witness_signed_by(&impostor), &zones(&[]));
        assert!(!evaluation.is_valid());
        assert_eq!(
            evaluation.failure,
            Some(CheckFailure::Licence(SignatureError::SignatureMismatch))
        );
        assert_eq!(
            evaluation.outputs.journal.authority_key_fingerprint,
            fixture.authority.fingerprint()
        );
    }

    #[test]
    fn expired_licence_breaks_chain() {
        let mut fixture = Fixture::new();
        fixture.passport.issue_date = Utc.with_ymd_and_hms(2036, 1, 1, 0, 0, 0).unwrap();
        let evaluation = evaluate(&fixture.witness(), &zones(&[]));
        assert_eq!(
            evaluation.failure,
            Some(CheckFailure::Chain(ChainBroken::IssuedAfterExpiry))
        );
        assert_eq!(evaluation.failure.unwrap().kind(), "ChainBroken");
    }

    #[test]
    fn passport_signed_by_other_company_is_invalid() {
        let mut fixture = Fixture::new();
        fixture.company = Key::ed25519_from_secret(&[3u8; 32]);
        let evaluation = evaluate(&fixture.witness(), &zones(&[]));
        assert_eq!(
            evaluation.failure,
            Some(CheckFailure::Passport(SignatureError::SignatureMismatch))
        );
    }

    #[test]
    fn garbage_witness_still_yields_journal() {
        let witness = Witness {
            licence: "garbage".to_string(),
            passport: "garbage".to_string(),
            authority_public_key: "not a key".to_string(),
        };
        let evaluation = evaluate(&witness, &zones(&[]));
        assert!(!evaluation.is_valid());
        assert_eq!(evaluation.outputs.journal.shipment_id, "");
        assert_eq!(evaluation.failure.unwrap().kind(), "InvalidKey");
    }

    #[test]
    fn epoch_is_committed_and_enforced() {
        let fixture = Fixture::new();
        let mut public = zones(&[]);
        let before_issue = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        public.verification_epoch = Some(before_issue.timestamp());

        let evaluation = evaluate(&fixture.witness(), &public);
        assert_eq!(
            evaluation.failure,
            Some(CheckFailure::Chain(ChainBroken::PostDated))
        );
        assert_eq!(
            evaluation.outputs.verification_epoch,
            Some(before_issue.timestamp())
        );
    }

    #[test]
    fn out_of_range_epoch_is_invalid() {
        let fixture = Fixture::new();
        let mut public = zones(&[]);
        public.verification_epoch = Some(i64::MAX);
        let evaluation = evaluate(&fixture.witness(), &public);
        assert_eq!(evaluation.failure, Some(CheckFailure::InvalidEpoch));
    }
}
