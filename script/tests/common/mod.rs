#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use product_passport_lib::{
    ConflictZoneList, Credential, EmbeddedKey, Key, MiningLicence, ProductPassport, PublicInputs,
    Witness,
};

/// Authority K_a, company Acme with K_c, licence for Cornwall valid
/// 2025-01-01..2035-01-01, passport for shipment 42 of Lithium.
pub struct Scenario {
    pub authority: Key,
    pub company: Key,
    pub licence: MiningLicence,
    pub passport: ProductPassport,
}

pub fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

impl Scenario {
    pub fn new() -> Self {
        let authority = Key::ed25519_from_secret(&[0xa1; 32]);
        let company = Key::ed25519_from_secret(&[0xc2; 32]);
        let licence = MiningLicence {
            issuer_id: "National_Mining_Authority".to_string(),
            subject_id: "Acme".to_string(),
            issue_date: date(2025, 1, 1),
            expiry_date: date(2035, 1, 1),
            country_of_operation: "GB".to_string(),
            region_of_operation: "Cornwall".to_string(),
            subject_public_key: EmbeddedKey::new(&company),
        };
        let passport = ProductPassport {
            shipment_id: "42".to_string(),
            issue_date: date(2025, 6, 1),
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

    pub fn licence_token(&self, signer: &Key) -> String {
        Credential::Licence(self.licence.clone())
            .issue(signer)
            .unwrap()
            .to_token()
    }

    pub fn passport_token(&self) -> String {
        Credential::Passport(self.passport.clone())
            .issue(&self.company)
            .unwrap()
            .to_token()
    }

    pub fn authority_jwk(&self) -> String {
        self.authority.to_public_jwk()
    }

    pub fn witness(&self) -> Witness {
        Witness {
            licence: self.licence_token(&self.authority),
            passport: self.passport_token(),
            authority_public_key: self.authority_jwk(),
        }
    }
}

pub fn public_inputs(regions: &[&str]) -> PublicInputs {
    PublicInputs {
        conflict_zones: ConflictZoneList::from_regions(regions.iter().copied()),
        verification_epoch: None,
    }
}
