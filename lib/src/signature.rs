use crate::claims::{ClaimSetKind, Credential, MiningLicence, ProductPassport, SignedClaimSet};
use crate::error::{ClaimSetError, SignatureError};
use crate::keys::{Fingerprint, Key, KeyAlgorithm};

/// A credential whose signature checked out, and who signed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<T> {
    pub claims: T,
    pub signer: Fingerprint,
}

/// Checks `token` as a claim set of `kind` signed by `key`.
///
/// Failures are reported in a fixed order: framing, then key algorithm,
/// then the signature over the exact signed bytes, and only then the
/// claim names, order and formats.
pub fn verify_signature(
    token: &str,
    kind: ClaimSetKind,
    key: &Key,
) -> Result<Verified<Credential>, SignatureError> {
    let signed = SignedClaimSet::parse(token)?;
    if let Some(found) = signed.kind().filter(|found| *found != kind) {
        return Err(ClaimSetError::WrongKind {
            expected: kind.as_str(),
            found: found.as_str().to_string(),
        }
        .into());
    }

    if let KeyAlgorithm::Unsupported(tag) = key.algorithm() {
        return Err(SignatureError::UnsupportedAlgorithm(tag));
    }
    match signed.algorithm() {
        KeyAlgorithm::Unsupported(alg) => return Err(SignatureError::UnsupportedAlgorithm(alg)),
        // A header naming a different algorithm than the key cannot verify.
        alg if alg != key.algorithm() => return Err(SignatureError::SignatureMismatch),
        _ => {}
    }

    key.verify(signed.signing_input(), signed.signature())?;

    let claims = Credential::from_claim_set(kind, signed.claims())?;
    Ok(Verified {
        claims,
        signer: key.fingerprint(),
    })
}

pub fn verify_licence(
    token: &str,
    authority_key: &Key,
) -> Result<Verified<MiningLicence>, SignatureError> {
    let verified = verify_signature(token, ClaimSetKind::MiningLicence, authority_key)?;
    match verified.claims {
        Credential::Licence(licence) => Ok(Verified {
            claims: licence,
            signer: verified.signer,
        }),
        Credential::Passport(_) => Err(wrong_kind(ClaimSetKind::MiningLicence)),
    }
}

pub fn verify_passport(
    token: &str,
    company_key: &Key,
) -> Result<Verified<ProductPassport>, SignatureError> {
    let verified = verify_signature(token, ClaimSetKind::ProductPassport, company_key)?;
    match verified.claims {
        Credential::Passport(passport) => Ok(Verified {
            claims: passport,
            signer: verified.signer,
        }),
        Credential::Licence(_) => Err(wrong_kind(ClaimSetKind::ProductPassport)),
    }
}

fn wrong_kind(expected: ClaimSetKind) -> SignatureError {
    let found = match expected {
        ClaimSetKind::MiningLicence => ClaimSetKind::ProductPassport,
        ClaimSetKind::ProductPassport => ClaimSetKind::MiningLicence,
    };
    ClaimSetError::WrongKind {
        expected: expected.as_str(),
        found: found.as_str().to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ClaimSet, EmbeddedKey};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::{TimeZone, Utc};

    fn authority() -> Key {
        Key::ed25519_from_secret(&[1u8; 32])
    }

    fn company() -> Key {
        Key::ed25519_from_secret(&[2u8; 32])
    }

    fn licence_token() -> String {
        let licence = MiningLicence {
            issuer_id: "National_Mining_Authority".to_string(),
            subject_id: "ACME_Mining_Company".to_string(),
            issue_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            expiry_date: Utc.with_ymd_and_hms(2035, 1, 1, 0, 0, 0).unwrap(),
            country_of_operation: "GB".to_string(),
            region_of_operation: "Cornwall".to_string(),
            subject_public_key: EmbeddedKey::new(&company()),
        };
        Credential::Licence(licence)
            .issue(&authority())
            .unwrap()
            .to_token()
    }

    fn passport_token() -> String {
        let passport = ProductPassport {
            shipment_id: "42".to_string(),
            issue_date: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            product: "Lithium".to_string(),
            issuer_id: None,
        };
        Credential::Passport(passport)
            .issue(&company())
            .unwrap()
            .to_token()
    }

    #[test]
    fn accepts_licence_signed_by_authority() {
        let verified = verify_licence(&licence_token(), &authority().to_public()).unwrap();
        assert_eq!(verified.claims.region_of_operation, "Cornwall");
        assert_eq!(verified.signer, authority().fingerprint());
        assert_eq!(
            verified.claims.subject_public_key().fingerprint(),
            company().fingerprint()
        );
    }

    #[test]
    fn rejects_licence_signed_by_other_key() {
        assert_eq!(
            verify_licence(&licence_token(), &company()),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn rejects_wrong_kind() {
        let err = verify_licence(&passport_token(), &company()).unwrap_err();
        assert_eq!(err.kind(), "MalformedClaimSet");
    }

    #[test]
    fn unsupported_key_is_reported_before_signature() {
        let ec = Key::from_jwk(r#"{"kty":"EC","crv":"P-256","x":"abc","y":"def"}"#).unwrap();
        let err = verify_passport(&passport_token(), &ec).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedAlgorithm");
    }

    #[test]
    fn header_algorithm_must_match_key() {
        let rsa = Key::from_text(include_str!("../tests/fixtures/issuer_private.pem")).unwrap();
        assert_eq!(
            verify_passport(&passport_token(), &rsa),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn rs256_credentials_verify() {
        let issuer = Key::from_text(include_str!("../tests/fixtures/issuer_private.pem")).unwrap();
        let licence = MiningLicence {
            issuer_id: "National_Mining_Authority".to_string(),
            subject_id: "ACME_Mining_Company".to_string(),
            issue_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            expiry_date: Utc.with_ymd_and_hms(2035, 1, 1, 0, 0, 0).unwrap(),
            country_of_operation: "GB".to_string(),
            region_of_operation: "Cornwall".to_string(),
            subject_public_key: EmbeddedKey::new(&company()),
        };
        let token = Credential::Licence(licence.clone())
            .issue(&issuer)
            .unwrap()
            .to_token();

        let verified = verify_licence(&token, &issuer.to_public()).unwrap();
        assert_eq!(verified.claims, licence);
        assert_eq!(verified.signer, issuer.fingerprint());
        assert_eq!(
            verify_licence(&token, &authority()),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn unsupported_header_algorithm_is_reported() {
        let token = passport_token();
        let parts: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD
            .encode(r#"{"alg":"ES256","cty":"product-passport","typ":"JWT"}"#);
        let forged = format!("{header}.{}.{}", parts[1], parts[2]);
        assert_eq!(
            verify_passport(&forged, &company()),
            Err(SignatureError::UnsupportedAlgorithm("ES256".to_string()))
        );
    }

    #[test]
    fn reordering_after_signing_breaks_signature() {
        let token = licence_token();
        let parts: Vec<&str> = token.split('.').collect();
        let mut claims: ClaimSet =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims.claims.swap(4, 5);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_string(&claims).unwrap());
        let forged = format!("{}.{payload}.{}", parts[0], parts[2]);

        assert_eq!(
            verify_licence(&forged, &authority()),
            Err(SignatureError::SignatureMismatch)
        );
    }

    #[test]
    fn properly_signed_out_of_order_claims_are_malformed() {
        let mut claims = ClaimSet::new();
        claims.add("issue_date", "2025-06-01T00:00:00Z");
        claims.add("shipment_id", "42");
        claims.add("product", "Lithium");
        let header = URL_SAFE_NO_PAD
            .encode(r#"{"alg":"EdDSA","cty":"product-passport","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_string(&claims).unwrap());
        let signing_input = format!("{header}.{payload}");
        let signature = company().sign(signing_input.as_bytes()).unwrap();
        let token = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature));

        assert_eq!(
            verify_passport(&token, &company()),
            Err(SignatureError::MalformedClaimSet(ClaimSetError::OutOfOrder))
        );
    }

    #[test]
    fn short_signature_is_a_mismatch() {
        let token = passport_token();
        let signing_input = token.rsplit_once('.').unwrap().0;
        let short = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode([0u8; 63]));
        assert_eq!(
            verify_passport(&short, &company()),
            Err(SignatureError::SignatureMismatch)
        );
    }
}
