// Signed claim sets: mining licences and product passports.
//
// A claim set travels as a compact JWS whose payload is an ordered list
// of `{key, value}` string pairs. Each credential kind fixes the order
// of its claims, and decoding re-encodes what it parsed and insists on
// byte equality, so every credential has exactly one accepted encoding.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClaimSetError, KeyError};
use crate::keys::{Key, KeyAlgorithm, KeyVisibility};

const TOKEN_TYPE: &str = "JWT";

// CLAIM NAMES

pub const ISSUER_ID: &str = "issuer_id";
pub const SUBJECT_ID: &str = "subject_id";
pub const SUBJECT_PK: &str = "subject_pk";
pub const ISSUE_DATE: &str = "issue_date";
pub const EXPIRY_DATE: &str = "expiry_date";
pub const COUNTRY_OF_OPERATION: &str = "country_of_operation";
pub const REGION_OF_OPERATION: &str = "region_of_operation";
pub const SHIPMENT_ID: &str = "shipment_id";
pub const PRODUCT: &str = "product";

// Canonical orders
const LICENCE_CLAIMS: [&str; 7] = [
    ISSUER_ID,
    SUBJECT_ID,
    ISSUE_DATE,
    EXPIRY_DATE,
    COUNTRY_OF_OPERATION,
    REGION_OF_OPERATION,
    SUBJECT_PK,
];
const PASSPORT_CLAIMS: [&str; 4] = [SHIPMENT_ID, ISSUE_DATE, PRODUCT, ISSUER_ID];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimSetKind {
    MiningLicence,
    ProductPassport,
}

impl ClaimSetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimSetKind::MiningLicence => "mining-licence",
            ClaimSetKind::ProductPassport => "product-passport",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mining-licence" => Some(ClaimSetKind::MiningLicence),
            "product-passport" => Some(ClaimSetKind::ProductPassport),
            _ => None,
        }
    }

    fn claim_order(&self) -> &'static [&'static str] {
        match self {
            ClaimSetKind::MiningLicence => &LICENCE_CLAIMS,
            ClaimSetKind::ProductPassport => &PASSPORT_CLAIMS,
        }
    }
}

impl fmt::Display for ClaimSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// DATA STRUCTURES

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claim {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimSet {
    pub claims: Vec<Claim>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.claims.push(Claim {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.key == key)
            .map(|claim| claim.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn to_json(&self) -> Result<String, ClaimSetError> {
        serde_json::to_string(self).map_err(|e| ClaimSetError::Payload(e.to_string()))
    }
}

/// A public key embedded as a claim value, with its exact text kept so
/// the claim set re-encodes to the signed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedKey {
    jwk: String,
    key: Key,
}

impl EmbeddedKey {
    pub fn new(key: &Key) -> Self {
        let key = key.to_public();
        Self {
            jwk: key.to_public_jwk(),
            key,
        }
    }

    fn parse(jwk: &str) -> Result<Self, ClaimSetError> {
        let key = Key::from_jwk(jwk).map_err(|e| ClaimSetError::InvalidClaim {
            claim: SUBJECT_PK,
            reason: e.to_string(),
        })?;
        if key.visibility() == KeyVisibility::Private {
            return Err(ClaimSetError::InvalidClaim {
                claim: SUBJECT_PK,
                reason: "embedded key must be public".to_string(),
            });
        }
        Ok(Self {
            jwk: jwk.to_string(),
            key,
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn jwk(&self) -> &str {
        &self.jwk
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningLicence {
    pub issuer_id: String,
    pub subject_id: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub country_of_operation: String,
    pub region_of_operation: String,
    pub subject_public_key: EmbeddedKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPassport {
    pub shipment_id: String,
    pub issue_date: DateTime<Utc>,
    pub product: String,
    // Richer variant: the company naming itself as issuer.
    pub issuer_id: Option<String>,
}

impl MiningLicence {
    pub fn to_claim_set(&self) -> ClaimSet {
        let mut claims = ClaimSet::new();
        claims.add(ISSUER_ID, &self.issuer_id);
        claims.add(SUBJECT_ID, &self.subject_id);
        claims.add(ISSUE_DATE, format_date(&self.issue_date));
        claims.add(EXPIRY_DATE, format_date(&self.expiry_date));
        claims.add(COUNTRY_OF_OPERATION, &self.country_of_operation);
        claims.add(REGION_OF_OPERATION, &self.region_of_operation);
        claims.add(SUBJECT_PK, self.subject_public_key.jwk());
        claims
    }

    pub fn from_claim_set(claims: &ClaimSet) -> Result<Self, ClaimSetError> {
        let mut reader = ClaimReader::new(claims, ClaimSetKind::MiningLicence);
        let licence = Self {
            issuer_id: reader.text(ISSUER_ID)?,
            subject_id: reader.text(SUBJECT_ID)?,
            issue_date: reader.date(ISSUE_DATE)?,
            expiry_date: reader.date(EXPIRY_DATE)?,
            country_of_operation: reader.text(COUNTRY_OF_OPERATION)?,
            region_of_operation: reader.text(REGION_OF_OPERATION)?,
            subject_public_key: EmbeddedKey::parse(reader.required(SUBJECT_PK)?)?,
        };
        reader.finish()?;
        Ok(licence)
    }

    pub fn subject_public_key(&self) -> &Key {
        self.subject_public_key.key()
    }
}

impl ProductPassport {
    pub fn to_claim_set(&self) -> ClaimSet {
        let mut claims = ClaimSet::new();
        claims.add(SHIPMENT_ID, &self.shipment_id);
        claims.add(ISSUE_DATE, format_date(&self.issue_date));
        claims.add(PRODUCT, &self.product);
        if let Some(issuer_id) = &self.issuer_id {
            claims.add(ISSUER_ID, issuer_id);
        }
        claims
    }

    pub fn from_claim_set(claims: &ClaimSet) -> Result<Self, ClaimSetError> {
        let mut reader = ClaimReader::new(claims, ClaimSetKind::ProductPassport);
        let passport = Self {
            shipment_id: reader.text(SHIPMENT_ID)?,
            issue_date: reader.date(ISSUE_DATE)?,
            product: reader.text(PRODUCT)?,
            issuer_id: reader.optional_text(ISSUER_ID)?,
        };
        reader.finish()?;
        Ok(passport)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Licence(MiningLicence),
    Passport(ProductPassport),
}

impl Credential {
    pub fn kind(&self) -> ClaimSetKind {
        match self {
            Credential::Licence(_) => ClaimSetKind::MiningLicence,
            Credential::Passport(_) => ClaimSetKind::ProductPassport,
        }
    }

    pub fn to_claim_set(&self) -> ClaimSet {
        match self {
            Credential::Licence(licence) => licence.to_claim_set(),
            Credential::Passport(passport) => passport.to_claim_set(),
        }
    }

    pub fn from_claim_set(kind: ClaimSetKind, claims: &ClaimSet) -> Result<Self, ClaimSetError> {
        match kind {
            ClaimSetKind::MiningLicence => MiningLicence::from_claim_set(claims).map(Self::Licence),
            ClaimSetKind::ProductPassport => {
                ProductPassport::from_claim_set(claims).map(Self::Passport)
            }
        }
    }

    pub fn issue(&self, key: &Key) -> Result<SignedClaimSet, KeyError> {
        let alg = key
            .algorithm()
            .jws_alg()
            .ok_or_else(|| KeyError::Unsupported(key.algorithm().to_string()))?;
        let header = Header::new(alg, self.kind());
        let claims = self.to_claim_set();
        let signing_input = signing_input(&header, &claims).map_err(|e| {
            KeyError::InvalidMaterial {
                member: "payload",
                reason: e.to_string(),
            }
        })?;
        let signature = key.sign(signing_input.as_bytes())?;
        Ok(SignedClaimSet {
            kind: Some(self.kind()),
            alg: alg.to_string(),
            claims,
            signing_input,
            signature,
        })
    }
}

// Issued tokens carry `cty` and `typ`. Bare `{"alg":..}` headers are
// accepted and leave the kind to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

impl Header {
    fn new(alg: &str, kind: ClaimSetKind) -> Self {
        Self {
            alg: alg.to_string(),
            cty: Some(kind.as_str().to_string()),
            typ: Some(TOKEN_TYPE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedClaimSet {
    kind: Option<ClaimSetKind>,
    alg: String,
    claims: ClaimSet,
    signing_input: String,
    signature: Vec<u8>,
}

impl SignedClaimSet {
    /// Structural decode of a compact JWS.
    ///
    /// Checks the JOSE framing and that header and payload are in their
    /// canonical compact form. Claim names and order are left to the typed
    /// decode, after the signature has been checked.
    pub fn parse(token: &str) -> Result<Self, ClaimSetError> {
        let mut segments = token.trim().split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ClaimSetError::Encoding(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let header_json = decode_segment("header", header_b64)?;
        let header: Header = serde_json::from_slice(&header_json)
            .map_err(|e| ClaimSetError::Header(e.to_string()))?;
        if let Some(typ) = header.typ.as_deref().filter(|typ| *typ != TOKEN_TYPE) {
            return Err(ClaimSetError::Header(format!("unexpected typ `{typ}`")));
        }
        let kind = header
            .cty
            .as_deref()
            .map(|cty| {
                ClaimSetKind::parse(cty)
                    .ok_or_else(|| ClaimSetError::Header(format!("unknown cty `{cty}`")))
            })
            .transpose()?;

        let payload_json = decode_segment("payload", payload_b64)?;
        let claims: ClaimSet = serde_json::from_slice(&payload_json)
            .map_err(|e| ClaimSetError::Payload(e.to_string()))?;

        let signature = decode_segment("signature", signature_b64)?;

        // One accepted encoding per claim set.
        let signing_input = signing_input(&header, &claims)?;
        if signing_input != format!("{header_b64}.{payload_b64}") {
            return Err(ClaimSetError::NonCanonical);
        }

        Ok(Self {
            kind,
            alg: header.alg,
            claims,
            signing_input,
            signature,
        })
    }

    /// The kind named in the header, if any.
    pub fn kind(&self) -> Option<ClaimSetKind> {
        self.kind
    }

    pub fn alg(&self) -> &str {
        &self.alg
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::from_jws_alg(&self.alg)
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn to_token(&self) -> String {
        format!(
            "{}.{}",
            self.signing_input,
            URL_SAFE_NO_PAD.encode(&self.signature)
        )
    }
}

impl fmt::Display for SignedClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

/// Reads one claim from a token without checking anything but structure.
pub fn peek_claim(token: &str, kind: ClaimSetKind, key: &str) -> Option<String> {
    let signed = SignedClaimSet::parse(token).ok()?;
    if signed.kind.is_some_and(|named| named != kind) {
        return None;
    }
    signed.claims.get(key).map(str::to_owned)
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_date(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|date| date.with_timezone(&Utc))
}

fn signing_input(header: &Header, claims: &ClaimSet) -> Result<String, ClaimSetError> {
    let header_json =
        serde_json::to_string(header).map_err(|e| ClaimSetError::Header(e.to_string()))?;
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims.to_json()?)
    ))
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, ClaimSetError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| ClaimSetError::Encoding(format!("{name} segment: {e}")))
}

struct ClaimReader<'a> {
    claims: &'a [Claim],
    kind: ClaimSetKind,
    next: usize,
}

impl<'a> ClaimReader<'a> {
    fn new(claims: &'a ClaimSet, kind: ClaimSetKind) -> Self {
        Self {
            claims: &claims.claims,
            kind,
            next: 0,
        }
    }

    fn optional(&mut self, name: &'static str) -> Result<Option<&'a str>, ClaimSetError> {
        match self.claims.get(self.next) {
            Some(claim) if claim.key == name => {
                self.next += 1;
                Ok(Some(claim.value.as_str()))
            }
            _ if self.claims[self.next..].iter().any(|c| c.key == name) => {
                Err(ClaimSetError::OutOfOrder)
            }
            _ => Ok(None),
        }
    }

    fn required(&mut self, name: &'static str) -> Result<&'a str, ClaimSetError> {
        self.optional(name)?
            .ok_or(ClaimSetError::MissingClaim(name))
    }

    fn text(&mut self, name: &'static str) -> Result<String, ClaimSetError> {
        non_empty(name, self.required(name)?)
    }

    fn optional_text(&mut self, name: &'static str) -> Result<Option<String>, ClaimSetError> {
        self.optional(name)?
            .map(|value| non_empty(name, value))
            .transpose()
    }

    fn date(&mut self, name: &'static str) -> Result<DateTime<Utc>, ClaimSetError> {
        let value = self.required(name)?;
        let date = parse_date(value).map_err(|e| ClaimSetError::InvalidClaim {
            claim: name,
            reason: e.to_string(),
        })?;
        if format_date(&date) != value {
            return Err(ClaimSetError::InvalidClaim {
                claim: name,
                reason: "dates must be UTC RFC 3339 with whole seconds".to_string(),
            });
        }
        Ok(date)
    }

    fn finish(self) -> Result<(), ClaimSetError> {
        match self.claims.get(self.next) {
            None => Ok(()),
            Some(claim) if self.kind.claim_order().contains(&claim.key.as_str()) => {
                Err(ClaimSetError::OutOfOrder)
            }
            Some(claim) => Err(ClaimSetError::UnexpectedClaim(claim.key.clone())),
        }
    }
}

fn non_empty(name: &'static str, value: &str) -> Result<String, ClaimSetError> {
    if value.trim().is_empty() {
        return Err(ClaimSetError::InvalidClaim {
            claim: name,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value.to_string())
}
