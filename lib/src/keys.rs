use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{KeyError, SignatureError};

pub const EDDSA_ALG: &str = "EdDSA";
pub const RS256_ALG: &str = "RS256";

const ED25519_CURVE: &str = "Ed25519";
const OKP_KEY_TYPE: &str = "OKP";
const RSA_KEY_TYPE: &str = "RSA";
const MIN_RSA_BITS: usize = 2048;

// Members that only ever hold private material.
const PRIVATE_MEMBERS: [&str; 6] = ["d", "p", "q", "dp", "dq", "qi"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Ed25519,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rsa,
    Unsupported(String),
}

impl KeyAlgorithm {
    pub fn from_jws_alg(alg: &str) -> Self {
        match alg {
            EDDSA_ALG => KeyAlgorithm::Ed25519,
            RS256_ALG => KeyAlgorithm::Rsa,
            other => KeyAlgorithm::Unsupported(other.to_string()),
        }
    }

    pub fn jws_alg(&self) -> Option<&'static str> {
        match self {
            KeyAlgorithm::Ed25519 => Some(EDDSA_ALG),
            KeyAlgorithm::Rsa => Some(RS256_ALG),
            KeyAlgorithm::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Ed25519 => write!(f, "Ed25519"),
            KeyAlgorithm::Rsa => write!(f, "RSA"),
            KeyAlgorithm::Unsupported(tag) => write!(f, "{tag}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVisibility {
    Public,
    Private,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fingerprint of arbitrary bytes, used when a key cannot be parsed.
    pub fn digest(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Unpadded base64url, the form the issuing tools print.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64url())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_base64url())
    }
}

#[derive(Clone)]
enum Material {
    Ed25519 {
        verifying: VerifyingKey,
        signing: Option<SigningKey>,
    },
    Rsa {
        public: RsaPublicKey,
        private: Option<Box<RsaPrivateKey>>,
    },
    Unsupported {
        tag: String,
        // Public members only, sorted, for fingerprinting.
        members: BTreeMap<String, Value>,
    },
}

#[derive(Clone)]
pub struct Key {
    material: Material,
}

impl Key {
    /// Parses a JWK document.
    ///
    /// Ed25519 (`OKP`) and RSA keys can verify. Any other well-formed JWK
    /// still parses, and fails later as an unsupported algorithm.
    pub fn from_jwk(jwk: &str) -> Result<Self, KeyError> {
        let value: Value =
            serde_json::from_str(jwk).map_err(|e| KeyError::InvalidJson(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(KeyError::InvalidJson("expected an object".to_string()));
        };

        let kty = string_member(&object, "kty")?.ok_or(KeyError::MissingMember("kty"))?;
        let crv = string_member(&object, "crv")?;
        let alg = string_member(&object, "alg")?;

        let material = match (kty, crv, alg) {
            (OKP_KEY_TYPE, Some(ED25519_CURVE), None | Some(EDDSA_ALG)) => ed25519_material(&object)?,
            (RSA_KEY_TYPE, _, None | Some(RS256_ALG)) => rsa_material(&object)?,
            _ => {
                let tag = alg
                    .or(crv)
                    .map(|t| format!("{kty}/{t}"))
                    .unwrap_or_else(|| kty.to_string());
                let members = object
                    .iter()
                    .filter(|(name, _)| !PRIVATE_MEMBERS.contains(&name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                Material::Unsupported { tag, members }
            }
        };
        Ok(Self { material })
    }

    /// Parses an RSA key in PEM form: PKCS#8 or PKCS#1 private, or SPKI
    /// public.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let private = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(private) => private,
            Err(_) => match RsaPublicKey::from_public_key_pem(pem) {
                Ok(public) => {
                    check_rsa_size(&public)?;
                    return Ok(Self {
                        material: Material::Rsa {
                            public,
                            private: None,
                        },
                    });
                }
                Err(_) => RsaPrivateKey::from_pkcs1_pem(pem)
                    .map_err(|e| KeyError::InvalidPem(e.to_string()))?,
            },
        };
        private.validate().map_err(|_| KeyError::KeyPairMismatch)?;
        let public = private.to_public_key();
        check_rsa_size(&public)?;
        Ok(Self {
            material: Material::Rsa {
                public,
                private: Some(Box::new(private)),
            },
        })
    }

    /// PEM when the text opens with a PEM boundary, JWK otherwise.
    pub fn from_text(text: &str) -> Result<Self, KeyError> {
        let text = text.trim_start();
        if text.starts_with("-----BEGIN") {
            Self::from_pem(text)
        } else {
            Self::from_jwk(text)
        }
    }

    pub fn ed25519_from_secret(secret: &[u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(secret);
        Self {
            material: Material::Ed25519 {
                verifying: signing.verifying_key(),
                signing: Some(signing),
            },
        }
    }

    pub fn ed25519_from_public(public: &[u8; 32]) -> Result<Self, KeyError> {
        let verifying = VerifyingKey::from_bytes(public).map_err(|e| KeyError::InvalidMaterial {
            member: "x",
            reason: e.to_string(),
        })?;
        Ok(Self {
            material: Material::Ed25519 {
                verifying,
                signing: None,
            },
        })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match &self.material {
            Material::Ed25519 { .. } => KeyAlgorithm::Ed25519,
            Material::Rsa { .. } => KeyAlgorithm::Rsa,
            Material::Unsupported { tag, .. } => KeyAlgorithm::Unsupported(tag.clone()),
        }
    }

    pub fn visibility(&self) -> KeyVisibility {
        match &self.material {
            Material::Ed25519 {
                signing: Some(_), ..
            }
            | Material::Rsa {
                private: Some(_), ..
            } => KeyVisibility::Private,
            _ => KeyVisibility::Public,
        }
    }

    pub fn to_public(&self) -> Self {
        let material = match &self.material {
            Material::Ed25519 { verifying, .. } => Material::Ed25519 {
                verifying: *verifying,
                signing: None,
            },
            Material::Rsa { public, .. } => Material::Rsa {
                public: public.clone(),
                private: None,
            },
            Material::Unsupported { tag, members } => Material::Unsupported {
                tag: tag.clone(),
                members: members.clone(),
            },
        };
        Self { material }
    }

    /// RFC 7638 thumbprint over the required members of the key type.
    pub fn fingerprint(&self) -> Fingerprint {
        // Required members in lexicographic order, no whitespace.
        let thumbprint_input = match &self.material {
            Material::Ed25519 { verifying, .. } => format!(
                r#"{{"crv":"{ED25519_CURVE}","kty":"{OKP_KEY_TYPE}","x":"{}"}}"#,
                URL_SAFE_NO_PAD.encode(verifying.as_bytes())
            ),
            Material::Rsa { public, .. } => format!(
                r#"{{"e":"{}","kty":"{RSA_KEY_TYPE}","n":"{}"}}"#,
                encode_uint(public.e()),
                encode_uint(public.n())
            ),
            Material::Unsupported { members, .. } => {
                serde_json::to_string(members).unwrap_or_default()
            }
        };
        Fingerprint::digest(thumbprint_input.as_bytes())
    }

    pub fn to_public_jwk(&self) -> String {
        let members = match &self.material {
            Material::Ed25519 { verifying, .. } => {
                let mut members = ed25519_members(verifying);
                members.insert("use".to_string(), Value::from("sig"));
                members
            }
            Material::Rsa { public, .. } => BTreeMap::from([
                ("alg".to_string(), Value::from(RS256_ALG)),
                ("e".to_string(), Value::from(encode_uint(public.e()))),
                ("kty".to_string(), Value::from(RSA_KEY_TYPE)),
                ("n".to_string(), Value::from(encode_uint(public.n()))),
                ("use".to_string(), Value::from("sig")),
            ]),
            Material::Unsupported { members, .. } => members.clone(),
        };
        serde_json::to_string(&members).unwrap_or_default()
    }

    /// Private JWK of an Ed25519 key, or `None`.
    pub fn to_private_jwk(&self) -> Option<String> {
        match &self.material {
            Material::Ed25519 {
                verifying,
                signing: Some(signing),
            } => {
                let mut members = ed25519_members(verifying);
                members.insert(
                    "d".to_string(),
                    Value::from(URL_SAFE_NO_PAD.encode(signing.to_bytes())),
                );
                serde_json::to_string(&members).ok()
            }
            _ => None,
        }
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        match &self.material {
            Material::Ed25519 {
                signing: Some(signing),
                ..
            } => Ok(signing.sign(message).to_bytes().to_vec()),
            Material::Rsa {
                private: Some(private),
                ..
            } => private
                .sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(message))
                .map_err(|e| KeyError::InvalidMaterial {
                    member: "d",
                    reason: e.to_string(),
                }),
            Material::Ed25519 { signing: None, .. } | Material::Rsa { private: None, .. } => {
                Err(KeyError::NotPrivate)
            }
            Material::Unsupported { tag, .. } => Err(KeyError::Unsupported(tag.clone())),
        }
    }

    /// Checks `signature` over `message`: strict Ed25519, or RS256.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        match &self.material {
            Material::Ed25519 { verifying, .. } => {
                let signature = Signature::from_slice(signature)
                    .map_err(|_| SignatureError::SignatureMismatch)?;
                verifying
                    .verify_strict(message, &signature)
                    .map_err(|_| SignatureError::SignatureMismatch)
            }
            Material::Rsa { public, .. } => public
                .verify(
                    Pkcs1v15Sign::new::<Sha256>(),
                    &Sha256::digest(message),
                    signature,
                )
                .map_err(|_| SignatureError::SignatureMismatch),
            Material::Unsupported { tag, .. } => {
                Err(SignatureError::UnsupportedAlgorithm(tag.clone()))
            }
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.visibility() == other.visibility() && self.fingerprint() == other.fingerprint()
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("algorithm", &self.algorithm())
            .field("visibility", &self.visibility())
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Fingerprint of whatever the prover supplied as the authority key.
///
/// Falls back to hashing the trimmed bytes when they are not a JWK, so a
/// journal can always be produced.
pub fn fingerprint_of_raw(raw: &str) -> Fingerprint {
    Key::from_jwk(raw)
        .map(|key| key.fingerprint())
        .unwrap_or_else(|_| Fingerprint::digest(raw.trim().as_bytes()))
}

pub fn has_private_members(jwk: &str) -> bool {
    match serde_json::from_str::<Value>(jwk) {
        Ok(Value::Object(object)) => PRIVATE_MEMBERS
            .iter()
            .any(|member| object.contains_key(*member)),
        _ => false,
    }
}

fn ed25519_material(object: &Map<String, Value>) -> Result<Material, KeyError> {
    let x = string_member(object, "x")?.ok_or(KeyError::MissingMember("x"))?;
    let public = decode_32("x", x)?;
    let verifying = VerifyingKey::from_bytes(&public).map_err(|e| KeyError::InvalidMaterial {
        member: "x",
        reason: e.to_string(),
    })?;

    let signing = match string_member(object, "d")? {
        Some(d) => {
            let signing = SigningKey::from_bytes(&decode_32("d", d)?);
            if signing.verifying_key() != verifying {
                return Err(KeyError::KeyPairMismatch);
            }
            Some(signing)
        }
        None => None,
    };
    Ok(Material::Ed25519 { verifying, signing })
}

fn rsa_material(object: &Map<String, Value>) -> Result<Material, KeyError> {
    let n = uint_member(object, "n")?.ok_or(KeyError::MissingMember("n"))?;
    let e = uint_member(object, "e")?.ok_or(KeyError::MissingMember("e"))?;
    let public = RsaPublicKey::new(n.clone(), e.clone()).map_err(|err| {
        KeyError::InvalidMaterial {
            member: "n",
            reason: err.to_string(),
        }
    })?;
    check_rsa_size(&public)?;

    let private = match uint_member(object, "d")? {
        Some(d) => {
            let p = uint_member(object, "p")?.ok_or(KeyError::MissingMember("p"))?;
            let q = uint_member(object, "q")?.ok_or(KeyError::MissingMember("q"))?;
            let private = RsaPrivateKey::from_components(n, e, d, vec![p, q])
                .map_err(|_| KeyError::KeyPairMismatch)?;
            private.validate().map_err(|_| KeyError::KeyPairMismatch)?;
            Some(Box::new(private))
        }
        None => None,
    };
    Ok(Material::Rsa { public, private })
}

fn check_rsa_size(public: &RsaPublicKey) -> Result<(), KeyError> {
    if public.size() * 8 < MIN_RSA_BITS {
        return Err(KeyError::InvalidMaterial {
            member: "n",
            reason: format!("modulus is shorter than {MIN_RSA_BITS} bits"),
        });
    }
    Ok(())
}

fn ed25519_members(verifying: &VerifyingKey) -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("alg".to_string(), Value::from(EDDSA_ALG)),
        ("crv".to_string(), Value::from(ED25519_CURVE)),
        ("kty".to_string(), Value::from(OKP_KEY_TYPE)),
        (
            "x".to_string(),
            Value::from(URL_SAFE_NO_PAD.encode(verifying.as_bytes())),
        ),
    ])
}

fn encode_uint(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

fn string_member<'a>(
    object: &'a Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a str>, KeyError> {
    match object.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(KeyError::InvalidMaterial {
            member: name,
            reason: "expected a string".to_string(),
        }),
    }
}

fn decode_member(member: &'static str, encoded: &str) -> Result<Vec<u8>, KeyError> {
    URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| KeyError::InvalidMaterial {
            member,
            reason: e.to_string(),
        })
}

fn uint_member(
    object: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<BigUint>, KeyError> {
    string_member(object, name)?
        .map(|encoded| decode_member(name, encoded).map(|bytes| BigUint::from_bytes_be(&bytes)))
        .transpose()
}

fn decode_32(member: &'static str, encoded: &str) -> Result<[u8; 32], KeyError> {
    let bytes = decode_member(member, encoded)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| KeyError::InvalidMaterial {
        member,
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}
