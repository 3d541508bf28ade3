pub mod chain;
pub mod claims;
pub mod error;
pub mod journal;
pub mod keys;
pub mod program;
pub mod signature;
pub mod zones;

pub use chain::ChainBroken;
pub use claims::{
    ClaimSet, ClaimSetKind, Credential, EmbeddedKey, MiningLicence, ProductPassport,
    SignedClaimSet,
};
pub use error::{ClaimSetError, JournalError, KeyError, SignatureError};
pub use journal::{Journal, PublicOutputs, PublicValuesStruct};
pub use keys::{Fingerprint, Key, KeyAlgorithm, KeyVisibility};
pub use program::{evaluate, CheckFailure, Evaluation, PublicInputs, Witness};
pub use signature::{verify_licence, verify_passport, verify_signature, Verified};
pub use zones::{ConflictZone, ConflictZoneList, ZoneStatus};
