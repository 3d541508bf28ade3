// Receipt file format.
//
// ```text
// "ZKPP" | version: u16 | backend: u8 | len: u32 | public values | len: u32 | proof
// ```
//
// All integers are big-endian and nothing may follow the proof.

use product_passport_lib::{Journal, PublicOutputs};

use crate::error::VerifyError;

pub const RECEIPT_MAGIC: &[u8; 4] = b"ZKPP";
pub const RECEIPT_VERSION: u16 = 1;
pub const MAX_SECTION_LEN: usize = 64 * 1024 * 1024;

/// Which backend sealed a receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// SP1 compressed proof.
    Sp1,
    /// Digest seal over natively computed outputs.
    Development,
}

impl BackendKind {
    fn tag(&self) -> u8 {
        match self {
            BackendKind::Sp1 => 1,
            BackendKind::Development => 2,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(BackendKind::Sp1),
            2 => Some(BackendKind::Development),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Sp1 => "sp1",
            BackendKind::Development => "development",
        }
    }
}

/// Proof plus the public outputs it commits to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    backend: BackendKind,
    public_values: Vec<u8>,
    outputs: PublicOutputs,
    proof: Vec<u8>,
}

impl Receipt {
    pub fn new(
        backend: BackendKind,
        public_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Self, VerifyError> {
        for (name, section) in [("public values", &public_values), ("proof", &proof)] {
            if section.len() > MAX_SECTION_LEN {
                return Err(malformed(format!(
                    "{name} of {} bytes exceeds limit",
                    section.len()
                )));
            }
        }
        let outputs = PublicOutputs::abi_decode(&public_values)
            .map_err(|e| VerifyError::MalformedReceipt(e.to_string()))?;
        Ok(Self {
            backend,
            public_values,
            outputs,
            proof,
        })
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Committed public output bytes, exactly as the program wrote them.
    pub fn public_values(&self) -> &[u8] {
        &self.public_values
    }

    pub fn outputs(&self) -> &PublicOutputs {
        &self.outputs
    }

    pub fn journal(&self) -> &Journal {
        &self.outputs.journal
    }

    pub fn proof(&self) -> &[u8] {
        &self.proof
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(4 + 2 + 1 + 8 + self.public_values.len() + self.proof.len());
        bytes.extend_from_slice(RECEIPT_MAGIC);
        bytes.extend_from_slice(&RECEIPT_VERSION.to_be_bytes());
        bytes.push(self.backend.tag());
        write_section(&mut bytes, &self.public_values);
        write_section(&mut bytes, &self.proof);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        let mut reader = Reader { bytes };

        if reader.take(4)? != RECEIPT_MAGIC {
            return Err(malformed("not a product passport receipt"));
        }
        let version = u16::from_be_bytes([reader.u8()?, reader.u8()?]);
        if version != RECEIPT_VERSION {
            return Err(malformed(format!("unsupported receipt version {version}")));
        }
        let tag = reader.u8()?;
        let backend =
            BackendKind::from_tag(tag).ok_or_else(|| malformed(format!("unknown backend {tag}")))?;

        let public_values = reader.section()?.to_vec();
        let proof = reader.section()?.to_vec();
        if !reader.bytes.is_empty() {
            return Err(malformed("trailing bytes after proof"));
        }

        Self::new(backend, public_values, proof)
    }
}

// Sections never exceed MAX_SECTION_LEN, so the length fits a u32.
fn write_section(bytes: &mut Vec<u8>, section: &[u8]) {
    bytes.extend_from_slice(&(section.len() as u32).to_be_bytes());
    bytes.extend_from_slice(section);
}

fn malformed(reason: impl Into<String>) -> VerifyError {
    VerifyError::MalformedReceipt(reason.into())
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], VerifyError> {
        if self.bytes.len() < len {
            return Err(malformed("receipt is truncated"));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, VerifyError> {
        Ok(self.take(1)?[0])
    }

    fn section(&mut self) -> Result<&'a [u8], VerifyError> {
        let len = self.take(4)?;
        let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
        if len > MAX_SECTION_LEN {
            return Err(malformed(format!("section of {len} bytes exceeds limit")));
        }
        self.take(len)
    }
}
