//! Transaction branch identifiers.

use byteorder::{BigEndian, ByteOrder};
use uuid::Uuid;

use crate::error::{XaError, XaResult};

/// Global transaction identifier following the X/Open XA specification.
///
/// An Xid names one branch of a distributed transaction: a format
/// identifier, a global transaction id shared by every branch, and a branch
/// qualifier distinguishing this participant. Supplied by the external
/// transaction manager; immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    /// Maximum length of the global transaction id.
    pub const MAX_GTRID_LEN: usize = 64;
    /// Maximum length of the branch qualifier.
    pub const MAX_BQUAL_LEN: usize = 64;

    /// Create a branch identifier.
    ///
    /// # Errors
    /// `XAER_INVAL` when the global transaction id is empty or either
    /// component exceeds its 64-byte maximum.
    pub fn new(
        format_id: i32,
        global_transaction_id: &[u8],
        branch_qualifier: &[u8],
    ) -> XaResult<Self> {
        if global_transaction_id.is_empty() {
            return Err(XaError::invalid_argument("global transaction id is empty"));
        }
        if global_transaction_id.len() > Self::MAX_GTRID_LEN {
            return Err(XaError::invalid_argument(format!(
                "global transaction id is {} bytes, maximum is {}",
                global_transaction_id.len(),
                Self::MAX_GTRID_LEN
            )));
        }
        if branch_qualifier.len() > Self::MAX_BQUAL_LEN {
            return Err(XaError::invalid_argument(format!(
                "branch qualifier is {} bytes, maximum is {}",
                branch_qualifier.len(),
                Self::MAX_BQUAL_LEN
            )));
        }
        Ok(Self {
            format_id,
            global_transaction_id: global_transaction_id.to_vec(),
            branch_qualifier: branch_qualifier.to_vec(),
        })
    }

    /// Generate a fresh identifier with format id 0 and a random global id.
    ///
    /// Intended for diagnostics and tests; production Xids come from the
    /// transaction manager.
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4();
        Self {
            format_id: 0,
            global_transaction_id: uuid.as_bytes().to_vec(),
            branch_qualifier: vec![0u8; 8],
        }
    }

    /// The format identifier.
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// The global transaction id bytes.
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    /// The branch qualifier bytes.
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }

    /// Encode for transmission: big-endian format id, gtrid length, bqual
    /// length, then the two byte arrays.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(12 + self.global_transaction_id.len() + self.branch_qualifier.len());
        let mut header = [0u8; 12];
        BigEndian::write_i32(&mut header[0..4], self.format_id);
        BigEndian::write_u32(&mut header[4..8], self.global_transaction_id.len() as u32);
        BigEndian::write_u32(&mut header[8..12], self.branch_qualifier.len() as u32);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&self.global_transaction_id);
        buf.extend_from_slice(&self.branch_qualifier);
        buf
    }

    /// Decode an identifier from its wire form.
    ///
    /// # Errors
    /// `XAER_INVAL` when the buffer is truncated or a declared length is out
    /// of range.
    pub fn from_bytes(bytes: &[u8]) -> XaResult<Self> {
        if bytes.len() < 12 {
            return Err(XaError::invalid_argument(format!(
                "xid data truncated: {} bytes",
                bytes.len()
            )));
        }
        let format_id = BigEndian::read_i32(&bytes[0..4]);
        let gtrid_len = BigEndian::read_u32(&bytes[4..8]) as usize;
        let bqual_len = BigEndian::read_u32(&bytes[8..12]) as usize;
        if gtrid_len > Self::MAX_GTRID_LEN || bqual_len > Self::MAX_BQUAL_LEN {
            return Err(XaError::invalid_argument(format!(
                "xid declares gtrid {} / bqual {} beyond maximum",
                gtrid_len, bqual_len
            )));
        }
        if bytes.len() < 12 + gtrid_len + bqual_len {
            return Err(XaError::invalid_argument(format!(
                "xid data truncated: need {}, have {}",
                12 + gtrid_len + bqual_len,
                bytes.len()
            )));
        }
        let global_transaction_id = bytes[12..12 + gtrid_len].to_vec();
        let branch_qualifier = bytes[12 + gtrid_len..12 + gtrid_len + bqual_len].to_vec();
        Self::new(format_id, &global_transaction_id, &branch_qualifier)
    }
}

impl std::fmt::Display for Xid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "xid(fmt={}, gtrid=", self.format_id)?;
        for b in &self.global_transaction_id {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ", bqual=")?;
        for b in &self.branch_qualifier {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}
