//! The list-building wire protocol: request, reply packets, and the
//! conversation seam the engine runs over.

use byteorder::{BigEndian, ByteOrder};
use hostlink_core::{Codepoint, Error, Result};

// ============================================================================
// Reply return codes
// ============================================================================

/// Packet carries one print object.
pub const RC_OK: u16 = 0x0000;

/// Packet carries a structured escape message; the build failed.
pub const RC_ESCAPE_MESSAGE: u16 = 0x0002;

/// The selection matched nothing; not an error.
pub const RC_EMPTY_LIST: u16 = 0x0003;

/// The host level does not implement this list function.
pub const RC_FUNCTION_NOT_SUPPORTED: u16 = 0x0004;

// ============================================================================
// Codepoint identifiers
// ============================================================================

/// Identity of one print object (library/name/type path).
pub const CP_IDENTITY: u16 = 0x0001;

/// Attribute values retrieved for one print object.
pub const CP_ATTRIBUTES: u16 = 0x0002;

/// Seven-character message identifier of an escape message.
pub const CP_MESSAGE_ID: u16 = 0x0003;

/// First-level text of an escape message.
pub const CP_MESSAGE_TEXT: u16 = 0x0004;

/// Second-level help of an escape message.
pub const CP_MESSAGE_HELP: u16 = 0x0005;

/// Which print-system object class a list enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Spooled files
    SpooledFiles,
    /// Output queues
    OutputQueues,
}

impl ListKind {
    /// Wire selector for the list function.
    pub fn function_id(self) -> u16 {
        match self {
            ListKind::SpooledFiles => 0x0101,
            ListKind::OutputQueues => 0x0102,
        }
    }

    /// Attribute ids retrieved when the caller specifies none.
    pub fn default_attributes(self) -> &'static [u16] {
        match self {
            ListKind::SpooledFiles => &[0x2001, 0x2002, 0x2003, 0x2004, 0x2005],
            ListKind::OutputQueues => &[0x3001, 0x3002, 0x3003],
        }
    }
}

/// Selection filter narrowing which objects the host enumerates.
///
/// Empty fields match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionFilter {
    /// Owning user profile
    pub user: Option<String>,
    /// Output queue path
    pub queue: Option<String>,
    /// Form type
    pub form_type: Option<String>,
}

/// One list-building request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Which object class to enumerate
    pub kind: ListKind,
    /// Selection filter
    pub selection: SelectionFilter,
    /// Optional exact-identity filter
    pub id_filter: Option<String>,
    /// Attribute ids to retrieve per object
    pub attributes: Vec<u16>,
}

impl ListRequest {
    /// Encode the request datastream: function selector, attribute count
    /// and ids, then the filter strings as codepoints.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        let mut header = [0u8; 4];
        BigEndian::write_u16(&mut header[0..2], self.kind.function_id());
        BigEndian::write_u16(&mut header[2..4], self.attributes.len() as u16);
        buf.extend_from_slice(&header);
        for attr in &self.attributes {
            let mut id = [0u8; 2];
            BigEndian::write_u16(&mut id, *attr);
            buf.extend_from_slice(&id);
        }
        let mut write_filter = |id: u16, value: &Option<String>| {
            if let Some(v) = value {
                Codepoint::new(id, v.as_bytes()).write_to(&mut buf);
            }
        };
        write_filter(0x0010, &self.selection.user);
        write_filter(0x0011, &self.selection.queue);
        write_filter(0x0012, &self.selection.form_type);
        write_filter(0x0013, &self.id_filter);
        buf
    }
}

/// One reply packet in a list-building conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReply {
    return_code: u16,
    last: bool,
    codepoints: Vec<Codepoint>,
}

impl ListReply {
    /// Assemble a reply packet.
    pub fn new(return_code: u16, last: bool, codepoints: Vec<Codepoint>) -> Self {
        Self {
            return_code,
            last,
            codepoints,
        }
    }

    /// The packet's return code.
    pub fn return_code(&self) -> u16 {
        self.return_code
    }

    /// True on the final packet of the conversation.
    pub fn is_last(&self) -> bool {
        self.last
    }

    /// The first codepoint with the given id, if present.
    pub fn codepoint(&self, id: u16) -> Option<&Codepoint> {
        self.codepoints.iter().find(|cp| cp.id() == id)
    }

    /// Decode the structured escape-message fields.
    ///
    /// # Errors
    /// `Error::Internal` when the message-id codepoint is missing from an
    /// escape packet.
    pub fn message_fields(&self) -> Result<(String, String, String)> {
        let id = self
            .codepoint(CP_MESSAGE_ID)
            .ok_or_else(|| Error::Internal("escape reply missing message id".to_string()))?
            .text();
        let text = self
            .codepoint(CP_MESSAGE_TEXT)
            .map(Codepoint::text)
            .unwrap_or_default();
        let help = self
            .codepoint(CP_MESSAGE_HELP)
            .map(Codepoint::text)
            .unwrap_or_default();
        Ok((id, text, help))
    }
}

/// A conversation with the host print subsystem.
///
/// Implementations own correlation-id assignment so concurrent lists can
/// share one session. `receive` returning `Ok(None)` models a missing reply
/// packet, which the engine reports as a protocol desync.
pub trait Conversation: Send + Sync {
    /// Allocate a correlation id for a new exchange.
    fn new_correlation(&self) -> u32;

    /// Send one list request under the given correlation id.
    fn send(&self, request: &ListRequest, correlation: u32) -> Result<()>;

    /// Receive the next reply packet for the given correlation id.
    fn receive(&self, correlation: u32) -> Result<Option<ListReply>>;

    /// Whether this configuration permits background build threads.
    fn background_threads_allowed(&self) -> bool {
        true
    }
}
