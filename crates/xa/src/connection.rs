//! Collaborator seams for the resource adapter.
//!
//! The adapter never touches a socket itself. It exchanges [`XaRequest`]/
//! [`XaReply`] records through an [`XaConnection`] and reports transaction
//! boundaries to a [`TransactionManager`]. Both are traits so tests can
//! substitute scripted doubles.

use byteorder::{BigEndian, ByteOrder};
use hostlink_core::{Result, ServerCapabilities};

use crate::xid::Xid;

/// Which transaction-server operation a request invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XaOperation {
    /// Associate the connection with a branch
    Start,
    /// Dissociate the connection from a branch
    End,
    /// First phase of two-phase commit
    Prepare,
    /// Commit a branch
    Commit,
    /// Roll a branch back
    Rollback,
    /// Discard a heuristically completed branch
    Forget,
    /// Scan prepared/heuristic branches
    Recover,
}

impl XaOperation {
    /// Wire opcode for this operation.
    pub fn opcode(self) -> u16 {
        match self {
            XaOperation::Start => 0x1201,
            XaOperation::End => 0x1202,
            XaOperation::Prepare => 0x1203,
            XaOperation::Commit => 0x1204,
            XaOperation::Rollback => 0x1205,
            XaOperation::Forget => 0x1206,
            XaOperation::Recover => 0x1207,
        }
    }
}

/// Control values piggybacked on a branch start when the host level permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartControls {
    /// Transaction timeout in seconds; 0 means the host default
    pub transaction_timeout: i32,
    /// Lock-wait time in seconds; 0 means the host default
    pub lock_wait: i32,
    /// Whether loosely-coupled branches share locks
    pub loosely_coupled: bool,
}

/// One request to the host's transaction server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XaRequest {
    /// Operation selector
    pub operation: XaOperation,
    /// Diagnostic resource-manager id of the sending adapter
    pub resource_manager_id: i32,
    /// Branch identifier; absent for recover
    pub xid: Option<Xid>,
    /// Operation-specific association/scan flags
    pub flags: i32,
    /// Start-only control values, when capabilities permit
    pub controls: Option<StartControls>,
}

impl XaRequest {
    /// Encode the request datastream: big-endian opcode, resource-manager
    /// id, flags, control block marker, then the encoded Xid.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        let mut header = [0u8; 10];
        BigEndian::write_u16(&mut header[0..2], self.operation.opcode());
        BigEndian::write_i32(&mut header[2..6], self.resource_manager_id);
        BigEndian::write_i32(&mut header[6..10], self.flags);
        buf.extend_from_slice(&header);
        match &self.controls {
            Some(c) => {
                buf.push(1);
                let mut ctl = [0u8; 9];
                BigEndian::write_i32(&mut ctl[0..4], c.transaction_timeout);
                BigEndian::write_i32(&mut ctl[4..8], c.lock_wait);
                ctl[8] = u8::from(c.loosely_coupled);
                buf.extend_from_slice(&ctl);
            }
            None => buf.push(0),
        }
        if let Some(xid) = &self.xid {
            buf.extend_from_slice(&xid.to_bytes());
        }
        buf
    }
}

/// One reply from the host's transaction server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XaReply {
    /// Host error class; 0 is success, 9 carries an XA code
    pub error_class: u16,
    /// Operation return code
    pub return_code: i32,
    /// Branch identifiers returned by a recover scan
    pub xids: Vec<Xid>,
}

impl XaReply {
    /// Success reply with a zero return code.
    pub fn ok() -> Self {
        Self {
            error_class: 0,
            return_code: 0,
            xids: Vec::new(),
        }
    }

    /// Success reply with an operation-specific return code.
    pub fn with_return_code(return_code: i32) -> Self {
        Self {
            error_class: 0,
            return_code,
            xids: Vec::new(),
        }
    }
}

/// Transaction-manager collaborator tracking local/global boundaries.
pub trait TransactionManager {
    /// Record that a global transaction boundary was crossed.
    fn mark_global_transaction_boundary(&self);

    /// Resend the session's transaction isolation level to the host, which
    /// silently resets the attribute across a commit or rollback.
    fn resend_isolation_level(&self);

    /// Switch the session between local and global transaction mode.
    fn set_local_transaction(&self, local: bool);

    /// True when cursors are held open across transaction boundaries.
    fn hold_indicator(&self) -> bool;
}

/// The request/reply connection the adapter runs over.
pub trait XaConnection {
    /// The transaction-manager collaborator bound to this connection.
    fn transaction_manager(&self) -> &dyn TransactionManager;

    /// Exchange one request for one reply.
    fn send_and_receive(&mut self, request: &XaRequest) -> Result<XaReply>;

    /// Capability flags negotiated for this connection.
    fn capabilities(&self) -> ServerCapabilities;

    /// Connection-level configuration.
    fn properties(&self) -> ConnectionProperties;

    /// Mark the connection's open cursors closed.
    fn mark_cursors_closed(&mut self, on_rollback: bool);

    /// Whether statement holdability must be consulted at txn boundaries.
    fn check_statement_holdability(&self) -> bool;

    /// Identifying catalog/system name, for resource-manager comparison.
    fn catalog_name(&self) -> Result<String>;
}

/// Connection-level configuration the adapter consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionProperties {
    /// Whether loosely-coupled branch support is configured on
    pub loosely_coupled_support: bool,
}
